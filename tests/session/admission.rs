use llmbox::client::OpenMode;
use llmbox::proto::ErrorCode;

use crate::common::Fixture;

#[tokio::test]
async fn injected_input_cannot_be_opened_for_write() {
    let fx = Fixture::with_injected(&["in.txt"], &[]);
    fx.write_file("in.txt", b"data");

    let err = fx.client.open(&fx.path_str("in.txt"), OpenMode::Write).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Perm));
}

#[tokio::test]
async fn injected_output_accepts_writes() {
    let fx = Fixture::with_injected(&[], &["out.txt"]);

    let w = fx.client.open(&fx.path_str("out.txt"), OpenMode::Write).await.expect("open out");
    fx.client.write_all(&w, b"result").await.expect("write");
    fx.client.close(w).await.expect("close");
    assert_eq!(fx.read_file("out.txt"), b"result");
}

#[tokio::test]
async fn directory_opens_are_unsupported() {
    let fx = Fixture::new();
    std::fs::create_dir(fx.path("subdir")).expect("create dir");

    let err = fx.client.open(&fx.path_str("subdir"), OpenMode::Read).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Unsupported));
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_out_of_the_allowlist_are_perm() {
    let fx = Fixture::with_injected(&["work"], &[]);
    std::fs::create_dir(fx.path("work")).expect("create work dir");
    fx.write_file("secret.txt", b"secret");
    std::os::unix::fs::symlink(fx.path("secret.txt"), fx.path("work/alias.txt"))
        .expect("create symlink");

    let err = fx.client.open(&fx.path_str("work/alias.txt"), OpenMode::Read).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Perm));
}

#[tokio::test]
async fn dotdot_escapes_of_the_allowlist_are_perm() {
    let fx = Fixture::with_injected(&["work"], &[]);
    std::fs::create_dir(fx.path("work")).expect("create work dir");
    fx.write_file("secret.txt", b"secret");

    let err =
        fx.client.open(&fx.path_str("work/../secret.txt"), OpenMode::Read).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Perm));
}
