use llmbox::client::OpenMode;
use llmbox::proto::ErrorCode;

use crate::common::Fixture;

#[tokio::test]
async fn a_bare_server_takes_its_lists_from_init() {
    let fx = Fixture::bare();
    fx.write_file("in.txt", b"seed");

    fx.client
        .init(&[fx.path("in.txt")], &[], false)
        .await
        .expect("init installs the allowlist");

    let view = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");
    let content = fx.client.read_to_end(&view).await.expect("read");
    assert_eq!(content, b"seed");

    // the write direction was never granted
    let err = fx.client.open(&fx.path_str("in.txt"), OpenMode::Write).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Perm));
}

#[tokio::test]
async fn init_read_only_tightens_for_the_whole_session() {
    let fx = Fixture::new();
    fx.client.init(&[], &[], true).await.expect("init read-only");

    let err = fx.client.open(&fx.path_str("out.txt"), OpenMode::Write).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Perm));

    // reading still works
    fx.write_file("in.txt", b"x");
    fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("reads survive");
}

#[tokio::test]
async fn close_all_releases_every_tracked_handle() {
    let fx = Fixture::new();
    fx.write_file("a.txt", b"a");
    fx.write_file("b.txt", b"b");

    let a = fx.client.open(&fx.path_str("a.txt"), OpenMode::Read).await.expect("open a");
    let b = fx.client.open(&fx.path_str("b.txt"), OpenMode::Read).await.expect("open b");
    fx.client.close_all().await;

    // both handles are gone server-side
    let err = fx.client.read(&a, 16).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Closed));
    let err = fx.client.read(&b, 16).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Closed));
}
