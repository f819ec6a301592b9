use llmbox::client::OpenMode;
use llmbox::proto::ErrorCode;

use crate::common::Fixture;

#[tokio::test]
async fn close_succeeds_exactly_once() {
    let fx = Fixture::new();
    fx.write_file("in.txt", b"x");

    let view = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");
    let copy = view.clone();

    fx.client.close(view).await.expect("first close");
    let err = fx.client.close(copy).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Closed));
}

#[tokio::test]
async fn reads_after_close_are_closed() {
    let fx = Fixture::new();
    fx.write_file("in.txt", b"x");

    let view = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");
    let copy = view.clone();
    fx.client.close(view).await.expect("close");

    let err = fx.client.read(&copy, 16).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Closed));
}

#[tokio::test]
async fn open_of_missing_injected_file_is_noent() {
    let fx = Fixture::new();
    let err = fx.client.open(&fx.path_str("absent.txt"), OpenMode::Read).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NoEnt));
}

#[tokio::test]
async fn handles_are_not_reissued_within_a_session() {
    let fx = Fixture::new();
    fx.write_file("in.txt", b"x");
    let path = fx.path_str("in.txt");

    let first = fx.client.open(&path, OpenMode::Read).await.expect("open");
    let first_id = first.id();
    fx.client.close(first).await.expect("close");

    let second = fx.client.open(&path, OpenMode::Read).await.expect("reopen");
    assert!(second.id() > first_id);
}

#[tokio::test]
async fn session_end_frees_the_server() {
    let fx = Fixture::new();
    fx.write_file("in.txt", b"x");
    let _ = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");

    // dropping the client drops the transport; the server sees EOF and
    // terminates cleanly, releasing all handles
    drop(fx.client);
    let served = fx.server.await.expect("join server");
    assert!(served.is_ok(), "server exits cleanly on EOF: {served:?}");
}
