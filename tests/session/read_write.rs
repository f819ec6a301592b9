use std::sync::Arc;

use llmbox::client::OpenMode;
use llmbox::server::state::DEFAULT_CHUNK_CAP;

use crate::common::Fixture;

#[tokio::test]
async fn injected_read_scenario() {
    let fx = Fixture::new();
    fx.write_file("in.txt", b"HELLO");

    let view = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");
    let (data, eof) = fx.client.read(&view, 1024).await.expect("first read");
    assert_eq!(data, b"HELLO");
    assert!(!eof);

    let (data, eof) = fx.client.read(&view, 1024).await.expect("second read");
    assert!(data.is_empty());
    assert!(eof);
}

#[tokio::test]
async fn round_trip_across_fresh_handles() {
    let fx = Fixture::new();
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

    let w = fx.client.open(&fx.path_str("blob.bin"), OpenMode::Write).await.expect("open w");
    fx.client.write_all(&w, &payload).await.expect("write all");
    fx.client.close(w).await.expect("close w");

    let r = fx.client.open(&fx.path_str("blob.bin"), OpenMode::Read).await.expect("open r");
    let back = fx.client.read_to_end(&r).await.expect("read to end");
    assert_eq!(back, payload);
}

#[tokio::test]
async fn reads_are_chunk_capped() {
    let fx = Fixture::new();
    fx.write_file("big.bin", &vec![7u8; DEFAULT_CHUNK_CAP * 3]);

    let r = fx.client.open(&fx.path_str("big.bin"), OpenMode::Read).await.expect("open");
    let (chunk, eof) = fx.client.read(&r, DEFAULT_CHUNK_CAP * 100).await.expect("read");
    assert_eq!(chunk.len(), DEFAULT_CHUNK_CAP);
    assert!(!eof);
}

#[tokio::test]
async fn append_goes_to_the_end() {
    let fx = Fixture::new();
    fx.write_file("log.txt", b"first\n");

    let a = fx.client.open(&fx.path_str("log.txt"), OpenMode::Append).await.expect("open a");
    fx.client.write_all(&a, b"second\n").await.expect("append");
    fx.client.close(a).await.expect("close");

    assert_eq!(fx.read_file("log.txt"), b"first\nsecond\n");
}

#[tokio::test]
async fn temp_objects_are_tagged_and_read_back() {
    let fx = Fixture::new();

    let (view, tag) = fx.client.create_temp(Some("scratch")).await.expect("create temp");
    assert!(tag.starts_with("<tmp-") && tag.ends_with('>'));

    fx.client.write_all(&view, b"notes").await.expect("write temp");
    let (data, _) = fx.client.read(&view, 64).await.expect("read temp");
    assert_eq!(data, b"notes");

    let stat = fx.client.stat(&view).await.expect("stat temp");
    assert_eq!(stat.size, 5);
    assert_eq!(stat.kind, "temp");
}

#[tokio::test]
async fn stat_reports_size_for_real_files() {
    let fx = Fixture::new();
    fx.write_file("in.txt", b"HELLO");

    let view = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");
    let stat = fx.client.stat(&view).await.expect("stat");
    assert_eq!(stat.size, 5);
    assert_eq!(stat.kind, "file");
    assert!(stat.mtime > 0);
}

#[tokio::test]
async fn narrowed_views_fail_locally() {
    let fx = Fixture::new();
    fx.write_file("data.txt", b"x");

    let rw = fx.client.open(&fx.path_str("data.txt"), OpenMode::ReadWrite).await.expect("open");
    let ro = rw.read_only_view();

    let err = fx.client.write(&ro, b"y").await.unwrap_err();
    assert!(err.code().is_none(), "mode violations never reach the server");

    // the underlying handle still writes through the original view
    fx.client.write_all(&rw, b"y").await.expect("write through rw view");
}

#[tokio::test]
async fn concurrent_callers_share_one_transport() {
    let fx = Fixture::new();
    let client = Arc::new(fx.client);

    let mut tasks = Vec::new();
    for i in 0..8u32 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            let (view, _tag) = client.create_temp(None).await.expect("create temp");
            let body = vec![i as u8; 100];
            client.write_all(&view, &body).await.expect("write");
            let (back, _) = client.read(&view, 200).await.expect("read");
            assert_eq!(back, body);
            client.close(view).await.expect("close");
        }));
    }
    for task in tasks {
        task.await.expect("task");
    }
}

#[tokio::test]
async fn rw_open_preserves_existing_content() {
    let fx = Fixture::new();
    fx.write_file("data.txt", b"keep me");

    let rw = fx.client.open(&fx.path_str("data.txt"), OpenMode::ReadWrite).await.expect("open rw");
    let (data, _) = fx.client.read(&rw, 64).await.expect("read");
    assert_eq!(data, b"keep me");
}
