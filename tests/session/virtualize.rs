use llmbox::client::{LogicalKind, OpenMode};

use crate::common::Fixture;

#[tokio::test]
async fn unknown_real_path_is_shadowed_not_read() {
    let fx = Fixture::with_injected(&["in.txt"], &[]);
    fx.write_file("in.txt", b"injected");
    // a real host file the session never injected
    fx.write_file("host.txt", b"host data");

    let view = fx.client.open(&fx.path_str("host.txt"), OpenMode::Read).await.expect("open");
    let (data, eof) = fx.client.read(&view, 1024).await.expect("read");
    assert!(data.is_empty(), "the shadow starts empty, the host file is never read");
    assert!(eof);
}

#[tokio::test]
async fn shadow_writes_never_touch_the_host() {
    let fx = Fixture::with_injected(&["in.txt"], &[]);
    fx.write_file("in.txt", b"injected");
    fx.write_file("host.txt", b"host data");
    let name = fx.path_str("host.txt");

    let w = fx.client.open(&name, OpenMode::Write).await.expect("open shadow");
    fx.client.write_all(&w, b"shadow content").await.expect("write shadow");
    fx.client.close(w).await.expect("close");

    // the session reads its shadow back by name
    let r = fx.client.open(&name, OpenMode::Read).await.expect("reopen shadow");
    let back = fx.client.read_to_end(&r).await.expect("read shadow");
    assert_eq!(back, b"shadow content");

    // and the host file is byte-identical
    assert_eq!(fx.read_file("host.txt"), b"host data");
}

#[tokio::test]
async fn virtualized_names_show_up_in_the_inventory() {
    let fx = Fixture::with_injected(&["in.txt"], &[]);
    fx.write_file("in.txt", b"x");

    let _ = fx.client.open("/fabricated/notes.md", OpenMode::Write).await.expect("open");
    let (_, tag) = fx.client.create_temp(None).await.expect("temp");

    let entries = fx.client.list();
    let kind_of = |name: &str| {
        entries.iter().find(|e| e.name == name).map(|e| e.kind)
    };
    assert_eq!(kind_of(&fx.path_str("in.txt")), Some(LogicalKind::Injected));
    assert_eq!(kind_of("/fabricated/notes.md"), Some(LogicalKind::Virtual));
    assert_eq!(kind_of(&tag), Some(LogicalKind::Temp));
}

#[tokio::test]
async fn injected_paths_are_not_recorded_as_virtual() {
    let fx = Fixture::with_injected(&["in.txt"], &[]);
    fx.write_file("in.txt", b"x");

    let _ = fx.client.open(&fx.path_str("in.txt"), OpenMode::Read).await.expect("open");
    let entries = fx.client.list();
    assert!(entries.iter().all(|e| e.kind != LogicalKind::Virtual));
}
