mod helpers;

use helpers::{test_app_with, TestApp};
use noesis::config::IndexedFolder;
use tokio_util::sync::CancellationToken;

async fn app_with_docs() -> (TestApp, tempfile::TempDir) {
    let docs = tempfile::tempdir().expect("docs tempdir");
    let docs_path = docs.path().to_string_lossy().into_owned();
    let app = test_app_with(|config| {
        config.indexer.folders = vec![IndexedFolder {
            path: docs_path,
            recursive: true,
            exclude: vec!["drafts".into()],
        }];
    })
    .await;
    (app, docs)
}

#[tokio::test]
async fn thousand_token_file_yields_three_chunks() {
    let (app, docs) = app_with_docs().await;
    let text: String = (0..1000)
        .map(|i| format!("tok{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    std::fs::write(docs.path().join("big.txt"), &text).unwrap();

    let report = app.state.indexer.scan_all(&CancellationToken::new()).await;
    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.chunks_indexed, 3);
}

#[tokio::test]
async fn rescan_of_unchanged_files_is_idempotent() {
    let (app, docs) = app_with_docs().await;
    std::fs::write(docs.path().join("a.md"), "alpha beta gamma").unwrap();

    let cancel = CancellationToken::new();
    app.state.indexer.scan_all(&cancel).await;
    let before = app.state.indexer.stats();

    let second = app.state.indexer.scan_all(&cancel).await;
    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.files_unchanged, 1);
    assert_eq!(app.state.indexer.stats().chunks, before.chunks);
}

#[tokio::test]
async fn modified_file_is_reindexed_with_no_stale_chunks() {
    let (app, docs) = app_with_docs().await;
    let path = docs.path().join("list.txt");
    let long: String = (0..600).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    std::fs::write(&path, &long).unwrap();

    let first = app.state.indexer.scan_all(&CancellationToken::new()).await;
    assert_eq!(first.chunks_indexed, 2);

    // shrink the file; the old second chunk must disappear
    std::fs::write(&path, "just a short list now").unwrap();
    app.state.indexer.index_file(&path).await.unwrap();
    assert_eq!(app.state.indexer.stats().chunks, 1);

    let hits = app.state.indexer.search("short list", 5).await;
    assert!(hits[0].chunk.contains("short"));
}

#[tokio::test]
async fn excluded_and_unsupported_files_are_skipped() {
    let (app, docs) = app_with_docs().await;
    std::fs::create_dir(docs.path().join("drafts")).unwrap();
    std::fs::write(docs.path().join("drafts/wip.md"), "unfinished").unwrap();
    std::fs::write(docs.path().join("binary.png"), [0u8; 16]).unwrap();
    std::fs::write(docs.path().join("keep.md"), "final version").unwrap();

    let report = app.state.indexer.scan_all(&CancellationToken::new()).await;
    assert_eq!(report.files_indexed, 1);
    assert_eq!(app.state.indexer.stats().files, 1);
}

#[tokio::test]
async fn deleted_files_drop_out_of_search() {
    let (app, docs) = app_with_docs().await;
    let path = docs.path().join("temp.md");
    std::fs::write(&path, "ephemeral content about volcanoes").unwrap();

    app.state.indexer.scan_all(&CancellationToken::new()).await;
    assert!(!app.state.indexer.search("volcanoes", 5).await.is_empty());

    std::fs::remove_file(&path).unwrap();
    app.state.indexer.remove_file(&path).unwrap();
    assert!(app.state.indexer.search("volcanoes", 5).await.is_empty());
}
