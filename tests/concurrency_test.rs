mod helpers;

use std::collections::HashSet;
use std::sync::Arc;

use helpers::test_app;
use noesis::memory::MemoryType;

#[tokio::test]
async fn concurrent_remembers_lose_no_writes() {
    let app = test_app().await;
    const N: usize = 64;

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let state = Arc::clone(&app.state);
        handles.push(tokio::spawn(async move {
            state
                .engine
                .remember(&format!("fact number {i}"), MemoryType::Semantic, 0.5)
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }

    assert_eq!(ids.len(), N, "ids were not distinct");
    assert_eq!(app.state.engine.memory_count(), N);
}

#[tokio::test]
async fn reads_proceed_while_writes_happen() {
    let app = test_app().await;
    app.state
        .engine
        .remember("the sky is blue", MemoryType::Semantic, 0.5)
        .await
        .unwrap();

    let writer = {
        let state = Arc::clone(&app.state);
        tokio::spawn(async move {
            for i in 0..50 {
                state
                    .engine
                    .remember(&format!("filler {i}"), MemoryType::Working, 0.3)
                    .await
                    .unwrap();
            }
        })
    };
    let reader = {
        let state = Arc::clone(&app.state);
        tokio::spawn(async move {
            for _ in 0..50 {
                let hits = state.engine.recall("sky blue", 3, None).await.unwrap();
                assert!(!hits.is_empty());
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(app.state.engine.memory_count(), 51);
}

#[tokio::test]
async fn thinks_evolve_and_cycle_can_interleave() {
    let app = test_app().await;
    app.state
        .engine
        .remember("seed memory", MemoryType::Semantic, 0.5)
        .await
        .unwrap();

    let thinker = {
        let state = Arc::clone(&app.state);
        tokio::spawn(async move {
            for _ in 0..10 {
                state.engine.think("seed memory question").await.unwrap();
            }
        })
    };
    let evolver = {
        let state = Arc::clone(&app.state);
        tokio::spawn(async move {
            for _ in 0..5 {
                state.engine.evolve().await.unwrap();
            }
        })
    };
    let cycler = {
        let state = Arc::clone(&app.state);
        tokio::spawn(async move {
            for _ in 0..5 {
                state.engine.cycle().await;
            }
        })
    };

    thinker.await.unwrap();
    evolver.await.unwrap();
    cycler.await.unwrap();

    let stats = app.state.engine.get_stats();
    assert_eq!(stats.thought_count, 10);
    // seed + 10 episodes
    assert_eq!(stats.memory_count, 11);
}

#[tokio::test]
async fn overlapping_scans_serialize_cleanly() {
    use noesis::config::IndexedFolder;
    use tokio_util::sync::CancellationToken;

    let docs = tempfile::tempdir().unwrap();
    for i in 0..10 {
        std::fs::write(docs.path().join(format!("f{i}.txt")), format!("file {i} text")).unwrap();
    }
    let docs_path = docs.path().to_string_lossy().into_owned();
    let app = helpers::test_app_with(|config| {
        config.indexer.folders = vec![IndexedFolder {
            path: docs_path,
            recursive: true,
            exclude: vec![],
        }];
    })
    .await;

    let cancel = CancellationToken::new();
    let a = {
        let state = Arc::clone(&app.state);
        let cancel = cancel.clone();
        tokio::spawn(async move { state.indexer.scan_all(&cancel).await })
    };
    let b = {
        let state = Arc::clone(&app.state);
        let cancel = cancel.clone();
        tokio::spawn(async move { state.indexer.scan_all(&cancel).await })
    };

    let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
    // one scan indexed everything, the other saw only unchanged files
    assert_eq!(ra.files_indexed + rb.files_indexed, 10);
    assert_eq!(app.state.indexer.stats().files, 10);
    assert_eq!(app.state.indexer.stats().chunks, 10);
}
