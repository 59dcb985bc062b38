mod helpers;

use helpers::test_app;
use noesis::memory::MemoryType;
use noesis::EngineError;

#[tokio::test]
async fn remember_then_recall_returns_the_memory() {
    let app = test_app().await;

    let memory = app
        .state
        .engine
        .remember("Buy milk", MemoryType::Episodic, 0.5)
        .await
        .unwrap();

    let hits = app.state.engine.recall("milk", 5, None).await.unwrap();
    assert_eq!(hits[0].memory.id, memory.id);
    assert!(
        hits[0].similarity > 0.3,
        "shared-token similarity too low: {}",
        hits[0].similarity
    );
}

#[tokio::test]
async fn think_without_provider_degrades_to_memory_only() {
    let app = test_app().await;

    let thought = app.state.engine.think("What is 2+2?").await.unwrap();
    assert!(!thought.ai_enhanced);
    assert!(!thought.response.is_empty());
}

#[tokio::test]
async fn think_trains_the_learner_and_stores_an_episode() {
    let app = test_app().await;

    app.state.engine.think("how do plants grow").await.unwrap();
    app.state.engine.think("how do plants grow").await.unwrap();

    let stats = app.state.engine.get_stats();
    assert_eq!(stats.thought_count, 2);
    assert!(stats.learner.total_updates >= 2);
    // each think becomes one episodic memory
    assert_eq!(stats.memory_count, 2);
    assert!(stats
        .memories_by_type
        .iter()
        .any(|(ty, n)| ty == "episodic" && *n == 2));
}

#[tokio::test]
async fn empty_inputs_are_rejected_before_embedding() {
    let app = test_app().await;

    assert!(matches!(
        app.state.engine.think("").await.unwrap_err(),
        EngineError::Input(_)
    ));
    assert!(matches!(
        app.state
            .engine
            .remember("  \n ", MemoryType::Semantic, 0.5)
            .await
            .unwrap_err(),
        EngineError::Input(_)
    ));
    assert!(matches!(
        app.state.engine.recall("   ", 5, None).await.unwrap_err(),
        EngineError::Input(_)
    ));
}

#[tokio::test]
async fn status_reflects_activity() {
    let app = test_app().await;

    app.state
        .engine
        .remember("a fact", MemoryType::Semantic, 0.6)
        .await
        .unwrap();
    app.state.engine.think("a fact").await.unwrap();

    let status = app.state.status();
    assert_eq!(status.memory_count, 2);
    assert_eq!(status.thought_count, 1);
    assert_eq!(status.ai_provider, "none");
    assert_eq!(status.embedding_provider, "hash");
    assert_eq!(status.indexed_files, 0);
}

#[tokio::test]
async fn cycle_runs_maintenance_without_a_provider() {
    let app = test_app().await;
    app.state.engine.think("seed a transition").await.unwrap();

    let report = app.state.engine.cycle().await;
    assert!(!report.ai_available);
    assert_eq!(report.embedding_backend, "hash");
    assert_eq!(report.replayed_transitions, 1);
}

#[tokio::test]
async fn evolve_returns_a_summary_and_persists() {
    let app = test_app().await;
    for _ in 0..5 {
        app.state.engine.think("question").await.unwrap();
    }

    let summary = app.state.engine.evolve().await.unwrap();
    assert!(summary.exploration_after >= 0.0);
    assert!(summary.exploration_after <= 0.5);
}
