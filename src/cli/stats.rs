use anyhow::Result;

use noesis::app::AppState;

/// Display engine, learner, and index statistics.
pub fn stats(state: &AppState) -> Result<()> {
    let status = state.status();
    let engine_stats = state.engine.get_stats();

    println!("noesis status");
    println!("{}", "=".repeat(40));
    println!("  Memories:          {}", status.memory_count);
    for (ty, count) in &engine_stats.memories_by_type {
        println!("    {:<14} {}", ty, count);
    }
    println!("  Thoughts:          {}", status.thought_count);
    println!("  AI provider:       {}", status.ai_provider);
    println!("  Embeddings:        {}", status.embedding_provider);
    println!("  Indexed files:     {}", status.indexed_files);
    println!("  Indexed chunks:    {}", status.indexed_chunks);
    if let Some(scan) = state.indexer.last_scan_report() {
        println!(
            "  Last scan:         {} indexed, {} unchanged, {} failed",
            scan.files_indexed, scan.files_unchanged, scan.files_failed
        );
    }
    println!();

    let learner = &engine_stats.learner;
    println!("Learning");
    println!("  Q entries:         {}", learner.q_entries);
    println!("  Updates:           {}", learner.total_updates);
    println!("  Avg reward:        {:.3}", learner.avg_reward);
    println!("  Reward trend:      {:+.4}", learner.reward_trend);
    println!("  Exploration:       {:.3}", learner.exploration_rate);
    Ok(())
}

/// Run an evolution pass and report what changed.
pub async fn evolve(state: &AppState) -> Result<()> {
    let summary = state.engine.evolve().await?;
    println!("Evolution pass complete");
    println!("  Reward trend:      {:+.4}", summary.reward_trend);
    println!(
        "  Exploration:       {:.3} -> {:.3}",
        summary.exploration_before, summary.exploration_after
    );
    println!("  Pruned entries:    {}", summary.pruned_entries);
    println!("  Q entries:         {}", summary.q_entries);
    Ok(())
}

/// Print recent thoughts, newest first.
pub fn thoughts(state: &AppState, limit: usize) -> Result<()> {
    let thoughts = state.engine.get_thoughts(limit);
    if thoughts.is_empty() {
        println!("No thoughts yet.");
        return Ok(());
    }
    for thought in thoughts {
        println!(
            "[{}] confidence {:.2} ({})",
            chrono::DateTime::from_timestamp_millis(thought.created_at)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            thought.confidence,
            thought.strategy
        );
        println!("  {}", thought.response.replace('\n', "\n  "));
    }
    Ok(())
}
