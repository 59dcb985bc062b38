use anyhow::Result;

use noesis::app::AppState;
use noesis::memory::MemoryType;

/// Run one think and print the thought.
pub async fn think(state: &AppState, input: &str) -> Result<()> {
    let thought = state.engine.think(input).await?;

    println!("{}", thought.response);
    println!();
    println!(
        "  confidence: {:.2}   strategy: {}   ai: {}   memories: {}",
        thought.confidence,
        thought.strategy,
        if thought.ai_enhanced { "yes" } else { "no" },
        thought.memory_ids.len()
    );
    Ok(())
}

/// Store a memory.
pub async fn remember(
    state: &AppState,
    content: &str,
    memory_type: MemoryType,
    importance: f64,
) -> Result<()> {
    let memory = state.engine.remember(content, memory_type, importance).await?;
    println!(
        "Stored {} memory {} (importance {:.2})",
        memory.memory_type, memory.id, memory.importance
    );
    Ok(())
}

/// Search memories and print ranked matches.
pub async fn recall(
    state: &AppState,
    query: &str,
    limit: usize,
    type_filter: Option<MemoryType>,
) -> Result<()> {
    let hits = state.engine.recall(query, limit, type_filter).await?;
    if hits.is_empty() {
        println!("No memories matched \"{query}\".");
        return Ok(());
    }

    println!("Found {} memor{}:", hits.len(), if hits.len() == 1 { "y" } else { "ies" });
    for hit in hits {
        println!(
            "  {:.2}  [{}]  {}",
            hit.similarity,
            hit.memory.memory_type,
            truncate(&hit.memory.content, 100)
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.replace('\n', " ")
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}…", cut.replace('\n', " "))
    }
}
