use anyhow::Result;
use tokio_util::sync::CancellationToken;

use noesis::app::AppState;

/// Run a full index scan over the configured folders.
pub async fn index(state: &AppState) -> Result<()> {
    if state.config.indexer.folders.is_empty() {
        println!("No indexed folders configured. Add [[indexer.folders]] entries to config.toml.");
        return Ok(());
    }

    let report = state.indexer.scan_all(&CancellationToken::new()).await;
    println!("Index scan complete");
    println!("  Files indexed:   {}", report.files_indexed);
    println!("  Unchanged:       {}", report.files_unchanged);
    println!("  Failed:          {}", report.files_failed);
    println!("  Chunks indexed:  {}", report.chunks_indexed);
    Ok(())
}

/// Semantic search over indexed file chunks.
pub async fn search(state: &AppState, query: &str, limit: usize) -> Result<()> {
    let hits = state.indexer.search(query, limit).await;
    if hits.is_empty() {
        println!("No indexed files matched \"{query}\".");
        return Ok(());
    }

    for hit in hits {
        println!("{:.2}  {} ({})", hit.similarity, hit.name, hit.path);
        let preview: String = hit.chunk.chars().take(160).collect();
        println!("      {}", preview.replace('\n', " "));
    }
    Ok(())
}
