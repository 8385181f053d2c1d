use anyhow::Context;

use sage_backend::config::Settings;
use sage_backend::doc::{ingest, search, source};
use sage_backend::llm::LlamaEmbedder;

/// Query utility: ingests the configured document and prints the chunks
/// closest to the sentence given on the command line.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let query = std::env::args()
        .nth(1)
        .context("Usage: vector-search 'Some sentence about something'")?;

    let settings = Settings::load().context("Failed to load settings")?;
    let embedder = LlamaEmbedder::new(
        settings.llm.embedding_base_url.clone(),
        settings.llm.embedding_model.clone(),
    );

    let pages = source::load_pages(&settings.document.path)?;
    let document = ingest::ingest(&embedder, &pages).await?;

    let hits = search::search(&embedder, &query, &document, search::TOP_K).await?;

    println!("The {} most relevant sentences are:", hits.len());
    for hit in &hits {
        let chunk = &document.chunks()[hit.index];
        println!(
            "  Line {}, score {}%: {}",
            chunk.index + 1,
            (hit.score * 100.0).round(),
            chunk.text
        );
    }

    Ok(())
}
