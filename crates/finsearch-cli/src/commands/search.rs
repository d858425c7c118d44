//! One-shot text search against the mirrored collection.

use anyhow::Result;
use colored::Colorize;
use finsearch_embeddings::{adjust_dimension, random_query_vector, Embedder, HashEmbedder};
use finsearch_search::SearchTiming;

use crate::config::StoreSettings;

pub async fn run(settings: &StoreSettings, query: &str, top_k: usize, random: bool) -> Result<()> {
    let mirror = settings.open_mirror().await?;

    let vector = if random {
        println!("{} Searching with a random vector", "•".yellow());
        random_query_vector(settings.dimension)
    } else {
        let embedder = HashEmbedder::new(settings.dimension);
        adjust_dimension(&embedder.embed(query)?, settings.dimension)
    };

    let (results, timing) = mirror.search_with_timing(&vector, top_k).await;

    if let Some(error) = &timing.error {
        println!("{} Search failed: {}", "✗".red(), error);
        return Ok(());
    }
    if results.is_empty() {
        println!("{} No results found for: {}", "•".yellow(), query.cyan());
        if timing.empty_index {
            println!(
                "  The local index is empty. Run {} first.",
                "finsearch ingest".cyan()
            );
        }
        return Ok(());
    }

    println!("{} Results for {}:", "→".blue(), query.cyan().bold());
    println!();

    for (i, (species, score)) in results.iter().enumerate() {
        let rank = format!("{}.", i + 1);
        println!(
            "  {} {} {}",
            rank.blue(),
            species.name.white().bold(),
            format!("({:.4})", score).dimmed()
        );
        if let Some(scientific) = species.scientific_name() {
            println!("      {}", scientific.italic());
        }
        let description = species.truncated_description(200);
        if !description.is_empty() {
            println!("      {}", description.dimmed());
        }
    }

    println!();
    print_timing(&timing);

    Ok(())
}

pub fn print_timing(timing: &SearchTiming) {
    println!("{} Timing breakdown:", "→".blue());
    if let Some(embedding) = timing.embedding {
        println!("  embedding          {:.6}s", embedding);
    }
    println!("  normalization      {:.6}s", timing.normalization);
    println!("  index search       {:.6}s", timing.index_search);
    println!("  id mapping         {:.6}s", timing.id_mapping);
    println!("  metadata fetch     {:.6}s", timing.metadata_fetch);
    println!("  assembly           {:.6}s", timing.assembly);
    println!("  {}", format!("total              {:.6}s", timing.total).bold());
    println!(
        "  {} vectors searched, {} results",
        timing.vectors_searched, timing.results_count
    );
}
