//! Benchmark the local index against store-side search.

use anyhow::Result;
use colored::Colorize;
use finsearch_embeddings::random_query_vector;

use crate::config::StoreSettings;

pub async fn run(settings: &StoreSettings, iterations: usize, top_k: usize) -> Result<()> {
    let mirror = settings.open_mirror().await?;

    let stats = mirror.stats().await;
    if stats.local_vectors == 0 {
        println!("{} The index is empty; nothing to benchmark.", "•".yellow());
        return Ok(());
    }

    println!(
        "{} Benchmarking {} iterations over {} vectors (top_k={})",
        "→".blue(),
        iterations.to_string().cyan(),
        stats.local_vectors.to_string().cyan(),
        top_k
    );

    let mut local_totals = Vec::with_capacity(iterations);
    let mut local_index_only = Vec::with_capacity(iterations);
    let mut local_metadata = Vec::with_capacity(iterations);
    let mut remote_totals = Vec::with_capacity(iterations);

    for i in 0..iterations {
        let query = random_query_vector(settings.dimension);

        let (_, local) = mirror.search_with_timing(&query, top_k).await;
        if let Some(error) = &local.error {
            println!("{} Local search failed on run {}: {}", "✗".red(), i + 1, error);
            return Ok(());
        }
        local_totals.push(local.total);
        local_index_only.push(local.index_search);
        local_metadata.push(local.metadata_fetch);

        let (_, remote) = mirror.search_remote_with_timing(&query, top_k).await;
        if let Some(error) = &remote.error {
            println!("{} Remote search failed on run {}: {}", "✗".red(), i + 1, error);
            return Ok(());
        }
        remote_totals.push(remote.total);
    }

    let (local_mean, local_std) = mean_std(&local_totals);
    let (index_mean, _) = mean_std(&local_index_only);
    let (metadata_mean, _) = mean_std(&local_metadata);
    let (remote_mean, remote_std) = mean_std(&remote_totals);

    println!();
    println!("  local (index + metadata fetch)  {:.6}s ± {:.6}s", local_mean, local_std);
    println!("    index search only             {:.6}s", index_mean);
    println!("    metadata fetch                {:.6}s", metadata_mean);
    println!("  remote (store-side search)      {:.6}s ± {:.6}s", remote_mean, remote_std);

    if local_mean > 0.0 {
        let ratio = remote_mean / local_mean;
        let verdict = if ratio > 1.0 { "local faster" } else { "remote faster" };
        println!();
        println!("{} Ratio: {:.2}x ({})", "✓".green(), ratio, verdict);
        if metadata_mean > index_mean {
            println!("  Metadata retrieval dominates the local path.");
        }
    }

    Ok(())
}

fn mean_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
