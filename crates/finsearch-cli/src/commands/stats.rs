//! Show remote/local counts and synchronization state.

use anyhow::Result;
use colored::Colorize;

use crate::config::StoreSettings;

pub async fn run(settings: &StoreSettings) -> Result<()> {
    let mirror = settings.open_mirror().await?;
    let stats = mirror.stats().await;

    println!("{} Collection {}", "→".blue(), stats.collection.cyan().bold());
    println!(
        "  Remote points:  {}",
        stats
            .remote_points
            .map_or_else(|| "unreachable".red().to_string(), |n| n.to_string().cyan().to_string())
    );
    println!("  Local vectors:  {}", stats.local_vectors.to_string().cyan());
    println!(
        "  Synchronized:   {}",
        if stats.synchronized { "yes".green() } else { "no".red() }
    );
    println!("  Index file:     {}", stats.index_path.display().to_string().dimmed());

    Ok(())
}
