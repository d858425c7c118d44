//! Force a full resync of the local index.

use anyhow::Result;
use colored::Colorize;

use crate::config::StoreSettings;

pub async fn run(settings: &StoreSettings) -> Result<()> {
    let mirror = settings.open_mirror().await?;

    let before = mirror.stats().await;
    println!(
        "{} Before rebuild: {} remote / {} local",
        "→".blue(),
        before
            .remote_points
            .map_or_else(|| "?".to_string(), |n| n.to_string())
            .cyan(),
        before.local_vectors.to_string().cyan()
    );

    let indexed = mirror.rebuild().await?;

    let after = mirror.stats().await;
    println!(
        "{} Rebuilt {} with {} vectors (synchronized: {})",
        "✓".green(),
        settings.collection.cyan(),
        indexed.to_string().cyan(),
        if after.synchronized { "yes".green() } else { "no".red() }
    );

    Ok(())
}
