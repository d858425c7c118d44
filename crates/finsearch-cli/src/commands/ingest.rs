//! Bulk-load a species dataset into the remote store.
//!
//! The dataset is a CSV with a `fish_name` column, a free-text
//! `full_description` column, and one column per embedding dimension.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use finsearch_vectors::{SpeciesPoint, SpeciesRecord, VectorStore};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::StoreSettings;

pub async fn run(settings: &StoreSettings, csv_path: &str, batch_size: usize) -> Result<()> {
    let content = std::fs::read_to_string(csv_path)
        .with_context(|| format!("failed to read {}", csv_path))?;

    let mut rows = parse_csv(&content);
    if rows.is_empty() {
        bail!("{} is empty", csv_path);
    }

    // Drop the header row if the first embedding column is not numeric
    if rows[0]
        .get(2)
        .map(|cell| cell.parse::<f32>().is_err())
        .unwrap_or(true)
    {
        rows.remove(0);
    }

    println!(
        "{} Ingesting {} rows into {} ({} dimensions)",
        "→".blue(),
        rows.len().to_string().cyan(),
        settings.collection.cyan(),
        settings.dimension
    );

    let store = settings.connect().await?;

    let pb = ProgressBar::new(rows.len() as u64).with_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );

    let mut batch: Vec<SpeciesPoint> = Vec::with_capacity(batch_size);
    let mut loaded = 0usize;

    for (i, row) in rows.iter().enumerate() {
        let id = (i + 1) as u64;
        let point = parse_row(row, id, settings.dimension)
            .with_context(|| format!("row {} of {}", i + 1, csv_path))?;
        batch.push(point);

        if batch.len() == batch_size {
            loaded += batch.len();
            store.upsert(std::mem::take(&mut batch)).await?;
            pb.set_position(loaded as u64);
        }
    }
    if !batch.is_empty() {
        loaded += batch.len();
        store.upsert(batch).await?;
        pb.set_position(loaded as u64);
    }
    pb.finish_and_clear();

    println!(
        "{} Loaded {} species into {}",
        "✓".green(),
        loaded.to_string().cyan(),
        settings.collection.cyan()
    );
    println!(
        "  Run {} to sync the local index.",
        "finsearch rebuild".cyan()
    );

    Ok(())
}

fn parse_row(row: &[String], id: u64, dimension: usize) -> Result<SpeciesPoint> {
    if row.len() < 2 + dimension {
        bail!(
            "expected {} columns (name, description, {} embedding values), got {}",
            2 + dimension,
            dimension,
            row.len()
        );
    }

    let vector: Vec<f32> = row[2..2 + dimension]
        .iter()
        .map(|cell| cell.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .context("non-numeric embedding value")?;

    let species = SpeciesRecord::parse_name(id, &row[0]).with_description(row[1].clone());
    Ok(SpeciesPoint::new(id, vector, species))
}

/// Minimal CSV reader: comma-separated, double-quoted fields with `""`
/// escapes, newlines allowed inside quotes. The dataset uses nothing
/// fancier than that.
fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                }
                row.clear();
            }
            c => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_quoted_fields() {
        let content = "fish_name,full_description,e0,e1\n\
                       Esox_lucius,\"Elongated, predatory fish\",0.5,0.25\n\
                       Salmo_trutta,\"Said to be \"\"wary\"\"\nand fast\",1.0,0.0\n";
        let rows = parse_csv(content);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "Elongated, predatory fish");
        assert_eq!(rows[2][1], "Said to be \"wary\"\nand fast");
        assert_eq!(rows[2][2], "1.0");
    }

    #[test]
    fn test_parse_row() {
        let row: Vec<String> = ["Esox_lucius_pike", "a pike", "0.5", "0.5"]
            .into_iter()
            .map(String::from)
            .collect();
        let point = parse_row(&row, 1, 2).unwrap();
        assert_eq!(point.id, 1);
        assert_eq!(point.vector, vec![0.5, 0.5]);
        assert_eq!(point.species.genus.as_deref(), Some("Esox"));
        assert_eq!(point.species.common_name.as_deref(), Some("pike"));
    }

    #[test]
    fn test_parse_row_width_checked() {
        let row: Vec<String> = ["x", "y", "0.5"].into_iter().map(String::from).collect();
        assert!(parse_row(&row, 1, 2).is_err());
    }
}
