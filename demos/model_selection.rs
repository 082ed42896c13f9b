//! Model Selection Example
//!
//! Builds a small laptop-rating dataset, sweeps the default candidate
//! roster over one shared split, and prints the selection report.

use modelsieve::prelude::*;
use polars::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelsieve=info".into()),
        )
        .init();

    // Synthetic laptops: the rating tracks battery life, weight runs
    // against it, and price is noise.
    let n = 48;
    let battery: Vec<f64> = (0..n).map(|i| 1.0 + (i % 10) as f64).collect();
    let weight: Vec<f64> = (0..n).map(|i| 3.5 - (i % 10) as f64 * 0.25).collect();
    let price: Vec<f64> = (0..n).map(|i| 400.0 + ((i * 97) % 800) as f64).collect();
    let rating: Vec<f64> = battery
        .iter()
        .map(|b| (b / 2.0).round().clamp(1.0, 5.0))
        .collect();

    let df = DataFrame::new(vec![
        Series::new("battery_hours".into(), &battery).into(),
        Series::new("weight_kg".into(), &weight).into(),
        Series::new("price_usd".into(), &price).into(),
        Series::new("rating".into(), &rating).into(),
    ])?;

    let table = FeatureTable::from_dataframe(&df, "rating")?;
    println!(
        "Dataset: {} laptops, {} features\n",
        table.n_rows(),
        table.n_features()
    );

    let config = SelectionConfig::default();
    println!(
        "Sweeping {} candidates (test proportion {}, seed {})\n",
        config.roster.len(),
        config.test_proportion,
        config.seed
    );

    let outcome = ModelSelector::new(config).run(&table)?;
    println!("{}", render_report(&outcome));

    println!("Winner metrics as JSON:");
    println!("{}", serde_json::to_string_pretty(&outcome.best().metrics)?);

    Ok(())
}
