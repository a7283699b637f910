//! Offline model training.
//!
//! Reads the stored bar window, rebuilds the labeled feature matrix with
//! the exact pipeline the server uses at inference time, fits the price
//! regressor and the direction model, reports out-of-sample metrics on a
//! chronological holdout, and writes both models as JSON.

use anyhow::{Context, Result, bail};
use clap::Parser;
use intracast::application::features;
use intracast::domain::repositories::BarRepository;
use intracast::infrastructure::persistence::{Database, SqliteBarRepository};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite store holding the bar window
    #[arg(long, default_value = "sqlite://data/market_data.db")]
    database_url: String,

    /// Symbol whose stored bars to train on
    #[arg(long, default_value = "^NSEI")]
    symbol: String,

    /// Path to output price model file
    #[arg(long, default_value = "models/price_model.json")]
    price_output: PathBuf,

    /// Path to output direction model file
    #[arg(long, default_value = "models/direction_model.json")]
    direction_output: PathBuf,

    /// Number of trees in each random forest
    #[arg(long, default_value_t = 300)]
    n_trees: usize,

    /// Maximum depth of trees
    #[arg(long, default_value_t = 6)]
    max_depth: u16,

    /// Minimum samples required to split an internal node
    #[arg(long, default_value_t = 5)]
    min_split: usize,

    /// Disable the train/test split (train on 100% of data)
    #[arg(long)]
    no_split: bool,
}

fn fit(
    x: &[Vec<f64>],
    y: &[f64],
    args: &Args,
) -> Result<RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>> {
    let matrix = DenseMatrix::from_2d_vec(&x.to_vec())
        .map_err(|e| anyhow::anyhow!("Matrix error: {}", e))?;
    let params = RandomForestRegressorParameters::default()
        .with_n_trees(args.n_trees)
        .with_max_depth(args.max_depth)
        .with_min_samples_split(args.min_split);
    RandomForestRegressor::fit(&matrix, &y.to_vec(), params)
        .map_err(|e| anyhow::anyhow!("Training error: {}", e))
}

fn predict(
    model: &RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    x: &[Vec<f64>],
) -> Result<Vec<f64>> {
    let matrix = DenseMatrix::from_2d_vec(&x.to_vec())
        .map_err(|e| anyhow::anyhow!("Matrix error: {}", e))?;
    model
        .predict(&matrix)
        .map_err(|e| anyhow::anyhow!("Predict error: {}", e))
}

fn save(
    model: &RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    path: &PathBuf,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let mut file = File::create(path).with_context(|| format!("Failed to create {path:?}"))?;
    serde_json::to_writer(&mut file, model)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("Loading bars from {}", args.database_url);
    let database = Database::new(&args.database_url).await?;
    let bar_repo = SqliteBarRepository::new(database.pool.clone());
    let rows = bar_repo.all_ordered(&args.symbol).await?;

    if rows.is_empty() {
        bail!(
            "No stored bars for {}. Run the server through at least one tick first.",
            args.symbol
        );
    }

    let set = features::training_set(&rows)?;
    let n = set.len();
    println!("Total usable rows: {}", n);

    let up_count = set.target_direction.iter().filter(|&&d| d > 0.5).count();
    println!(
        "Label distribution: {} up ({:.1}%), {} down",
        up_count,
        up_count as f64 / n as f64 * 100.0,
        n - up_count
    );

    let split = if args.no_split {
        n
    } else {
        (n as f64 * 0.8).floor() as usize
    };
    if split == 0 {
        bail!("Not enough rows to train on ({n}).");
    }

    println!(
        "Training two Random Forests (Trees: {}, Depth: {}, MinSplit: {}) on {} samples...",
        args.n_trees, args.max_depth, args.min_split, split
    );
    let price_model = fit(&set.matrix[..split], &set.target_price[..split], &args)?;
    let direction_model = fit(&set.matrix[..split], &set.target_direction[..split], &args)?;

    if split < n {
        let x_test = &set.matrix[split..];

        let price_pred = predict(&price_model, x_test)?;
        let sq_err: f64 = price_pred
            .iter()
            .zip(&set.target_price[split..])
            .map(|(p, t)| (p - t).powi(2))
            .sum();
        let rmse = (sq_err / price_pred.len() as f64).sqrt();

        let dir_pred = predict(&direction_model, x_test)?;
        let correct = dir_pred
            .iter()
            .zip(&set.target_direction[split..])
            .filter(|(p, t)| (**p > 0.5) == (**t > 0.5))
            .count();
        let accuracy = correct as f64 / dir_pred.len() as f64;

        println!("OOS Test (n={}):", x_test.len());
        println!("  Price RMSE:          {:.4}", rmse);
        println!("  Direction Accuracy:  {:.1}%", accuracy * 100.0);
    }

    save(&price_model, &args.price_output)?;
    save(&direction_model, &args.direction_output)?;
    println!(
        "Models saved to {:?} and {:?}.",
        args.price_output, args.direction_output
    );

    Ok(())
}
