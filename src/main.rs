//! NutriCheck - Nutrition label analysis
//!
//! Reads nutrient values from a photographed nutrition-facts label, scores
//! the product and keeps a history of past analyses.

mod analysis;
mod app;
mod config;
mod nutrition;
mod scoring;
mod storage;
mod vision;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::{compare_ids, evaluate_text, NutrientStanding};
use crate::app::NutriCheckApp;
use crate::config::AppConfig;
use crate::nutrition::{format_amount, Nutrient, NutrientProfile};
use crate::scoring::ScoreBreakdown;
use crate::storage::{AnalysisRecord, AnalysisStore};

/// Image types accepted for analysis
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// NutriCheck - nutrition label scanner and health scoring
#[derive(Parser, Debug)]
#[command(name = "nutricheck")]
#[command(about = "Extract nutrients from a nutrition label photo and score the product")]
struct Args {
    /// Configuration file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a label photograph and save the result
    Analyze {
        image: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Score label text that was already transcribed (nothing is saved)
    Extract {
        text_file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List saved analyses, most recent first
    History {
        #[arg(long)]
        json: bool,
    },
    /// Show one saved analysis
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved analysis
    Delete { id: i64 },
    /// Compare two or more saved analyses
    Compare {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<i64>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (config_path, database_path) = (args.config, args.database);
    let open_app = || -> Result<NutriCheckApp> {
        let mut config = load_or_create_config(config_path.as_deref())?;
        if let Some(database) = database_path.clone() {
            config.storage.database_path = Some(database);
        }
        NutriCheckApp::new(config)
    };

    match args.command {
        Command::Analyze { image, json } => {
            validate_image(&image)?;
            let app = open_app()?;
            let outcome = app.analyzer().analyze(&image)?;
            if json {
                print_json(&outcome)?;
            } else {
                print_record(&outcome.record);
                print_breakdown(&outcome.breakdown);
            }
        }
        Command::Extract { text_file, json } => run_extract(&text_file, json)?,
        Command::History { json } => {
            let records = open_app()?.database().list()?;
            if json {
                print_json(&records)?;
            } else if records.is_empty() {
                println!("No analyses saved yet");
            } else {
                for record in &records {
                    println!(
                        "#{:<5} {:>3}  {:<22} {}  ({})",
                        record.id,
                        record.health_score,
                        record.verdict,
                        record.product_name,
                        record.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        Command::Show { id, json } => {
            let record = open_app()?
                .database()
                .get(id)?
                .with_context(|| format!("analysis {} not found", id))?;
            if json {
                print_json(&record)?;
            } else {
                print_record(&record);
            }
        }
        Command::Delete { id } => {
            if !open_app()?.database().delete(id)? {
                bail!("analysis {} not found", id);
            }
            println!("Deleted analysis {}", id);
        }
        Command::Compare { ids, json } => {
            let comparison = compare_ids(open_app()?.database(), &ids)?;
            if json {
                print_json(&comparison)?;
            } else {
                for product in &comparison.products {
                    let record = &product.record;
                    let badge = if product.is_winner { "  [best pick]" } else { "" };
                    println!(
                        "#{} {} - {} ({}){}",
                        record.id, record.product_name, record.health_score, record.verdict, badge
                    );
                    for nutrient in Nutrient::ALL {
                        let marker = match product.standings[&nutrient] {
                            NutrientStanding::Best => " *",
                            NutrientStanding::Worse | NutrientStanding::Unknown => "",
                        };
                        println!(
                            "    {:<9} {}{}",
                            nutrient.key(),
                            amount_text(&record.nutrients, nutrient),
                            marker
                        );
                    }
                }
                let winners: Vec<&str> = comparison
                    .winners()
                    .map(|r| r.product_name.as_str())
                    .collect();
                println!("Best pick: {}", winners.join(", "));
            }
        }
    }

    Ok(())
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(explicit: Option<&Path>) -> Result<AppConfig> {
    // An explicitly requested file must load
    if let Some(path) = explicit {
        let config = config::load_config(path)
            .with_context(|| format!("load configuration {}", path.display()))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    match storage::get_config_dir() {
        Ok(config_dir) => Ok(load_or_create_in(&config_dir)),
        Err(e) => {
            warn!("No configuration directory: {:#}", e);
            info!("Using default configuration");
            Ok(AppConfig::default())
        }
    }
}

/// Load `config.toml` from a directory, writing the defaults there when absent
fn load_or_create_in(config_dir: &Path) -> AppConfig {
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        match config::load_config(&config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
            Err(e) => warn!("Ignoring unreadable configuration {:?}: {:#}", config_path, e),
        }
        info!("Using default configuration");
        return AppConfig::default();
    }

    let config = AppConfig::default();
    match config::save_config(&config, &config_path) {
        Ok(()) => info!("Wrote default configuration to {:?}", config_path),
        Err(e) => warn!("Could not write default configuration {:?}: {:#}", config_path, e),
    }
    config
}

/// Reject missing files and unsupported image types before analysis
fn validate_image(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("image not found: {}", path.display());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "unsupported image type '{}' (expected one of: {})",
            path.display(),
            IMAGE_EXTENSIONS.join(", ")
        );
    }
    Ok(())
}

fn run_extract(text_file: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(text_file)
        .with_context(|| format!("read {}", text_file.display()))?;
    let evaluation = evaluate_text(&text);

    if json {
        return print_json(&evaluation);
    }

    println!("{}", evaluation.product_name);
    print_nutrients(&evaluation.nutrients);
    println!(
        "Health score: {} ({})",
        evaluation.score.health_score, evaluation.score.verdict
    );
    println!("{}", evaluation.score.explanation);
    println!("{}", evaluation.score.recommendation);
    print_breakdown(&evaluation.score.breakdown);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn amount_text(nutrients: &NutrientProfile, nutrient: Nutrient) -> String {
    match nutrients.get(nutrient) {
        Some(value) => format!("{} {}", format_amount(value), nutrient.unit()),
        None => "unknown".to_string(),
    }
}

fn print_nutrients(nutrients: &NutrientProfile) {
    for nutrient in Nutrient::ALL {
        println!("  {:<9} {}", nutrient.key(), amount_text(nutrients, nutrient));
    }
}

fn print_record(record: &AnalysisRecord) {
    println!("Analysis #{}: {}", record.id, record.product_name);
    println!("Image: {}", record.image_path);
    print_nutrients(&record.nutrients);
    println!("Health score: {} ({})", record.health_score, record.verdict);
    println!("{}", record.explanation);
    println!("{}", record.recommendation);
}

fn print_breakdown(breakdown: &ScoreBreakdown) {
    println!("Points:");
    for (nutrient, points) in breakdown.negative.by_nutrient() {
        println!("  {:<9} -{}", nutrient.key(), points);
    }
    for (nutrient, points) in breakdown.positive.by_nutrient() {
        println!("  {:<9} +{}", nutrient.key(), points);
    }
    println!(
        "  total     -{} +{}",
        breakdown.negative.total, breakdown.positive.total
    );
}
