//! # Nutrimap CLI
//!
//! Loads a food corpus and recipes from paths configured via environment
//! variables, runs the resolution pipeline, and writes the mapping,
//! nutrition, ambiguity and not-found reports.

use anyhow::{Context, Result};
use log::info;
use std::env;
use std::path::PathBuf;

use nutrimap::pipeline::{self, PipelineConfig};

fn required_path(var: &str) -> Result<PathBuf> {
    env::var(var)
        .map(PathBuf::from)
        .with_context(|| format!("{var} must be set"))
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    info!("Starting nutrimap pipeline");

    let mut config = PipelineConfig::new(
        required_path("FOOD_CSV")?,
        required_path("FOOD_NUTRIENT_CSV")?,
        required_path("NUTRIENT_CSV")?,
        required_path("RECIPES_JSON")?,
        env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data")),
    );
    config.alt_food_csv = env::var("ALT_FOOD_CSV").ok().map(PathBuf::from);
    if let Ok(mass) = env::var("ASSUMED_MASS_G") {
        config.assumed_mass = mass
            .parse()
            .context("ASSUMED_MASS_G must be a number of grams")?;
    }

    let summary = pipeline::run(&config)?;

    info!(
        "Pipeline v{} finished at {}: {} recipes, {} distinct mentions",
        summary.engine_version, summary.run_at, summary.recipes, summary.distinct_mentions
    );
    for (tier, count) in &summary.tier_counts {
        info!("  {tier}: {count}");
    }

    Ok(())
}
