//! # Pipeline Module
//!
//! End-to-end orchestration: load the food corpus and recipes, resolve
//! every distinct ingredient mention, optionally reconcile low-confidence
//! records against an alternate corpus, aggregate per-recipe nutrient
//! totals, and write the four output reports.
//!
//! The pipeline is a single deterministic pass; bulk loading completes
//! before resolution starts.

use anyhow::{Context, Result};
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::candidate_index::CandidateIndex;
use crate::loader::{load_food_corpus, load_recipes};
use crate::match_resolver::{MatchRecord, MatchResolver};
use crate::nutrient_aggregator::{NutrientAggregator, DEFAULT_ASSUMED_MASS};
use crate::reconciliation::{
    AmbiguousEntry, ReconciliationConfig, ReconciliationEngine, ReconciliationReport,
};
use crate::report::{
    write_ambiguity_report, write_ingredient_mapping, write_not_found_report,
    write_recipe_nutrition, MappingRow,
};
use crate::text_normalizer::TextNormalizer;

/// Input and output locations plus tunables for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub food_csv: PathBuf,
    pub food_nutrient_csv: PathBuf,
    pub nutrient_csv: PathBuf,
    pub recipes_json: PathBuf,
    pub output_dir: PathBuf,
    /// Optional more complete corpus used only for exact-match reconciliation
    pub alt_food_csv: Option<PathBuf>,
    pub assumed_mass: f64,
    pub reconciliation: ReconciliationConfig,
}

impl PipelineConfig {
    pub fn new(
        food_csv: PathBuf,
        food_nutrient_csv: PathBuf,
        nutrient_csv: PathBuf,
        recipes_json: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            food_csv,
            food_nutrient_csv,
            nutrient_csv,
            recipes_json,
            output_dir,
            alt_food_csv: None,
            assumed_mass: DEFAULT_ASSUMED_MASS,
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

/// Run metadata and per-tier counts for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub engine_version: String,
    pub run_at: String,
    pub recipes: usize,
    pub distinct_mentions: usize,
    /// tier wire name -> record count after all passes
    pub tier_counts: BTreeMap<&'static str, usize>,
    pub reconciliation: Option<ReconciliationReport>,
}

/// Execute the full pipeline per config
pub fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    let normalizer = TextNormalizer::new();

    let entities = load_food_corpus(
        &config.food_csv,
        &config.food_nutrient_csv,
        &config.nutrient_csv,
        &normalizer,
    )?;
    let recipes = load_recipes(&config.recipes_json)?;

    let primary_ids: HashSet<i64> = entities.iter().map(|e| e.id).collect();
    let index = Arc::new(CandidateIndex::build(entities.clone()));

    // Collect distinct raw mentions, sorted for deterministic output order
    let mut distinct_raw: BTreeSet<&str> = BTreeSet::new();
    for recipe in &recipes {
        for mention in &recipe.ingredients {
            distinct_raw.insert(mention.as_str());
        }
    }
    info!(
        "Resolving {} distinct ingredient mentions across {} recipes",
        distinct_raw.len(),
        recipes.len()
    );

    // First pass: tiered resolution, memoized per normalized text
    let resolver = MatchResolver::new(Arc::clone(&index), TextNormalizer::new());
    let mut raw_to_norm: BTreeMap<&str, String> = BTreeMap::new();
    for raw in &distinct_raw {
        let record = resolver.resolve(raw);
        raw_to_norm.insert(*raw, record.normalized_text.clone());
    }
    let mut records = resolver.into_records();

    // Reconciliation against the alternate corpus when configured,
    // otherwise against the primary index (exact-only either way)
    let (recon_index, aggregation_entities) = match &config.alt_food_csv {
        Some(alt_path) => {
            let alt_entities = load_food_corpus(
                alt_path,
                &config.food_nutrient_csv,
                &config.nutrient_csv,
                &normalizer,
            )?;
            let mut combined = entities;
            combined.extend(
                alt_entities
                    .iter()
                    .filter(|e| !primary_ids.contains(&e.id))
                    .cloned(),
            );
            (Arc::new(CandidateIndex::build(alt_entities)), combined)
        }
        None => (Arc::clone(&index), entities),
    };
    let engine = ReconciliationEngine::new(recon_index, config.reconciliation.clone());
    let recon_report = engine.reconcile(&mut records);
    info!(
        "Reconciliation upgraded {} records ({} ambiguous, {} not found)",
        recon_report.upgraded,
        recon_report.ambiguous.len(),
        recon_report.not_found.len()
    );

    // Aggregation sees the union of both corpora so reconciled ids resolve
    let aggregation_index = Arc::new(CandidateIndex::build(aggregation_entities));
    let aggregator =
        NutrientAggregator::with_assumed_mass(Arc::clone(&aggregation_index), config.assumed_mass);

    let lookup: HashMap<&str, &MatchRecord> = raw_to_norm
        .iter()
        .filter_map(|(raw, norm)| records.get(norm.as_str()).map(|r| (*raw, r)))
        .collect();
    let totals: Vec<_> = recipes
        .iter()
        .map(|recipe| {
            aggregator.recipe_totals(recipe, |mention| lookup.get(mention).copied())
        })
        .collect();

    // Reports
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;
    let mapping_rows: Vec<MappingRow<'_>> = raw_to_norm
        .iter()
        .filter_map(|(raw, norm)| {
            records.get(norm.as_str()).map(|record| MappingRow {
                raw_text: *raw,
                record,
            })
        })
        .collect();
    write_ingredient_mapping(&config.output_dir.join("ingredient_mapping.csv"), &mapping_rows)?;
    write_recipe_nutrition(&config.output_dir.join("recipe_nutrition.csv"), &totals)?;

    // The ambiguity report covers both passes: exact ties flagged during
    // first-pass resolution (tie-broken but never silent) and homonyms the
    // reconciliation engine refused to auto-pick.
    let mut ambiguous: BTreeMap<String, Vec<i64>> = recon_report
        .ambiguous
        .iter()
        .map(|e| (e.normalized_text.clone(), e.candidate_ids.clone()))
        .collect();
    for record in records.values() {
        if !record.ambiguous_candidates.is_empty() {
            ambiguous
                .entry(record.normalized_text.clone())
                .or_insert_with(|| record.ambiguous_candidates.clone());
        }
    }
    let ambiguous_entries: Vec<AmbiguousEntry> = ambiguous
        .into_iter()
        .map(|(normalized_text, candidate_ids)| AmbiguousEntry {
            normalized_text,
            candidate_ids,
        })
        .collect();
    write_ambiguity_report(
        &config.output_dir.join("ingredient_ambiguous.csv"),
        &ambiguous_entries,
    )?;
    write_not_found_report(
        &config.output_dir.join("ingredient_not_found.csv"),
        &recon_report.not_found,
    )?;

    let mut tier_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for record in records.values() {
        *tier_counts.entry(record.tier.as_str()).or_insert(0) += 1;
    }

    Ok(PipelineSummary {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
        recipes: recipes.len(),
        distinct_mentions: distinct_raw.len(),
        tier_counts,
        reconciliation: Some(recon_report),
    })
}
