//! # Nutrimap
//!
//! Resolves free-text recipe ingredient mentions to canonical entries in
//! a nutrition database and aggregates per-recipe nutrient totals.

pub mod candidate_index;
pub mod loader;
pub mod match_resolver;
pub mod nutrient_aggregator;
pub mod pipeline;
pub mod reconciliation;
pub mod report;
pub mod schema;
pub mod text_normalizer;
