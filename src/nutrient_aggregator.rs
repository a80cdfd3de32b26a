//! # Nutrient Aggregator Module
//!
//! Turns resolved matches plus an assumed mass per mention into per-recipe
//! nutrient totals.
//!
//! Candidate nutrient amounts are defined per 100 reference mass units.
//! Source nutrient names vary between database releases ("Energy",
//! "Energy (Atwater General Factors)", "Sugars, total including NLEA"),
//! so each canonical output key carries an explicit, priority-ordered
//! alias list; the first alias that matches any of a candidate's recorded
//! nutrient names wins. A key with no matching alias contributes 0 — that
//! is a data condition, not an error.

use log::{debug, trace};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use crate::candidate_index::CandidateIndex;
use crate::match_resolver::MatchRecord;

/// Assumed mass per ingredient mention when no quantity is available,
/// in reference mass units (grams for the USDA corpus)
pub const DEFAULT_ASSUMED_MASS: f64 = 100.0;

/// Fixed canonical nutrient output categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NutrientKey {
    Energy,
    Protein,
    Carbohydrate,
    Fat,
    Sugars,
    Fiber,
    Sodium,
    SaturatedFat,
}

impl NutrientKey {
    /// All canonical keys in stable output order
    pub const ALL: [NutrientKey; 8] = [
        NutrientKey::Energy,
        NutrientKey::Protein,
        NutrientKey::Carbohydrate,
        NutrientKey::Fat,
        NutrientKey::Sugars,
        NutrientKey::Fiber,
        NutrientKey::Sodium,
        NutrientKey::SaturatedFat,
    ];

    /// Column name in the recipe nutrition table
    pub fn column_name(&self) -> &'static str {
        match self {
            NutrientKey::Energy => "calories_kcal",
            NutrientKey::Protein => "protein_g",
            NutrientKey::Carbohydrate => "carbs_g",
            NutrientKey::Fat => "fat_g",
            NutrientKey::Sugars => "sugar_g",
            NutrientKey::Fiber => "fiber_g",
            NutrientKey::Sodium => "sodium_mg",
            NutrientKey::SaturatedFat => "sat_fat_g",
        }
    }
}

/// How an alias is compared against a source nutrient name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasMatch {
    /// Alias must appear anywhere inside the source name
    Substring,
    /// Alias must equal the source name
    Exact,
}

/// One entry in a priority-ordered alias list
#[derive(Debug, Clone)]
pub struct NutrientAlias {
    /// Lowercased pattern compared against lowercased source names
    pub pattern: &'static str,
    pub kind: AliasMatch,
}

impl NutrientAlias {
    const fn substring(pattern: &'static str) -> Self {
        Self {
            pattern,
            kind: AliasMatch::Substring,
        }
    }

    fn matches(&self, source_name: &str) -> bool {
        match self.kind {
            AliasMatch::Substring => source_name.contains(self.pattern),
            AliasMatch::Exact => source_name == self.pattern,
        }
    }
}

/// Priority-ordered aliases per canonical key. Earlier aliases win over
/// later ones regardless of the order nutrient names appear in the source
/// data. "sugars, total" is deliberately ranked above the bare "sugars"
/// so that "Sugars, added" never shadows the total when both are present.
static ALIAS_TABLE: LazyLock<BTreeMap<NutrientKey, Vec<NutrientAlias>>> = LazyLock::new(|| {
    let mut table = BTreeMap::new();
    table.insert(NutrientKey::Energy, vec![NutrientAlias::substring("energy")]);
    table.insert(
        NutrientKey::Protein,
        vec![NutrientAlias::substring("protein")],
    );
    table.insert(
        NutrientKey::Carbohydrate,
        vec![NutrientAlias::substring("carbohydrate")],
    );
    table.insert(
        NutrientKey::Fat,
        vec![NutrientAlias::substring("total lipid (fat)")],
    );
    table.insert(
        NutrientKey::Sugars,
        vec![
            NutrientAlias::substring("sugars, total"),
            NutrientAlias::substring("sugars"),
        ],
    );
    table.insert(NutrientKey::Fiber, vec![NutrientAlias::substring("fiber")]);
    table.insert(
        NutrientKey::Sodium,
        vec![NutrientAlias::substring("sodium")],
    );
    table.insert(
        NutrientKey::SaturatedFat,
        vec![
            NutrientAlias::substring("fatty acids, total saturated"),
            NutrientAlias::substring("saturated"),
        ],
    );
    table
});

/// Totals for the canonical nutrient keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientVector {
    values: BTreeMap<NutrientKey, f64>,
}

impl NutrientVector {
    pub fn get(&self, key: NutrientKey) -> f64 {
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, key: NutrientKey, amount: f64) {
        *self.values.entry(key).or_insert(0.0) += amount;
    }

    /// Round every value to 3 decimal places
    pub fn rounded(mut self) -> Self {
        for value in self.values.values_mut() {
            *value = (*value * 1000.0).round() / 1000.0;
        }
        self
    }
}

/// A recipe to aggregate: ordered ingredient mentions under one identifier
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Recipe {
    /// Missing ids fall back to the title (data-quality condition)
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl Recipe {
    /// Recipe identifier, falling back to the title when absent
    pub fn identifier(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.title)
    }
}

/// Per-recipe nutrition output row
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeNutritionTotals {
    pub recipe_id: String,
    pub title: String,
    pub total_weight: f64,
    pub nutrients: NutrientVector,
}

/// Aggregates resolved matches into per-recipe totals
pub struct NutrientAggregator {
    index: Arc<CandidateIndex>,
    assumed_mass: f64,
}

impl NutrientAggregator {
    pub fn new(index: Arc<CandidateIndex>) -> Self {
        Self::with_assumed_mass(index, DEFAULT_ASSUMED_MASS)
    }

    /// Use a custom flat mass per mention instead of the default
    pub fn with_assumed_mass(index: Arc<CandidateIndex>, assumed_mass: f64) -> Self {
        Self {
            index,
            assumed_mass,
        }
    }

    /// Compute totals for one recipe
    ///
    /// `resolve` maps each raw mention to its match record. Every mention
    /// adds the assumed mass to `total_weight`; only mentions with an
    /// accepted candidate contribute nutrients, scaled by
    /// `assumed_mass / 100`. Review-tier matches are recorded for
    /// inspection but never trusted for nutrition.
    pub fn recipe_totals<'a, F>(&self, recipe: &'a Recipe, mut resolve: F) -> RecipeNutritionTotals
    where
        F: FnMut(&'a str) -> Option<&'a MatchRecord>,
    {
        let mut total_weight = 0.0;
        let mut nutrients = NutrientVector::default();

        for mention in &recipe.ingredients {
            total_weight += self.assumed_mass;

            let candidate_id = resolve(mention).and_then(|r| r.accepted_candidate());
            let Some(id) = candidate_id else {
                trace!("Mention '{}' unmatched, contributes weight only", mention);
                continue;
            };
            let Some(entity) = self.index.entity(id) else {
                debug!("Candidate {} missing from index, contributes nothing", id);
                continue;
            };

            for key in NutrientKey::ALL {
                if let Some(amount_per_100) = find_amount(&entity.nutrient_vector, key) {
                    nutrients.add(key, amount_per_100 * self.assumed_mass / 100.0);
                }
            }
        }

        RecipeNutritionTotals {
            recipe_id: recipe.identifier().to_string(),
            title: recipe.title.clone(),
            total_weight,
            nutrients: nutrients.rounded(),
        }
    }
}

/// Resolve one canonical key against a candidate's recorded nutrient names.
///
/// First alias in priority order wins; within one alias the
/// lexicographically smallest matching source name is taken (the map is a
/// `BTreeMap`, so iteration order is stable).
fn find_amount(nutrient_vector: &BTreeMap<String, f64>, key: NutrientKey) -> Option<f64> {
    let aliases = ALIAS_TABLE.get(&key)?;
    for alias in aliases {
        for (name, amount) in nutrient_vector {
            if alias.matches(name) {
                return Some(*amount);
            }
        }
    }
    None
}
