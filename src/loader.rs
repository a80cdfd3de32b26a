//! # Data Loading Module
//!
//! Thin wrappers that load the food corpus from USDA-style CSVs and
//! recipes from JSON. Column names are resolved declaratively through
//! [`crate::schema`]; an unrecognizable schema fails closed before any
//! resolution starts. Data-quality problems inside recognized columns
//! (unparseable amounts, unknown nutrient ids) degrade gracefully.

use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use crate::candidate_index::CandidateEntity;
use crate::nutrient_aggregator::Recipe;
use crate::schema::{resolve_columns, ColumnMap, FieldSpec};
use crate::text_normalizer::TextNormalizer;

const FOOD_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        canonical: "id",
        synonyms: &["fdc_id", "food_id", "id"],
    },
    FieldSpec {
        canonical: "description",
        synonyms: &[
            "description",
            "fdc_description",
            "food_description",
            "food_name",
            "display_name",
        ],
    },
];

const FOOD_NUTRIENT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        canonical: "fdc_id",
        synonyms: &["fdc_id", "food_id"],
    },
    FieldSpec {
        canonical: "nutrient_id",
        synonyms: &["nutrient_id", "nutrient_nbr"],
    },
    FieldSpec {
        canonical: "amount",
        synonyms: &["amount", "value"],
    },
];

const NUTRIENT_DEF_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        canonical: "id",
        synonyms: &["id", "nutrient_id"],
    },
    FieldSpec {
        canonical: "name",
        synonyms: &["name", "nutrient_name"],
    },
];

fn open_csv(path: &Path) -> Result<(csv::Reader<File>, Vec<String>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read headers from {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    Ok((reader, headers))
}

fn field(record: &csv::StringRecord, columns: &ColumnMap, name: &'static str) -> String {
    columns
        .get(name)
        .and_then(|&i| record.get(i))
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Load nutrient definitions: nutrient id -> lowercased nutrient name
fn load_nutrient_definitions(path: &Path) -> Result<HashMap<String, String>> {
    let (mut reader, headers) = open_csv(path)?;
    let columns = resolve_columns(&headers, NUTRIENT_DEF_FIELDS)
        .with_context(|| format!("Unrecognized nutrient definition schema in {}", path.display()))?;

    let mut definitions = HashMap::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Failed to read row from {}", path.display()))?;
        let id = field(&row, &columns, "id");
        let name = field(&row, &columns, "name").to_lowercase();
        if !id.is_empty() && !name.is_empty() {
            definitions.insert(id, name);
        }
    }
    info!("Loaded {} nutrient definitions", definitions.len());
    Ok(definitions)
}

/// Load per-food nutrient vectors: fdc id -> {lowercased name -> amount per 100 units}
fn load_nutrient_vectors(
    path: &Path,
    definitions: &HashMap<String, String>,
) -> Result<HashMap<String, BTreeMap<String, f64>>> {
    let (mut reader, headers) = open_csv(path)?;
    let columns = resolve_columns(&headers, FOOD_NUTRIENT_FIELDS)
        .with_context(|| format!("Unrecognized food-nutrient schema in {}", path.display()))?;

    let mut vectors: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
    let mut unparseable = 0usize;
    for row in reader.records() {
        let row = row.with_context(|| format!("Failed to read row from {}", path.display()))?;
        let fdc_id = field(&row, &columns, "fdc_id");
        if fdc_id.is_empty() {
            continue;
        }
        let nutrient_id = field(&row, &columns, "nutrient_id");
        // unknown nutrient ids keep the raw id as the name
        let name = definitions
            .get(&nutrient_id)
            .cloned()
            .unwrap_or_else(|| nutrient_id.clone());
        // unparseable amounts become 0.0, never an error
        let amount = match field(&row, &columns, "amount").parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                unparseable += 1;
                0.0
            }
        };
        vectors.entry(fdc_id).or_default().insert(name, amount);
    }
    if unparseable > 0 {
        warn!("{} nutrient amounts were unparseable and treated as 0.0", unparseable);
    }
    info!("Built nutrient vectors for {} foods", vectors.len());
    Ok(vectors)
}

/// Load the candidate corpus from food, food-nutrient and nutrient CSVs
///
/// Foods without nutrient rows still become candidates (they match but
/// contribute nothing). Fails closed on an unrecognizable schema.
pub fn load_food_corpus(
    food_csv: &Path,
    food_nutrient_csv: &Path,
    nutrient_csv: &Path,
    normalizer: &TextNormalizer,
) -> Result<Vec<CandidateEntity>> {
    let definitions = load_nutrient_definitions(nutrient_csv)?;
    let mut vectors = load_nutrient_vectors(food_nutrient_csv, &definitions)?;

    let (mut reader, headers) = open_csv(food_csv)?;
    let columns = resolve_columns(&headers, FOOD_FIELDS)
        .with_context(|| format!("Unrecognized food schema in {}", food_csv.display()))?;

    let mut entities = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Failed to read row from {}", food_csv.display()))?;
        let raw_id = field(&row, &columns, "id");
        let Ok(id) = raw_id.parse::<i64>() else {
            warn!("Skipping food row with non-numeric id '{}'", raw_id);
            continue;
        };
        let description = field(&row, &columns, "description");
        let nutrient_vector = vectors.remove(&raw_id).unwrap_or_default();
        entities.push(CandidateEntity::new(
            id,
            &description,
            nutrient_vector,
            normalizer,
        ));
    }
    info!("Loaded {} candidate entities from {}", entities.len(), food_csv.display());
    Ok(entities)
}

/// Load recipes from a JSON array of `{id, title, ingredients}` objects
pub fn load_recipes(path: &Path) -> Result<Vec<Recipe>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open recipes file {}", path.display()))?;
    let recipes: Vec<Recipe> = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse recipes JSON in {}", path.display()))?;
    info!("Loaded {} recipes from {}", recipes.len(), path.display());
    Ok(recipes)
}
