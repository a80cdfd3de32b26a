//! # Report Module
//!
//! CSV serialization of the pipeline outputs: the ingredient mapping
//! table, per-recipe nutrition totals, and the ambiguity and not-found
//! reports kept for manual resolution. Column vocabulary is stable and
//! matches the original output files.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::match_resolver::MatchRecord;
use crate::nutrient_aggregator::{NutrientKey, RecipeNutritionTotals};
use crate::reconciliation::AmbiguousEntry;

/// One row of the ingredient mapping table: a raw mention with its
/// resolved record
pub struct MappingRow<'a> {
    pub raw_text: &'a str,
    pub record: &'a MatchRecord,
}

/// Write the ingredient mapping table
///
/// Columns: `ingredient_raw, ingredient_norm, fdc_id, fdc_description,
/// match_score, mapped_by`. The id and description columns are empty for
/// unmatched rows.
pub fn write_ingredient_mapping(path: &Path, rows: &[MappingRow<'_>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record([
        "ingredient_raw",
        "ingredient_norm",
        "fdc_id",
        "fdc_description",
        "match_score",
        "mapped_by",
    ])?;
    for row in rows {
        let record = row.record;
        let id = record
            .candidate_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let score = format!("{:.0}", record.score);
        writer.write_record([
            row.raw_text,
            record.normalized_text.as_str(),
            id.as_str(),
            record.candidate_description.as_deref().unwrap_or(""),
            score.as_str(),
            record.tier.as_str(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote ingredient mapping ({} rows) to {}", rows.len(), path.display());
    Ok(())
}

/// Write the per-recipe nutrition table
///
/// Columns: `recipe_id, title, total_weight_g` plus one column per
/// canonical nutrient key, values rounded to 3 decimals.
pub fn write_recipe_nutrition(path: &Path, totals: &[RecipeNutritionTotals]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["recipe_id", "title", "total_weight_g"];
    header.extend(NutrientKey::ALL.iter().map(|k| k.column_name()));
    writer.write_record(&header)?;

    for row in totals {
        let mut fields = vec![
            row.recipe_id.clone(),
            row.title.clone(),
            format!("{}", row.total_weight),
        ];
        fields.extend(
            NutrientKey::ALL
                .iter()
                .map(|&key| format!("{}", row.nutrients.get(key))),
        );
        writer.write_record(&fields)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote recipe nutrition ({} rows) to {}", totals.len(), path.display());
    Ok(())
}

/// Write the ambiguity report: mentions whose normalized text maps to
/// several candidate ids, kept for manual resolution
///
/// Columns: `ingredient_norm, candidate_fdcs` with ids ascending and
/// `;`-joined.
pub fn write_ambiguity_report(path: &Path, entries: &[AmbiguousEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["ingredient_norm", "candidate_fdcs"])?;
    for entry in entries {
        let ids = entry
            .candidate_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(";");
        writer.write_record([entry.normalized_text.as_str(), ids.as_str()])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote ambiguity report ({} rows) to {}", entries.len(), path.display());
    Ok(())
}

/// Write the not-found report: mentions with zero candidates after every pass
pub fn write_not_found_report(path: &Path, mentions: &[String]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["ingredient_norm"])?;
    for mention in mentions {
        writer.write_record([mention.as_str()])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote not-found report ({} rows) to {}", mentions.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_resolver::MatchTier;
    use crate::nutrient_aggregator::NutrientVector;
    use tempfile::TempDir;

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_ingredient_mapping_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.csv");
        let matched = MatchRecord {
            normalized_text: "onions".to_string(),
            candidate_id: Some(2),
            candidate_description: Some("Onions, yellow, raw".to_string()),
            score: 100.0,
            tier: MatchTier::Exact,
            ambiguous_candidates: Vec::new(),
        };
        let unmatched = MatchRecord {
            normalized_text: "dragonfruit".to_string(),
            candidate_id: None,
            candidate_description: None,
            score: 0.0,
            tier: MatchTier::Unmatched,
            ambiguous_candidates: Vec::new(),
        };
        let rows = vec![
            MappingRow {
                raw_text: "2 cups Chopped Onions",
                record: &matched,
            },
            MappingRow {
                raw_text: "dragonfruit",
                record: &unmatched,
            },
        ];

        write_ingredient_mapping(&path, &rows).unwrap();
        let content = read(&path);

        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ingredient_raw,ingredient_norm,fdc_id,fdc_description,match_score,mapped_by"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2 cups Chopped Onions,onions,2,\"Onions, yellow, raw\",100,exact"
        );
        assert_eq!(lines.next().unwrap(), "dragonfruit,dragonfruit,,,0,no_match");
    }

    #[test]
    fn test_recipe_nutrition_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nutrition.csv");
        let mut nutrients = NutrientVector::default();
        nutrients.add(NutrientKey::Protein, 31.0);
        nutrients.add(NutrientKey::Energy, 165.0);
        let totals = vec![RecipeNutritionTotals {
            recipe_id: "r1".to_string(),
            title: "Grilled Chicken".to_string(),
            total_weight: 100.0,
            nutrients,
        }];

        write_recipe_nutrition(&path, &totals).unwrap();
        let content = read(&path);

        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "recipe_id,title,total_weight_g,calories_kcal,protein_g,carbs_g,fat_g,sugar_g,fiber_g,sodium_mg,sat_fat_g"
        );
        assert_eq!(
            lines.next().unwrap(),
            "r1,Grilled Chicken,100,165,31,0,0,0,0,0,0"
        );
    }

    #[test]
    fn test_ambiguity_report_joins_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ambiguous.csv");
        let entries = vec![AmbiguousEntry {
            normalized_text: "rice".to_string(),
            candidate_ids: vec![7, 8],
        }];

        write_ambiguity_report(&path, &entries).unwrap();
        let content = read(&path);

        assert!(content.contains("ingredient_norm,candidate_fdcs"));
        assert!(content.contains("rice,7;8"));
    }

    #[test]
    fn test_not_found_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not_found.csv");

        write_not_found_report(&path, &["dragonfruit".to_string()]).unwrap();
        let content = read(&path);

        assert!(content.contains("ingredient_norm"));
        assert!(content.contains("dragonfruit"));
    }
}
