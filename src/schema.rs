//! # Schema Resolution Module
//!
//! Declarative resolution of input CSV columns to canonical field names.
//! Each canonical field carries an explicit synonym list; a header matches
//! a synonym exactly (case-insensitive). Resolution fails closed: a
//! required field with no matching header, or with more than one distinct
//! matching header, is a configuration error — the caller never guesses
//! at an empty or wrong column.

use log::debug;
use std::collections::HashMap;

/// One canonical field and the header names accepted for it
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub canonical: &'static str,
    /// Accepted header names, compared case-insensitively
    pub synonyms: &'static [&'static str],
}

/// Canonical field name -> column position
pub type ColumnMap = HashMap<&'static str, usize>;

/// Schema resolution failure modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No header matched any synonym of a required field
    MissingField {
        canonical: String,
        headers: Vec<String>,
    },
    /// More than one distinct header matched one field's synonyms
    AmbiguousField {
        canonical: String,
        headers: Vec<String>,
    },
    /// One header matched the synonyms of more than one field
    ConflictingHeader { header: String, fields: Vec<String> },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::MissingField { canonical, headers } => write!(
                f,
                "no column for required field '{canonical}' among headers {headers:?}"
            ),
            SchemaError::AmbiguousField { canonical, headers } => write!(
                f,
                "field '{canonical}' matches multiple columns {headers:?}; refusing to guess"
            ),
            SchemaError::ConflictingHeader { header, fields } => write!(
                f,
                "column '{header}' matches multiple fields {fields:?}; refusing to guess"
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Resolve headers against the given field specs
///
/// The result maps every canonical field to exactly one column index; the
/// mapping is injective. Any absence or ambiguity is an error.
pub fn resolve_columns(headers: &[String], specs: &[FieldSpec]) -> Result<ColumnMap, SchemaError> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let mut map = ColumnMap::new();
    let mut claimed: HashMap<usize, &'static str> = HashMap::new();

    for spec in specs {
        let matches: Vec<usize> = lowered
            .iter()
            .enumerate()
            .filter(|(_, header)| spec.synonyms.iter().any(|s| **header == s.to_lowercase()))
            .map(|(i, _)| i)
            .collect();

        match matches.len() {
            0 => {
                return Err(SchemaError::MissingField {
                    canonical: spec.canonical.to_string(),
                    headers: headers.to_vec(),
                })
            }
            1 => {
                let column = matches[0];
                if let Some(other) = claimed.get(&column) {
                    return Err(SchemaError::ConflictingHeader {
                        header: headers[column].clone(),
                        fields: vec![other.to_string(), spec.canonical.to_string()],
                    });
                }
                debug!(
                    "Resolved field '{}' to column {} ('{}')",
                    spec.canonical, column, headers[column]
                );
                claimed.insert(column, spec.canonical);
                map.insert(spec.canonical, column);
            }
            _ => {
                return Err(SchemaError::AmbiguousField {
                    canonical: spec.canonical.to_string(),
                    headers: matches.iter().map(|&i| headers[i].clone()).collect(),
                })
            }
        }
    }

    Ok(map)
}
