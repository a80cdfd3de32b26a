//! # Candidate Index Module
//!
//! Read-only exact and approximate lookup structures over a food corpus.
//! The index is built once from a set of [`CandidateEntity`] values and is
//! immutable afterwards, so it can be shared across threads behind an
//! `Arc` without coordination.

use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

use crate::text_normalizer::TextNormalizer;

/// A canonical food entry from the nutrition database
///
/// `nutrient_vector` maps a lowercased source nutrient name to an amount
/// defined per 100 reference units of mass. A `BTreeMap` keeps name
/// iteration deterministic for alias resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEntity {
    pub id: i64,
    pub description: String,
    pub normalized_description: String,
    pub nutrient_vector: BTreeMap<String, f64>,
}

impl CandidateEntity {
    /// Build an entity, normalizing its description with the given normalizer
    pub fn new(
        id: i64,
        description: &str,
        nutrient_vector: BTreeMap<String, f64>,
        normalizer: &TextNormalizer,
    ) -> Self {
        Self {
            id,
            description: description.to_string(),
            normalized_description: normalizer.normalize(description),
            nutrient_vector,
        }
    }
}

/// One ranked result from a fuzzy search
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit {
    pub id: i64,
    /// Similarity score in [0, 100]
    pub score: f64,
}

/// Exact and approximate lookup structures over candidate descriptions
///
/// Side-effect free after construction; lookups never mutate.
pub struct CandidateIndex {
    /// normalized description -> ids, sorted ascending. Entities with an
    /// empty normalized description never enter this map.
    exact: HashMap<String, Vec<i64>>,
    /// (id, token-sorted normalized description) pairs for fuzzy scoring;
    /// empty descriptions are excluded here too.
    fuzzy_corpus: Vec<(i64, String)>,
    by_id: HashMap<i64, CandidateEntity>,
}

/// Sort the tokens of a normalized string so that scoring ignores token order
fn token_sorted(normalized: &str) -> String {
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

impl CandidateIndex {
    /// Build the index from a candidate collection
    pub fn build(entities: Vec<CandidateEntity>) -> Self {
        let mut exact: HashMap<String, Vec<i64>> = HashMap::new();
        let mut fuzzy_corpus = Vec::new();
        let mut by_id = HashMap::with_capacity(entities.len());

        for entity in entities {
            if !entity.normalized_description.is_empty() {
                exact
                    .entry(entity.normalized_description.clone())
                    .or_default()
                    .push(entity.id);
                fuzzy_corpus.push((entity.id, token_sorted(&entity.normalized_description)));
            } else {
                debug!(
                    "Candidate {} has an empty normalized description, excluded from lookups",
                    entity.id
                );
            }
            by_id.insert(entity.id, entity);
        }

        for ids in exact.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        info!(
            "Built candidate index: {} entities, {} distinct normalized descriptions",
            by_id.len(),
            exact.len()
        );

        Self {
            exact,
            fuzzy_corpus,
            by_id,
        }
    }

    /// All candidate ids whose normalized description equals the query
    ///
    /// May legitimately return more than one id (homonymous descriptions
    /// under different ids). Ids are sorted ascending.
    pub fn exact_lookup(&self, normalized: &str) -> &[i64] {
        if normalized.is_empty() {
            return &[];
        }
        self.exact.get(normalized).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Top-`k` candidates by token-order-insensitive similarity
    ///
    /// Both sides have their tokens sorted lexicographically before
    /// scoring with normalized Levenshtein similarity scaled to [0, 100].
    /// Results are ranked score-descending with ties broken by ascending
    /// id. Never fails; returns between 0 and `k` hits.
    pub fn fuzzy_search(&self, query: &str, k: usize) -> Vec<FuzzyHit> {
        if k == 0 || self.fuzzy_corpus.is_empty() {
            return Vec::new();
        }
        let query_sorted = token_sorted(query);

        let mut hits: Vec<FuzzyHit> = self
            .fuzzy_corpus
            .iter()
            .map(|(id, desc)| FuzzyHit {
                id: *id,
                score: strsim::normalized_levenshtein(&query_sorted, desc) * 100.0,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(k);
        hits
    }

    /// Look up a candidate entity by id
    pub fn entity(&self, id: i64) -> Option<&CandidateEntity> {
        self.by_id.get(&id)
    }

    /// Number of entities held by the index
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the index holds no entities
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
