//! # Match Resolver Module
//!
//! First-pass tiered resolution of ingredient mentions against a
//! [`CandidateIndex`](crate::candidate_index::CandidateIndex). Each
//! distinct normalized mention resolves once to a terminal tier for this
//! pass; records are mutated later only by the reconciliation engine.
//!
//! ## Tiers
//!
//! - `exact` — unique (or deterministically tie-broken) exact match, score 100
//! - `fuzzy_auto` — best fuzzy score at or above the auto-accept threshold
//! - `fuzzy_manual_review` — best fuzzy score below the threshold; the best
//!   candidate and score are still recorded for inspection
//! - `no_match` — nothing to match against
//!
//! Resolution is memoized per distinct normalized text: repeated mentions
//! across recipes share one cached [`MatchRecord`].

use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::candidate_index::CandidateIndex;
use crate::text_normalizer::TextNormalizer;

/// Fuzzy scores at or above this value are auto-accepted
pub const FUZZY_THRESHOLD: f64 = 85.0;

/// Number of candidates requested from fuzzy search
pub const FUZZY_LIMIT: usize = 5;

/// Confidence classification of a match record
///
/// Ordering is total and monotonic; reconciliation never moves a record to
/// a lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    ManualExactFix,
    ExactMatchFix,
    FuzzyAuto,
    FuzzyReview,
    Unmatched,
}

impl MatchTier {
    /// Stable wire name used in the ingredient mapping table
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::ManualExactFix => "manual_exact_fix",
            MatchTier::ExactMatchFix => "exact_match_fix",
            MatchTier::FuzzyAuto => "fuzzy_auto",
            MatchTier::FuzzyReview => "fuzzy_manual_review",
            MatchTier::Unmatched => "no_match",
        }
    }

    /// Monotonic rank: exact > manual_exact_fix == exact_match_fix >
    /// fuzzy_auto > fuzzy_manual_review > no_match
    pub fn rank(&self) -> u8 {
        match self {
            MatchTier::Exact => 4,
            MatchTier::ManualExactFix | MatchTier::ExactMatchFix => 3,
            MatchTier::FuzzyAuto => 2,
            MatchTier::FuzzyReview => 1,
            MatchTier::Unmatched => 0,
        }
    }

    /// Whether reconciliation may still upgrade a record at this tier
    pub fn qualifies_for_reconciliation(&self) -> bool {
        matches!(self, MatchTier::FuzzyReview | MatchTier::Unmatched)
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolution outcome for one distinct normalized mention
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub normalized_text: String,
    pub candidate_id: Option<i64>,
    pub candidate_description: Option<String>,
    /// Match confidence in [0, 100]
    pub score: f64,
    pub tier: MatchTier,
    /// All equally valid candidate ids when an exact lookup was ambiguous,
    /// sorted ascending. Empty for unambiguous records. The ambiguity is
    /// surfaced for operators even when a deterministic tie-break picked a
    /// `candidate_id`.
    pub ambiguous_candidates: Vec<i64>,
}

impl MatchRecord {
    /// The candidate id when the resolution is trusted enough to drive
    /// aggregation
    ///
    /// Review-tier records keep their best candidate for inspection but it
    /// is not accepted; unmatched records have none.
    pub fn accepted_candidate(&self) -> Option<i64> {
        if self.tier.rank() >= MatchTier::FuzzyAuto.rank() {
            self.candidate_id
        } else {
            None
        }
    }

    fn unmatched(normalized_text: String) -> Self {
        Self {
            normalized_text,
            candidate_id: None,
            candidate_description: None,
            score: 0.0,
            tier: MatchTier::Unmatched,
            ambiguous_candidates: Vec::new(),
        }
    }
}

/// Tiered resolver with a per-normalized-text memo cache
///
/// The cache is guarded by a mutex and populated while the lock is held,
/// so concurrent resolution of a not-yet-cached key performs at most one
/// index scan.
pub struct MatchResolver {
    index: Arc<CandidateIndex>,
    normalizer: TextNormalizer,
    cache: Mutex<HashMap<String, Arc<MatchRecord>>>,
}

impl MatchResolver {
    pub fn new(index: Arc<CandidateIndex>, normalizer: TextNormalizer) -> Self {
        Self {
            index,
            normalizer,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a raw mention, reusing the cached record for its normalized text
    pub fn resolve(&self, raw: &str) -> Arc<MatchRecord> {
        let normalized = self.normalizer.normalize(raw);

        let mut cache = self.cache.lock().expect("resolver cache lock poisoned");
        if let Some(record) = cache.get(&normalized) {
            return Arc::clone(record);
        }
        let record = Arc::new(self.compute(normalized.clone()));
        cache.insert(normalized, Arc::clone(&record));
        record
    }

    /// Drain the cache into an owned record set keyed by normalized text
    ///
    /// Used to hand the first-pass results over to the reconciliation
    /// engine, which mutates records in place.
    pub fn into_records(self) -> HashMap<String, MatchRecord> {
        let cache = self
            .cache
            .into_inner()
            .expect("resolver cache lock poisoned");
        cache
            .into_iter()
            .map(|(key, record)| {
                let record = Arc::try_unwrap(record).unwrap_or_else(|arc| (*arc).clone());
                (key, record)
            })
            .collect()
    }

    fn compute(&self, normalized: String) -> MatchRecord {
        // Empty normalized text never participates in exact lookup and has
        // nothing for fuzzy search to rank.
        if normalized.is_empty() {
            debug!("Mention normalized to empty text, recording no_match");
            return MatchRecord::unmatched(normalized);
        }

        let exact_ids = self.index.exact_lookup(&normalized);
        if !exact_ids.is_empty() {
            // Lowest id wins the tie-break; the full candidate set is kept
            // visible when more than one id shares the description.
            let chosen = exact_ids[0];
            let ambiguous = if exact_ids.len() > 1 {
                info!(
                    "Ambiguous exact match for '{}': {:?}, tie-broken to {}",
                    normalized, exact_ids, chosen
                );
                exact_ids.to_vec()
            } else {
                Vec::new()
            };
            return MatchRecord {
                normalized_text: normalized,
                candidate_id: Some(chosen),
                candidate_description: self
                    .index
                    .entity(chosen)
                    .map(|e| e.description.clone()),
                score: 100.0,
                tier: MatchTier::Exact,
                ambiguous_candidates: ambiguous,
            };
        }

        let hits = self.index.fuzzy_search(&normalized, FUZZY_LIMIT);
        match hits.first() {
            Some(best) => {
                let tier = if best.score >= FUZZY_THRESHOLD {
                    MatchTier::FuzzyAuto
                } else {
                    MatchTier::FuzzyReview
                };
                debug!(
                    "Fuzzy match for '{}': candidate {} score {:.1} -> {}",
                    normalized, best.id, best.score, tier
                );
                MatchRecord {
                    normalized_text: normalized,
                    candidate_id: Some(best.id),
                    candidate_description: self
                        .index
                        .entity(best.id)
                        .map(|e| e.description.clone()),
                    score: best.score,
                    tier,
                    ambiguous_candidates: Vec::new(),
                }
            }
            None => {
                debug!("No fuzzy candidates for '{}', recording no_match", normalized);
                MatchRecord::unmatched(normalized)
            }
        }
    }
}
