//! # Reconciliation Engine Module
//!
//! Later exact-only passes that upgrade low-confidence or unmatched
//! records against a candidate index that may come from a different,
//! more complete corpus than the one the first pass used. Fuzzy scoring
//! is never consulted here.
//!
//! Two ordered passes:
//!
//! 1. **Priority pass** — only mentions containing a configured priority
//!    token (domain-critical ingredients); unique exact hits upgrade to
//!    `manual_exact_fix`.
//! 2. **General pass** — the same exact-only procedure for every record
//!    still in a qualifying tier; unique exact hits upgrade to
//!    `exact_match_fix`.
//!
//! Ambiguous exact hits (several ids behind one normalized description)
//! are never auto-picked: the record keeps `candidate_id = None` and the
//! full candidate set is reported for manual resolution. Running the
//! engine twice over an already-reconciled record set is a no-op.

use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::candidate_index::CandidateIndex;
use crate::match_resolver::{MatchRecord, MatchTier};

/// Default domain-critical ingredient tokens tried in the priority pass
const DEFAULT_PRIORITY_TOKENS: &[&str] = &[
    "paneer", "rice", "dal", "ghee", "yogurt", "yoghurt", "oil", "spice", "spices",
];

/// Configuration for the reconciliation passes
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// Substrings of normalized text that mark a mention as domain-critical
    pub priority_tokens: Vec<String>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            priority_tokens: DEFAULT_PRIORITY_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// One ambiguity report row: a normalized mention with every equally valid
/// candidate id, ascending
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousEntry {
    pub normalized_text: String,
    pub candidate_ids: Vec<i64>,
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    /// Number of records upgraded across both passes
    pub upgraded: usize,
    /// Mentions left unresolved because several candidates share their
    /// normalized description; deduplicated and sorted by mention
    pub ambiguous: Vec<AmbiguousEntry>,
    /// Mentions with zero exact candidates after both passes, sorted
    pub not_found: Vec<String>,
}

/// Exact-only multi-pass upgrader for low-confidence match records
pub struct ReconciliationEngine {
    index: Arc<CandidateIndex>,
    config: ReconciliationConfig,
}

impl ReconciliationEngine {
    pub fn new(index: Arc<CandidateIndex>, config: ReconciliationConfig) -> Self {
        Self { index, config }
    }

    /// Run both passes over the record set, mutating qualifying records in
    /// place and reporting ambiguous / not-found mentions
    pub fn reconcile(&self, records: &mut HashMap<String, MatchRecord>) -> ReconciliationReport {
        let mut ambiguous: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        let mut not_found: BTreeSet<String> = BTreeSet::new();
        let mut upgraded = 0;

        // Priority pass
        let priority_keys: Vec<String> = records
            .values()
            .filter(|r| r.tier.qualifies_for_reconciliation())
            .filter(|r| self.is_priority(&r.normalized_text))
            .map(|r| r.normalized_text.clone())
            .collect();
        info!(
            "Reconciliation priority pass: {} qualifying mentions",
            priority_keys.len()
        );
        for key in priority_keys {
            upgraded += self.try_upgrade(
                records,
                &key,
                MatchTier::ManualExactFix,
                &mut ambiguous,
                &mut not_found,
            );
        }

        // General pass over everything still qualifying, including rows
        // already attempted above; upgraded rows no longer qualify.
        let remaining_keys: Vec<String> = records
            .values()
            .filter(|r| r.tier.qualifies_for_reconciliation())
            .map(|r| r.normalized_text.clone())
            .collect();
        info!(
            "Reconciliation general pass: {} qualifying mentions",
            remaining_keys.len()
        );
        for key in remaining_keys {
            upgraded += self.try_upgrade(
                records,
                &key,
                MatchTier::ExactMatchFix,
                &mut ambiguous,
                &mut not_found,
            );
        }

        ReconciliationReport {
            upgraded,
            ambiguous: ambiguous
                .into_iter()
                .map(|(normalized_text, candidate_ids)| AmbiguousEntry {
                    normalized_text,
                    candidate_ids,
                })
                .collect(),
            not_found: not_found.into_iter().collect(),
        }
    }

    fn is_priority(&self, normalized: &str) -> bool {
        self.config
            .priority_tokens
            .iter()
            .any(|token| normalized.contains(token.as_str()))
    }

    /// Attempt an exact-only upgrade of one record. Returns 1 when the
    /// record was upgraded, 0 otherwise.
    fn try_upgrade(
        &self,
        records: &mut HashMap<String, MatchRecord>,
        key: &str,
        upgrade_tier: MatchTier,
        ambiguous: &mut BTreeMap<String, Vec<i64>>,
        not_found: &mut BTreeSet<String>,
    ) -> usize {
        let record = match records.get_mut(key) {
            Some(r) if r.tier.qualifies_for_reconciliation() => r,
            _ => return 0,
        };

        if record.normalized_text.is_empty() {
            not_found.insert(record.normalized_text.clone());
            return 0;
        }

        let ids = self.index.exact_lookup(&record.normalized_text);
        match ids.len() {
            0 => {
                not_found.insert(record.normalized_text.clone());
                0
            }
            1 => {
                let id = ids[0];
                debug!(
                    "Upgrading '{}' to {} with candidate {}",
                    record.normalized_text, upgrade_tier, id
                );
                record.candidate_id = Some(id);
                record.candidate_description =
                    self.index.entity(id).map(|e| e.description.clone());
                record.tier = upgrade_tier;
                record.ambiguous_candidates.clear();
                1
            }
            _ => {
                // Never auto-pick among homonymous descriptions: keep the
                // record untouched apart from surfacing the candidate set.
                record.candidate_id = None;
                record.candidate_description = None;
                record.ambiguous_candidates = ids.to_vec();
                ambiguous.insert(record.normalized_text.clone(), ids.to_vec());
                0
            }
        }
    }
}
