#[cfg(test)]
mod tests {
    use nutrimap::candidate_index::{CandidateEntity, CandidateIndex};
    use nutrimap::match_resolver::{MatchResolver, MatchTier, FUZZY_THRESHOLD};
    use nutrimap::nutrient_aggregator::{NutrientAggregator, NutrientKey, Recipe};
    use nutrimap::reconciliation::{ReconciliationConfig, ReconciliationEngine};
    use nutrimap::text_normalizer::TextNormalizer;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn entity(id: i64, description: &str, nutrients: &[(&str, f64)]) -> CandidateEntity {
        let vector: BTreeMap<String, f64> = nutrients
            .iter()
            .map(|(name, amount)| (name.to_string(), *amount))
            .collect();
        CandidateEntity::new(id, description, vector, &TextNormalizer::new())
    }

    fn index(entities: Vec<CandidateEntity>) -> Arc<CandidateIndex> {
        Arc::new(CandidateIndex::build(entities))
    }

    #[test]
    fn scenario_a_exact_match_flows_into_totals() {
        let index = index(vec![entity(
            1,
            "Chicken breast raw",
            &[("protein", 31.0), ("energy", 165.0)],
        )]);
        let resolver = MatchResolver::new(Arc::clone(&index), TextNormalizer::new());

        let record = resolver.resolve("2 cups chopped chicken breast raw");
        assert_eq!(record.normalized_text, "chicken breast raw");
        assert_eq!(record.tier, MatchTier::Exact);
        assert_eq!(record.candidate_id, Some(1));

        let aggregator = NutrientAggregator::new(Arc::clone(&index));
        let recipe = Recipe {
            id: Some("r1".to_string()),
            title: "Grilled Chicken".to_string(),
            ingredients: vec!["2 cups chopped chicken breast raw".to_string()],
        };
        let totals = aggregator.recipe_totals(&recipe, |_| Some(record.as_ref()));

        assert_eq!(totals.total_weight, 100.0);
        assert_eq!(totals.nutrients.get(NutrientKey::Protein), 31.0);
        assert_eq!(totals.nutrients.get(NutrientKey::Energy), 165.0);
    }

    #[test]
    fn scenario_b_low_fuzzy_score_contributes_weight_only() {
        let index = index(vec![entity(
            2,
            "Onions, yellow, raw",
            &[("energy", 40.0)],
        )]);
        let resolver = MatchResolver::new(Arc::clone(&index), TextNormalizer::new());

        let record = resolver.resolve("onion");
        assert_eq!(record.tier, MatchTier::FuzzyReview);
        assert_eq!(record.candidate_id, Some(2)); // recorded for inspection
        assert!(record.score < FUZZY_THRESHOLD);

        // review-tier matches are not trusted for nutrition even though a
        // candidate is recorded
        let aggregator = NutrientAggregator::new(Arc::clone(&index));
        let recipe = Recipe {
            id: Some("r1".to_string()),
            title: "Soup".to_string(),
            ingredients: vec!["onion".to_string()],
        };
        let totals = aggregator.recipe_totals(&recipe, |_| Some(record.as_ref()));

        assert_eq!(totals.total_weight, 100.0);
        assert_eq!(totals.nutrients.get(NutrientKey::Energy), 0.0);
    }

    #[test]
    fn scenario_c_priority_reconciliation_upgrades_paneer() {
        // first pass against a corpus without paneer
        let first_index = index(vec![entity(2, "Onions, yellow, raw", &[])]);
        let resolver = MatchResolver::new(first_index, TextNormalizer::new());
        let record = resolver.resolve("paneer");
        assert!(record.tier.qualifies_for_reconciliation());
        let mut records = resolver.into_records();

        // alternate corpus has exactly one candidate with that description
        let alt_index = index(vec![entity(42, "Paneer", &[])]);
        let engine = ReconciliationEngine::new(alt_index, ReconciliationConfig::default());
        engine.reconcile(&mut records);

        let upgraded = &records["paneer"];
        assert_eq!(upgraded.tier, MatchTier::ManualExactFix);
        assert_eq!(upgraded.candidate_id, Some(42));
    }

    #[test]
    fn scenario_d_shared_description_stays_ambiguous() {
        let first_index = index(vec![]);
        let resolver = MatchResolver::new(first_index, TextNormalizer::new());
        resolver.resolve("rice");
        let mut records = resolver.into_records();

        let alt_index = index(vec![entity(7, "rice", &[]), entity(8, "Rice", &[])]);
        let engine = ReconciliationEngine::new(alt_index, ReconciliationConfig::default());
        let report = engine.reconcile(&mut records);

        let record = &records["rice"];
        assert_eq!(record.candidate_id, None);
        assert_eq!(record.tier, MatchTier::Unmatched); // unchanged
        assert_eq!(report.ambiguous.len(), 1);
        assert_eq!(report.ambiguous[0].candidate_ids, vec![7, 8]);
    }

    #[test]
    fn tier_precedence_exact_beats_high_fuzzy() {
        // the exact candidate is a worse fuzzy match than the near-identical
        // one, but exact lookup always wins
        let index = index(vec![
            entity(1, "basmati rice", &[]),
            entity(2, "basmati rice white long grain", &[]),
        ]);
        let resolver = MatchResolver::new(index, TextNormalizer::new());

        let record = resolver.resolve("basmati rice");
        assert_eq!(record.tier, MatchTier::Exact);
        assert_eq!(record.candidate_id, Some(1));
        assert_eq!(record.score, 100.0);
    }

    #[test]
    fn threshold_splits_auto_from_review() {
        let index = index(vec![entity(1, "onions yellow", &[])]);
        let resolver = MatchResolver::new(index, TextNormalizer::new());

        // one character off across a 13-character token-sorted string
        let auto = resolver.resolve("onion yellow");
        assert!(auto.score >= FUZZY_THRESHOLD);
        assert_eq!(auto.tier, MatchTier::FuzzyAuto);

        let review = resolver.resolve("onion");
        assert!(review.score < FUZZY_THRESHOLD);
        assert_eq!(review.tier, MatchTier::FuzzyReview);
    }

    #[test]
    fn reconciliation_twice_is_a_no_op() {
        let first_index = index(vec![]);
        let resolver = MatchResolver::new(first_index, TextNormalizer::new());
        resolver.resolve("paneer");
        resolver.resolve("rice");
        resolver.resolve("dragonfruit");
        let mut records = resolver.into_records();

        let alt_index = index(vec![
            entity(42, "Paneer", &[]),
            entity(7, "rice", &[]),
            entity(8, "Rice", &[]),
        ]);
        let engine = ReconciliationEngine::new(alt_index, ReconciliationConfig::default());

        engine.reconcile(&mut records);
        let after_first = records.clone();
        let second = engine.reconcile(&mut records);

        assert_eq!(records, after_first);
        assert_eq!(second.upgraded, 0);
    }

    #[test]
    fn shared_exact_description_is_flagged_in_first_pass() {
        let index = index(vec![entity(7, "rice", &[]), entity(8, "Rice", &[])]);
        let resolver = MatchResolver::new(index, TextNormalizer::new());

        let record = resolver.resolve("rice");
        assert_eq!(record.tier, MatchTier::Exact);
        assert_eq!(record.candidate_id, Some(7)); // deterministic tie-break
        assert_eq!(record.ambiguous_candidates, vec![7, 8]); // never silent
    }
}
