// Property-based tests for the matcher and the amount rules.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;

use ledgermatch_recon::config::{MatchingConfig, SourceMapping, TierKind};
use ledgermatch_recon::matcher::match_account;
use ledgermatch_recon::model::{Amount, FieldValue, LedgerSource, NormalizedTransaction, RawTransaction};
use ledgermatch_recon::normalize::{amounts_match, normalize, parse_amount_str};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// A date in early 2024, sometimes garbage.
fn arb_date() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => (1u32..=4, 1u32..=28).prop_map(|(m, d)| format!("{m:02}/{d:02}/2024")),
        1 => Just("".to_string()),
        1 => Just("pending".to_string()),
    ]
}

/// A small set of amounts so collisions are common.
fn arb_amount() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::sample::select(vec!["10.00", "-10.00", "25.50", "(25.50)", "100", "-$1,200.00"])
            .prop_map(|s| s.to_string()),
        2 => r"-?[0-9]{1,3}\.[0-9]{2}",
        1 => Just("n/a".to_string()),
    ]
}

fn arb_side(source: LedgerSource) -> impl Strategy<Value = Vec<NormalizedTransaction>> {
    prop::collection::vec((arb_date(), arb_amount(), prop::option::of("[0-9]{3}")), 0..12).prop_map(
        move |rows| {
            let mapping = mapping_for(source);
            rows.into_iter()
                .enumerate()
                .map(|(i, (date, amount, check))| {
                    let mut raw = RawTransaction::new(i + 1);
                    raw.set(&mapping.account, FieldValue::text("1001"));
                    raw.set(&mapping.date, FieldValue::text(date));
                    raw.set(&mapping.amount, FieldValue::text(amount));
                    if let (Some(field), Some(check)) = (&mapping.check_number, check) {
                        raw.set(field, FieldValue::text(check));
                    }
                    if let Some(kind) = &mapping.kind {
                        raw.set(kind, FieldValue::text("Check Paid"));
                    }
                    normalize(raw, source, &mapping)
                })
                .collect()
        },
    )
}

fn mapping_for(source: LedgerSource) -> SourceMapping {
    match source {
        LedgerSource::Bank => SourceMapping::bank(),
        LedgerSource::Internal => SourceMapping::internal(),
    }
}

fn arb_matching() -> impl Strategy<Value = MatchingConfig> {
    (0u32..60, prop::bool::ANY).prop_map(|(window, checks)| {
        let mut config = MatchingConfig::default();
        config.exact_match_days = 0;
        config.close_match_days = window;
        if checks {
            config.tiers = vec![TierKind::DateAmount, TierKind::CheckNumber];
        }
        config
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn partition_is_complete(
        bank in arb_side(LedgerSource::Bank),
        internal in arb_side(LedgerSource::Internal),
        config in arb_matching(),
    ) {
        let result = match_account(&bank, &internal, &config);
        let paired = result.paired_count();
        prop_assert_eq!(paired + result.bank_only.len(), bank.len());
        prop_assert_eq!(paired + result.internal_only.len(), internal.len());
        prop_assert!(result.close_matches.is_empty());
    }

    #[test]
    fn no_record_used_twice(
        bank in arb_side(LedgerSource::Bank),
        internal in arb_side(LedgerSource::Internal),
        config in arb_matching(),
    ) {
        let result = match_account(&bank, &internal, &config);
        let pairs = result.matched.iter().chain(&result.check_matches);

        let mut bank_rows = HashSet::new();
        let mut internal_rows = HashSet::new();
        for pair in pairs {
            prop_assert!(bank_rows.insert(pair.bank.row));
            prop_assert!(internal_rows.insert(pair.internal.row));
        }
        for t in &result.bank_only {
            prop_assert!(bank_rows.insert(t.row));
        }
        for t in &result.internal_only {
            prop_assert!(internal_rows.insert(t.row));
        }
    }

    #[test]
    fn date_amount_pairs_respect_rules(
        bank in arb_side(LedgerSource::Bank),
        internal in arb_side(LedgerSource::Internal),
        config in arb_matching(),
    ) {
        let result = match_account(&bank, &internal, &config);
        for pair in &result.matched {
            prop_assert!(pair.days_difference.abs() <= i64::from(config.close_match_days));
            prop_assert!(amounts_match(pair.bank.amount, pair.internal.amount, config.tolerance()));
            prop_assert!(pair.bank.date.is_some() && pair.internal.date.is_some());
        }
    }

    #[test]
    fn amounts_match_ignores_sign(micros in -1_000_000_000_000i64..1_000_000_000_000, tol in 0i64..100_000) {
        let a = Amount::from_micros(micros);
        let neg = Amount::from_micros(-micros);
        let tol = Amount::from_micros(tol);
        prop_assert_eq!(amounts_match(a, neg, tol), amounts_match(a, a, tol));
    }

    #[test]
    fn parenthesized_equals_minus(whole in 0u32..1_000_000, cents in 0u32..100) {
        let paren = parse_amount_str(&format!("({whole}.{cents:02})"));
        let minus = parse_amount_str(&format!("-{whole}.{cents:02}"));
        prop_assert_eq!(paren, minus);
        prop_assert!(paren.micros() <= 0);
    }
}
