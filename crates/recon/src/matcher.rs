//! Per-account matching.
//!
//! Matching runs as an ordered list of tiers. Each tier walks the records that
//! earlier tiers left unclaimed and pairs them greedily: a bank record takes
//! the *first* eligible internal record in input order, not the closest one.
//! Results are therefore deterministic for a given input order.

use crate::config::{MatchingConfig, TierKind};
use crate::model::{Amount, MatchResult, MatchType, MatchedPair, NormalizedTransaction};
use crate::normalize::{amounts_match, days_difference};

/// Result partition a tier's pairs are filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Matched,
    /// Reserved; no shipped tier files here.
    CloseMatches,
    CheckMatches,
}

/// One matching pass over the still-unclaimed records.
pub trait MatchTier {
    fn kind(&self) -> TierKind;

    fn partition(&self) -> Partition;

    /// Claim pairs from `state`, returning them in the order they were made.
    fn run(&self, state: &mut MatchState<'_>) -> Vec<MatchedPair>;
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Claim bookkeeping shared by all tiers of one account.
pub struct MatchState<'a> {
    bank: &'a [NormalizedTransaction],
    internal: &'a [NormalizedTransaction],
    bank_claimed: Vec<bool>,
    internal_claimed: Vec<bool>,
}

impl<'a> MatchState<'a> {
    pub fn new(bank: &'a [NormalizedTransaction], internal: &'a [NormalizedTransaction]) -> Self {
        Self {
            bank,
            internal,
            bank_claimed: vec![false; bank.len()],
            internal_claimed: vec![false; internal.len()],
        }
    }

    pub fn bank(&self) -> &'a [NormalizedTransaction] {
        self.bank
    }

    pub fn internal(&self) -> &'a [NormalizedTransaction] {
        self.internal
    }

    pub fn is_bank_claimed(&self, idx: usize) -> bool {
        self.bank_claimed[idx]
    }

    pub fn is_internal_claimed(&self, idx: usize) -> bool {
        self.internal_claimed[idx]
    }

    /// Mark both records used and build the pair.
    pub fn claim(
        &mut self,
        bank_idx: usize,
        internal_idx: usize,
        days_difference: i64,
        match_type: MatchType,
        check_number: Option<String>,
    ) -> MatchedPair {
        debug_assert!(!self.bank_claimed[bank_idx] && !self.internal_claimed[internal_idx]);
        self.bank_claimed[bank_idx] = true;
        self.internal_claimed[internal_idx] = true;

        let bank = &self.bank[bank_idx];
        let internal = &self.internal[internal_idx];
        log::debug!(
            "account {}: bank row {} <-> internal row {} ({match_type}, {days_difference} day(s))",
            bank.account_key,
            bank.row,
            internal.row,
        );

        MatchedPair {
            bank: bank.clone(),
            internal: internal.clone(),
            days_difference,
            match_type,
            check_number,
        }
    }

    /// Unclaimed records of each side, in input order.
    pub fn into_leftovers(self) -> (Vec<NormalizedTransaction>, Vec<NormalizedTransaction>) {
        let unclaimed = |txns: &[NormalizedTransaction], claimed: &[bool]| {
            txns.iter()
                .zip(claimed)
                .filter(|(_, used)| !**used)
                .map(|(t, _)| t.clone())
                .collect::<Vec<_>>()
        };
        (
            unclaimed(self.bank, &self.bank_claimed),
            unclaimed(self.internal, &self.internal_claimed),
        )
    }
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Amount match plus dates no more than `window_days` apart (inclusive).
/// Records with an unknown date never match here.
#[derive(Debug, Clone)]
pub struct DateAmountTier {
    pub window_days: u32,
    pub tolerance: Amount,
}

impl MatchTier for DateAmountTier {
    fn kind(&self) -> TierKind {
        TierKind::DateAmount
    }

    fn partition(&self) -> Partition {
        Partition::Matched
    }

    fn run(&self, state: &mut MatchState<'_>) -> Vec<MatchedPair> {
        let mut pairs = Vec::new();
        let (bank, internal) = (state.bank(), state.internal());

        for (bi, b) in bank.iter().enumerate() {
            if state.is_bank_claimed(bi) || b.date.is_none() {
                continue;
            }
            for (mi, m) in internal.iter().enumerate() {
                if state.is_internal_claimed(mi) || m.date.is_none() {
                    continue;
                }
                if !amounts_match(b.amount, m.amount, self.tolerance) {
                    continue;
                }
                let days = days_difference(b.date, m.date);
                if days.unsigned_abs() <= u64::from(self.window_days) {
                    let match_type = if days == 0 { MatchType::Exact } else { MatchType::DateMatch };
                    pairs.push(state.claim(bi, mi, days, match_type, None));
                    break;
                }
            }
        }

        pairs
    }
}

/// Same check number and amount match, regardless of date.
/// Only bank records flagged as checks take part.
#[derive(Debug, Clone)]
pub struct CheckNumberTier {
    pub tolerance: Amount,
}

impl MatchTier for CheckNumberTier {
    fn kind(&self) -> TierKind {
        TierKind::CheckNumber
    }

    fn partition(&self) -> Partition {
        Partition::CheckMatches
    }

    fn run(&self, state: &mut MatchState<'_>) -> Vec<MatchedPair> {
        let mut pairs = Vec::new();
        let (bank, internal) = (state.bank(), state.internal());

        for (bi, b) in bank.iter().enumerate() {
            if state.is_bank_claimed(bi) || !b.is_check {
                continue;
            }
            let Some(check) = b.check_number.as_deref() else {
                continue;
            };
            for (mi, m) in internal.iter().enumerate() {
                if state.is_internal_claimed(mi) {
                    continue;
                }
                if m.check_number.as_deref() == Some(check)
                    && amounts_match(b.amount, m.amount, self.tolerance)
                {
                    let days = days_difference(b.date, m.date);
                    pairs.push(state.claim(bi, mi, days, MatchType::Check, Some(check.to_string())));
                    break;
                }
            }
        }

        pairs
    }
}

/// Tiers listed in the config, in order.
pub fn build_tiers(config: &MatchingConfig) -> Vec<Box<dyn MatchTier>> {
    let tolerance = config.tolerance();
    config
        .tiers
        .iter()
        .map(|kind| -> Box<dyn MatchTier> {
            match kind {
                TierKind::DateAmount => Box::new(DateAmountTier {
                    window_days: config.close_match_days,
                    tolerance,
                }),
                TierKind::CheckNumber => Box::new(CheckNumberTier { tolerance }),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Match one account's records with the configured tiers.
pub fn match_account(
    bank: &[NormalizedTransaction],
    internal: &[NormalizedTransaction],
    config: &MatchingConfig,
) -> MatchResult {
    match_with_tiers(bank, internal, &build_tiers(config))
}

/// Run `tiers` in order over one account's records.
pub fn match_with_tiers(
    bank: &[NormalizedTransaction],
    internal: &[NormalizedTransaction],
    tiers: &[Box<dyn MatchTier>],
) -> MatchResult {
    let mut state = MatchState::new(bank, internal);
    let mut result = MatchResult::default();

    for tier in tiers {
        let pairs = tier.run(&mut state);
        log::trace!("tier {}: {} pair(s)", tier.kind(), pairs.len());
        match tier.partition() {
            Partition::Matched => result.matched.extend(pairs),
            Partition::CloseMatches => result.close_matches.extend(pairs),
            Partition::CheckMatches => result.check_matches.extend(pairs),
        }
    }

    let (bank_only, internal_only) = state.into_leftovers();
    result.bank_only = bank_only;
    result.internal_only = internal_only;
    result
}
