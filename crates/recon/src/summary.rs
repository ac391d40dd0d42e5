use crate::model::{AccountSummary, MatchResult, SummaryReport, SummaryTotals};

/// `matched / internal * 100`, rounded to one decimal. 0 when `internal` is 0.
pub fn match_rate(matched: usize, internal: usize) -> f64 {
    if internal == 0 {
        return 0.0;
    }
    let pct = matched as f64 / internal as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Rate with exactly one decimal: `66.7`, `100.0`.
pub fn format_rate(rate: f64) -> String {
    format!("{rate:.1}")
}

impl AccountSummary {
    pub fn from_result(
        account_key: impl Into<String>,
        account_name: impl Into<String>,
        bank_count: usize,
        internal_count: usize,
        result: &MatchResult,
    ) -> Self {
        let matched_count = result.matched.len();
        Self {
            account_key: account_key.into(),
            account_name: account_name.into(),
            bank_count,
            internal_count,
            matched_count,
            close_match_count: result.close_matches.len(),
            check_match_count: result.check_matches.len(),
            bank_only_count: result.bank_only.len(),
            internal_only_count: result.internal_only.len(),
            match_rate: match_rate(matched_count, internal_count),
        }
    }
}

/// Sort accounts for presentation and compute global totals.
///
/// Accounts sort by display name, then account key. Global leftovers are
/// derived from the summed counts rather than re-summed, so they always
/// agree with the per-account arithmetic.
pub fn aggregate(mut accounts: Vec<AccountSummary>) -> SummaryReport {
    accounts.sort_by(|a, b| {
        a.account_name
            .cmp(&b.account_name)
            .then_with(|| a.account_key.cmp(&b.account_key))
    });

    let mut totals = SummaryTotals::default();
    for acct in &accounts {
        totals.bank_count += acct.bank_count;
        totals.internal_count += acct.internal_count;
        totals.matched_count += acct.matched_count;
        totals.close_match_count += acct.close_match_count;
        totals.check_match_count += acct.check_match_count;
    }
    let paired = totals.matched_count + totals.close_match_count + totals.check_match_count;
    totals.bank_only_count = totals.bank_count.saturating_sub(paired);
    totals.internal_only_count = totals.internal_count.saturating_sub(paired);
    totals.match_rate = match_rate(totals.matched_count, totals.internal_count);

    log::info!(
        "{} account(s): {} matched, {} bank-only, {} internal-only ({}%)",
        accounts.len(),
        totals.matched_count,
        totals.bank_only_count,
        totals.internal_only_count,
        format_rate(totals.match_rate),
    );

    SummaryReport {
        total_accounts: accounts.len(),
        accounts,
        totals,
    }
}
