use std::collections::BTreeSet;

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::group::{account_name_map, group_by_account};
use crate::matcher::build_tiers;
use crate::matcher::match_with_tiers;
use crate::model::{
    AccountReport, AccountSummary, Ledger, LedgerSource, ReconMeta, ReconReport,
};
use crate::normalize::normalize_ledger;
use crate::summary::aggregate;

/// Display name for accounts that never appear on the internal side.
pub const UNKNOWN_ACCOUNT_NAME: &str = "Unknown";

/// Reconcile a bank ledger against an internal ledger for one period.
///
/// Accounts are processed independently in key order; the report lists
/// them in that order while the summary sorts by display name.
pub fn run(
    config: &ReconConfig,
    bank: &Ledger,
    internal: &Ledger,
    period: &str,
) -> Result<ReconReport, ReconError> {
    config.validate()?;
    expect_source(bank, LedgerSource::Bank)?;
    expect_source(internal, LedgerSource::Internal)?;

    let bank_txns = normalize_ledger(bank, &config.sources.bank);
    let internal_txns = normalize_ledger(internal, &config.sources.internal);

    let names = account_name_map(&internal_txns);
    let mut bank_groups = group_by_account(bank_txns);
    let mut internal_groups = group_by_account(internal_txns);

    let keys: BTreeSet<String> = bank_groups
        .keys()
        .chain(internal_groups.keys())
        .cloned()
        .collect();

    let tiers = build_tiers(&config.matching);
    let mut accounts = Vec::with_capacity(keys.len());
    let mut summaries = Vec::with_capacity(keys.len());

    for key in keys {
        let name = names
            .get(&key)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ACCOUNT_NAME.to_string());
        log::info!("processing account {key} - {name}");

        let bank_side = bank_groups.remove(&key).unwrap_or_default();
        let internal_side = internal_groups.remove(&key).unwrap_or_default();
        let result = match_with_tiers(&bank_side, &internal_side, &tiers);

        summaries.push(AccountSummary::from_result(
            key.clone(),
            name.clone(),
            bank_side.len(),
            internal_side.len(),
            &result,
        ));
        accounts.push(AccountReport {
            account_key: key,
            account_name: name,
            bank: bank_side,
            internal: internal_side,
            result,
        });
    }

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            period: period.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            tiers: config.matching.tiers.clone(),
        },
        bank_headers: bank.headers.clone(),
        internal_headers: internal.headers.clone(),
        accounts,
        summary: aggregate(summaries),
    })
}

fn expect_source(ledger: &Ledger, expected: LedgerSource) -> Result<(), ReconError> {
    if ledger.source != expected {
        return Err(ReconError::SourceMismatch {
            expected,
            found: ledger.source,
        });
    }
    Ok(())
}

impl ReconReport {
    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Serialize(e.to_string()))
    }

    /// Write the JSON report to `path`, replacing any existing file.
    pub fn write_json(&self, path: &std::path::Path) -> Result<(), ReconError> {
        let json = self.to_json()?;
        std::fs::write(path, json + "\n")
            .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))
    }
}
