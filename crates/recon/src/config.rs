use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Amount, LedgerSource};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One reconciliation run. Every field has a default, so `ReconConfig::default()`
/// (or an empty TOML document) gives the standard bank-vs-internal setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

fn default_name() -> String {
    "Bank reconciliation".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            matching: MatchingConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Reserved for a stricter date tier; the date/amount tier ignores it.
    #[serde(default = "default_exact_match_days")]
    pub exact_match_days: u32,
    /// Inclusive date window for the date/amount tier.
    #[serde(default = "default_close_match_days")]
    pub close_match_days: u32,
    /// Amounts match when their absolute values differ by strictly less than this.
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: f64,
    /// Tiers in the order they run. Each sees only what earlier tiers left.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierKind>,
}

fn default_exact_match_days() -> u32 {
    10
}

fn default_close_match_days() -> u32 {
    30
}

fn default_amount_tolerance() -> f64 {
    0.01
}

fn default_tiers() -> Vec<TierKind> {
    vec![TierKind::DateAmount]
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            exact_match_days: default_exact_match_days(),
            close_match_days: default_close_match_days(),
            amount_tolerance: default_amount_tolerance(),
            tiers: default_tiers(),
        }
    }
}

impl MatchingConfig {
    /// `amount_tolerance` in the engine's fixed-point scale.
    pub fn tolerance(&self) -> Amount {
        Amount::from_f64(self.amount_tolerance).unwrap_or(Amount::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Amount match + date within `close_match_days`.
    DateAmount,
    /// Check number + amount match, any date.
    CheckNumber,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateAmount => write!(f, "date_amount"),
            Self::CheckNumber => write!(f, "check_number"),
        }
    }
}

// ---------------------------------------------------------------------------
// Source field mappings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    #[serde(default = "SourceMapping::bank")]
    pub bank: SourceMapping,
    #[serde(default = "SourceMapping::internal")]
    pub internal: SourceMapping,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            bank: SourceMapping::bank(),
            internal: SourceMapping::internal(),
        }
    }
}

impl SourcesConfig {
    pub fn for_source(&self, source: LedgerSource) -> &SourceMapping {
        match source {
            LedgerSource::Bank => &self.bank,
            LedgerSource::Internal => &self.internal,
        }
    }
}

/// Which header holds which field, per source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceMapping {
    pub account: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default = "default_date_field")]
    pub date: String,
    #[serde(default = "default_amount_field")]
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub check_number: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

fn default_date_field() -> String {
    "Date".into()
}

fn default_amount_field() -> String {
    "Amount".into()
}

impl SourceMapping {
    /// Column layout of the bank feed export.
    pub fn bank() -> Self {
        Self {
            account: "Account Number".into(),
            account_name: None,
            date: default_date_field(),
            amount: default_amount_field(),
            description: Some("Description".into()),
            check_number: Some("Additional Reference".into()),
            kind: Some("Type".into()),
        }
    }

    /// Column layout of the internal accounting export.
    pub fn internal() -> Self {
        Self {
            account: "transactiontable_accountings_ProbateMain::ACBT_AccountNumber".into(),
            account_name: Some("transactiontable_accountings_ProbateMain::DI FullName".into()),
            date: default_date_field(),
            amount: default_amount_field(),
            description: Some("Description1".into()),
            check_number: Some("Check Number".into()),
            kind: Some("Transaction Type".into()),
        }
    }

    /// All mapped header names, required ones first.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols = vec![self.account.as_str(), self.date.as_str(), self.amount.as_str()];
        for opt in [&self.account_name, &self.description, &self.check_number, &self.kind] {
            if let Some(c) = opt {
                cols.push(c.as_str());
            }
        }
        cols
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let m = &self.matching;

        if !m.amount_tolerance.is_finite() || m.amount_tolerance < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance must be a non-negative number, got {}",
                m.amount_tolerance
            )));
        }

        if m.exact_match_days > m.close_match_days {
            return Err(ReconError::ConfigValidation(format!(
                "exact_match_days ({}) cannot exceed close_match_days ({})",
                m.exact_match_days, m.close_match_days
            )));
        }

        if m.tiers.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one matching tier is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for tier in &m.tiers {
            if !seen.insert(tier) {
                return Err(ReconError::ConfigValidation(format!(
                    "tier '{tier}' listed more than once"
                )));
            }
        }

        for source in [LedgerSource::Bank, LedgerSource::Internal] {
            let mapping = self.sources.for_source(source);
            if mapping.columns().iter().any(|c| c.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "sources.{source}: field names cannot be empty"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
