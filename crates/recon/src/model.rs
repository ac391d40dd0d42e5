use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::TierKind;

// ---------------------------------------------------------------------------
// Sources + raw records
// ---------------------------------------------------------------------------

/// Which side of the reconciliation a ledger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSource {
    /// External bank feed.
    Bank,
    /// Internal accounting export.
    Internal,
}

impl fmt::Display for LedgerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank => write!(f, "bank"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A single cell as it arrived from the source file.
///
/// CSV input only ever yields `Text` and `Empty`; workbooks keep their
/// native numeric and date cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY_FIELD: FieldValue = FieldValue::Empty;

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    /// True for `Empty` and for whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Date(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            // Integers without decimals (account numbers often arrive as floats)
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", crate::normalize::format_date(*d)),
        }
    }
}

/// One record of a ledger: header name -> cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTransaction {
    /// 1-based data row within the ledger (header row excluded).
    pub row: usize,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawTransaction {
    pub fn new(row: usize) -> Self {
        Self { row, fields: BTreeMap::new() }
    }

    /// Field by header name; `Empty` when the column is absent.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&EMPTY_FIELD)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }
}

/// A fully loaded ledger, headers kept in source column order.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub source: LedgerSource,
    pub headers: Vec<String>,
    pub transactions: Vec<RawTransaction>,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Signed fixed-point amount in micro-units (1e-6 of the currency unit).
///
/// Example: `Amount::from_micros(-1_200_000_000)` is -1200.00.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Convert a float, rounding to the nearest micro-unit.
    /// `None` for NaN, infinities, and values outside the i64 range.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * MICROS_PER_UNIT as f64).round();
        if scaled.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Amount {
    /// At least two decimals, trailing zeros beyond that trimmed: `-1200.00`, `0.125`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let whole = abs / MICROS_PER_UNIT as u64;
        let frac = format!("{:06}", abs % MICROS_PER_UNIT as u64);
        let frac = frac.trim_end_matches('0');
        let sign = if self.0 < 0 { "-" } else { "" };
        if frac.len() <= 2 {
            write!(f, "{sign}{whole}.{frac:0<2}")
        } else {
            write!(f, "{sign}{whole}.{frac}")
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// Comparable view of a raw record. Built by `normalize::normalize`, never fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTransaction {
    pub source: LedgerSource,
    pub row: usize,
    /// `None` when the date field could not be parsed.
    pub date: Option<NaiveDate>,
    /// Zero when the amount field could not be parsed.
    pub amount: Amount,
    pub account_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_number: Option<String>,
    pub is_check: bool,
    pub raw: RawTransaction,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    /// Same amount, same day.
    Exact,
    /// Same amount, dates within the window but not equal.
    DateMatch,
    /// Same check number and amount, any date.
    Check,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::DateMatch => write!(f, "date-match"),
            Self::Check => write!(f, "check"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub bank: NormalizedTransaction,
    pub internal: NormalizedTransaction,
    /// Bank date minus internal date, in whole days (999 when either is unknown).
    pub days_difference: i64,
    pub match_type: MatchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_number: Option<String>,
}

/// Per-account outcome. Every input record lands in exactly one partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: Vec<MatchedPair>,
    /// Reserved secondary tier; nothing populates it.
    pub close_matches: Vec<MatchedPair>,
    pub check_matches: Vec<MatchedPair>,
    pub bank_only: Vec<NormalizedTransaction>,
    pub internal_only: Vec<NormalizedTransaction>,
}

impl MatchResult {
    /// Number of pairs across all pair partitions.
    pub fn paired_count(&self) -> usize {
        self.matched.len() + self.close_matches.len() + self.check_matches.len()
    }

    pub fn is_fully_reconciled(&self) -> bool {
        self.bank_only.is_empty() && self.internal_only.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub account_key: String,
    pub account_name: String,
    pub bank_count: usize,
    pub internal_count: usize,
    pub matched_count: usize,
    pub close_match_count: usize,
    pub check_match_count: usize,
    pub bank_only_count: usize,
    pub internal_only_count: usize,
    /// matched / internal * 100, one decimal. 0 when there are no internal records.
    pub match_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub bank_count: usize,
    pub internal_count: usize,
    pub matched_count: usize,
    pub close_match_count: usize,
    pub check_match_count: usize,
    pub bank_only_count: usize,
    pub internal_only_count: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_accounts: usize,
    pub accounts: Vec<AccountSummary>,
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub account_key: String,
    pub account_name: String,
    pub bank: Vec<NormalizedTransaction>,
    pub internal: Vec<NormalizedTransaction>,
    pub result: MatchResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub bank_headers: Vec<String>,
    pub internal_headers: Vec<String>,
    pub accounts: Vec<AccountReport>,
    pub summary: SummaryReport,
}

impl ReconReport {
    /// True when no account has leftovers on either side.
    pub fn is_fully_reconciled(&self) -> bool {
        self.accounts.iter().all(|a| a.result.is_fully_reconciled())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub period: String,
    pub engine_version: String,
    pub run_at: String,
    pub tiers: Vec<TierKind>,
}
