//! Field normalization: turns heterogeneous cell values into comparable
//! dates, amounts, and account keys.
//!
//! Everything here is total. Bad input degrades to a default (`None` date,
//! zero amount, `UNASSIGNED` account) instead of failing, so that odd rows
//! surface as unmatched items in the report rather than aborting a run.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::config::SourceMapping;
use crate::group::account_key;
use crate::model::{
    Amount, FieldValue, Ledger, LedgerSource, NormalizedTransaction, RawTransaction,
    MICROS_PER_UNIT,
};

/// Day difference reported when either date is unknown. Larger than any sane window.
pub const UNKNOWN_DATE_DIFFERENCE: i64 = 999;

/// Spreadsheet serial day 0 (the 1900 date system, including its leap-year offset).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serials beyond this are not plausible calendar dates.
const MAX_SERIAL: f64 = 2_958_465.0; // 9999-12-31

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const CHECK_INDICATORS: &[&str] = &["check", "chk", "check paid", "disbursement"];

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a date cell. Returns `None` (unknown date) when nothing fits.
pub fn parse_date(value: &FieldValue) -> Option<NaiveDate> {
    match value {
        FieldValue::Date(d) => Some(*d),
        FieldValue::Number(n) => serial_to_date(*n),
        FieldValue::Text(s) => parse_date_str(s),
        FieldValue::Empty => None,
    }
}

/// Parse a date string: common unambiguous layouts first, then a
/// `month/day/year` split on `/` or `-` with two-digit years read as 20xx.
pub fn parse_date_str(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    generic_date(s)
        .filter(|d| d.year() >= 100)
        .or_else(|| us_date_parts(s))
}

fn generic_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn us_date_parts(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['/', '-']).collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    let mut year: i32 = year.trim().parse().ok()?;
    if (0..100).contains(&year) {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Spreadsheet serial date (days since 1899-12-30) to a calendar date.
/// The time-of-day fraction is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial.abs() > MAX_SERIAL {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    let days = serial.floor() as i64;
    if days >= 0 {
        epoch.checked_add_days(Days::new(days as u64))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Canonical display form: `MM/DD/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Rewrite a date cell in canonical form. Unparseable values are kept verbatim as text.
pub fn standardize_date(value: &FieldValue) -> FieldValue {
    if value.is_blank() {
        return FieldValue::Empty;
    }
    match parse_date(value) {
        Some(d) => FieldValue::Text(format_date(d)),
        None => FieldValue::text(value.to_string()),
    }
}

/// Signed whole-day difference `d1 - d2`; `UNKNOWN_DATE_DIFFERENCE` if either is unknown.
pub fn days_difference(d1: Option<NaiveDate>, d2: Option<NaiveDate>) -> i64 {
    match (d1, d2) {
        (Some(a), Some(b)) => (a - b).num_days(),
        _ => UNKNOWN_DATE_DIFFERENCE,
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse an amount cell. Unparseable input is zero.
pub fn parse_amount(value: &FieldValue) -> Amount {
    match value {
        FieldValue::Number(n) => Amount::from_f64(*n).unwrap_or(Amount::ZERO),
        FieldValue::Text(s) => parse_amount_str(s),
        FieldValue::Empty | FieldValue::Date(_) => Amount::ZERO,
    }
}

/// Parse an amount string such as `(123.45)`, `-$1,200.00` or ` 42 `.
///
/// Parentheses and a leading minus both mark a negative; having both does
/// not flip the sign back. Currency symbols, thousands separators and
/// whitespace are ignored. Like a lenient float parse, trailing junk after
/// the number is dropped.
pub fn parse_amount_str(input: &str) -> Amount {
    let mut s = input.trim();
    if s.is_empty() {
        return Amount::ZERO;
    }

    let mut negative = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = &s[1..s.len() - 1];
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    match parse_decimal_micros(&cleaned) {
        Some(micros) => {
            let magnitude = Amount::from_micros(micros).abs();
            if negative {
                Amount::from_micros(-magnitude.micros())
            } else {
                magnitude
            }
        }
        None => Amount::ZERO,
    }
}

/// Leading decimal number of `s` in micro-units. Rounds half-up past six decimals.
fn parse_decimal_micros(s: &str) -> Option<i64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i = 1;
            true
        }
        Some(b'+') => {
            i = 1;
            false
        }
        _ => false,
    };

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &bytes[int_start..i];

    let mut frac_digits: &[u8] = &[];
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = &bytes[frac_start..j];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let mut whole: i64 = 0;
    for d in int_digits {
        whole = whole.checked_mul(10)?.checked_add(i64::from(d - b'0'))?;
    }
    let mut micros = whole.checked_mul(MICROS_PER_UNIT)?;

    let mut scale = MICROS_PER_UNIT / 10;
    for d in frac_digits.iter().take(6) {
        micros = micros.checked_add(i64::from(d - b'0') * scale)?;
        scale /= 10;
    }
    if frac_digits.get(6).is_some_and(|d| *d >= b'5') {
        micros = micros.checked_add(1)?;
    }

    Some(if negative { -micros } else { micros })
}

/// Absolute values within `tolerance` (strictly less than).
///
/// Sign-insensitive on purpose: the bank feed and the internal ledger book
/// the same event with opposite signs.
pub fn amounts_match(a: Amount, b: Amount, tolerance: Amount) -> bool {
    (a.abs().micros() - b.abs().micros()).abs() < tolerance.micros()
}

// ---------------------------------------------------------------------------
// Check numbers
// ---------------------------------------------------------------------------

fn check_in_description() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:CHECK|CHK|#)\s*#?\s*(\d+)").unwrap())
}

/// Check number from the mapped check-number column, else from the description
/// (`CHECK #1004`, `chk 77`, `#12`).
pub fn extract_check_number(raw: &RawTransaction, mapping: &SourceMapping) -> Option<String> {
    if let Some(field) = &mapping.check_number {
        let value = raw.get(field).to_string();
        let value = value.trim();
        if !value.is_empty() && value != "null" && value != "0" {
            return Some(first_digit_run(value).unwrap_or(value).to_string());
        }
    }

    let description = mapped_text(raw, mapping.description.as_deref());
    check_in_description()
        .captures(&description)
        .map(|caps| caps[1].to_string())
}

fn first_digit_run(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    Some(&rest[..len])
}

/// Whether the type or description marks this as a check payment.
pub fn is_check_transaction(raw: &RawTransaction, mapping: &SourceMapping) -> bool {
    let kind = mapped_text(raw, mapping.kind.as_deref()).to_lowercase();
    let description = mapped_text(raw, mapping.description.as_deref()).to_lowercase();
    CHECK_INDICATORS
        .iter()
        .any(|ind| kind.contains(ind) || description.contains(ind))
}

fn mapped_text(raw: &RawTransaction, field: Option<&str>) -> String {
    field.map(|f| raw.get(f).to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub fn normalize(
    raw: RawTransaction,
    source: LedgerSource,
    mapping: &SourceMapping,
) -> NormalizedTransaction {
    let account_name = mapping
        .account_name
        .as_deref()
        .map(|f| raw.get(f).to_string().trim().to_string())
        .filter(|name| !name.is_empty());

    NormalizedTransaction {
        source,
        row: raw.row,
        date: parse_date(raw.get(&mapping.date)),
        amount: parse_amount(raw.get(&mapping.amount)),
        account_key: account_key(raw.get(&mapping.account)),
        account_name,
        check_number: extract_check_number(&raw, mapping),
        is_check: is_check_transaction(&raw, mapping),
        raw,
    }
}

/// Normalize every record of a ledger, preserving order.
pub fn normalize_ledger(ledger: &Ledger, mapping: &SourceMapping) -> Vec<NormalizedTransaction> {
    ledger
        .transactions
        .iter()
        .map(|raw| normalize(raw.clone(), ledger.source, mapping))
        .collect()
}
