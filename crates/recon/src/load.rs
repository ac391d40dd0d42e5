//! Ledger loading: CSV text and spreadsheet workbooks into `Ledger`s.
//!
//! Loading is the only place a run can fail on data. A file that cannot be
//! turned into a header row plus records is a `LoadFailure`; anything
//! inside the records (bad dates, junk amounts, missing columns) is left for
//! normalization to degrade.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::config::SourceMapping;
use crate::error::ReconError;
use crate::model::{FieldValue, Ledger, LedgerSource, RawTransaction};
use crate::normalize::{parse_date_str, serial_to_date, standardize_date};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a ledger file, picking the reader from the extension.
/// Workbook extensions go through calamine; everything else is read as CSV.
pub fn load_ledger(
    source: LedgerSource,
    path: &Path,
    mapping: &SourceMapping,
) -> Result<Ledger, ReconError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        return load_workbook_ledger(source, path, mapping);
    }

    let data = read_text(path)
        .map_err(|e| ReconError::load(source, format!("{}: {e}", path.display())))?;
    load_csv_ledger(source, &data, mapping)
}

/// Read a file as UTF-8, falling back to Windows-1252 (common for spreadsheet exports).
fn read_text(path: &Path) -> Result<String, std::io::Error> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Parse CSV text with a header row.
pub fn load_csv_ledger(
    source: LedgerSource,
    data: &str,
    mapping: &SourceMapping,
) -> Result<Ledger, ReconError> {
    let data = data.trim_start_matches('\u{feff}');
    if data.trim().is_empty() {
        return Err(ReconError::load(source, "file is empty"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::load(source, e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReconError::load(source, "no header row"));
    }

    let mut transactions = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::load(source, e.to_string()))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let mut raw = RawTransaction::new(transactions.len() + 1);
        for (i, header) in headers.iter().enumerate() {
            raw.set(header.clone(), FieldValue::text(record.get(i).unwrap_or("")));
        }
        transactions.push(raw);
    }

    Ok(finish(source, headers, transactions, mapping))
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

/// Read the first worksheet of a workbook. Row 1 is the header row.
pub fn load_workbook_ledger(
    source: LedgerSource,
    path: &Path,
    mapping: &SourceMapping,
) -> Result<Ledger, ReconError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ReconError::load(source, format!("{}: {e}", path.display())))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReconError::load(source, "workbook contains no sheets"))?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ReconError::load(source, format!("sheet '{first}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|c| cell_to_field(c).to_string().trim().to_string())
            .collect(),
        None => return Err(ReconError::load(source, format!("sheet '{first}' is empty"))),
    };

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReconError::load(source, "no header row"));
    }

    let mut transactions = Vec::new();
    for cells in rows {
        let fields: Vec<FieldValue> = cells.iter().map(cell_to_field).collect();
        if fields.iter().all(FieldValue::is_blank) {
            continue;
        }

        let mut raw = RawTransaction::new(transactions.len() + 1);
        let mut fields = fields.into_iter();
        for header in &headers {
            raw.set(header.clone(), fields.next().unwrap_or(FieldValue::Empty));
        }
        transactions.push(raw);
    }

    Ok(finish(source, headers, transactions, mapping))
}

/// Map a calamine cell to a field. Numbers stay numeric and date cells become dates.
fn cell_to_field(cell: &Data) -> FieldValue {
    match cell {
        Data::Empty => FieldValue::Empty,
        Data::String(s) => FieldValue::text(s.trim()),
        Data::Float(n) => FieldValue::Number(*n),
        Data::Int(n) => FieldValue::Number(*n as f64),
        Data::Bool(b) => FieldValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => FieldValue::text(format!("#{e:?}")),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            serial_to_date(serial)
                .map(FieldValue::Date)
                .unwrap_or(FieldValue::Number(serial))
        }
        Data::DateTimeIso(s) => parse_date_str(s)
            .map(FieldValue::Date)
            .unwrap_or_else(|| FieldValue::text(s.as_str())),
        Data::DurationIso(s) => FieldValue::text(s.as_str()),
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Warn about unmapped columns and rewrite the date field in canonical form.
fn finish(
    source: LedgerSource,
    headers: Vec<String>,
    mut transactions: Vec<RawTransaction>,
    mapping: &SourceMapping,
) -> Ledger {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    for column in mapping.columns() {
        if !present.contains(column) {
            log::warn!("{source} ledger has no '{column}' column");
        }
    }

    for raw in &mut transactions {
        let date = standardize_date(raw.get(&mapping.date));
        raw.set(mapping.date.clone(), date);
    }

    log::info!("loaded {} {source} record(s)", transactions.len());

    Ledger {
        source,
        headers,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BANK_CSV: &str = "\
Account Number,Date,Amount,Description,Additional Reference,Type
1001,03/01/2024,-100.00,\"Transfer, outgoing\",,ACH
1001,2024-03-05,\"$1,200.00\",Deposit,,Credit

1002,not a date,(5.00),\"He said \"\"hi\"\"\",1004,Check Paid
";

    #[test]
    fn csv_basic() {
        let ledger = load_csv_ledger(LedgerSource::Bank, BANK_CSV, &SourceMapping::bank()).unwrap();
        assert_eq!(ledger.source, LedgerSource::Bank);
        assert_eq!(ledger.headers.len(), 6);
        assert_eq!(ledger.headers[0], "Account Number");
        // blank line skipped
        assert_eq!(ledger.len(), 3);

        let first = &ledger.transactions[0];
        assert_eq!(first.row, 1);
        assert_eq!(first.get("Description"), &FieldValue::text("Transfer, outgoing"));
        assert_eq!(first.get("Additional Reference"), &FieldValue::Empty);

        let third = &ledger.transactions[2];
        assert_eq!(third.row, 3);
        assert_eq!(third.get("Description"), &FieldValue::text("He said \"hi\""));
    }

    #[test]
    fn csv_dates_are_standardized() {
        let ledger = load_csv_ledger(LedgerSource::Bank, BANK_CSV, &SourceMapping::bank()).unwrap();
        assert_eq!(ledger.transactions[0].get("Date"), &FieldValue::text("03/01/2024"));
        assert_eq!(ledger.transactions[1].get("Date"), &FieldValue::text("03/05/2024"));
        assert_eq!(ledger.transactions[2].get("Date"), &FieldValue::text("not a date"));
    }

    #[test]
    fn csv_short_rows_and_bom() {
        let data = "\u{feff}Account Number,Date,Amount\n 1001 , 1/2/24\n";
        let ledger = load_csv_ledger(LedgerSource::Bank, data, &SourceMapping::bank()).unwrap();
        assert_eq!(ledger.headers[0], "Account Number");
        let raw = &ledger.transactions[0];
        assert_eq!(raw.get("Account Number"), &FieldValue::text("1001"));
        assert_eq!(raw.get("Date"), &FieldValue::text("01/02/2024"));
        assert_eq!(raw.get("Amount"), &FieldValue::Empty);
    }

    #[test]
    fn csv_header_only_is_empty_ledger() {
        let ledger = load_csv_ledger(
            LedgerSource::Internal,
            "Date,Amount\n",
            &SourceMapping::internal(),
        )
        .unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.headers, vec!["Date", "Amount"]);
    }

    #[test]
    fn csv_empty_is_load_failure() {
        for data in ["", "  \n\n", "\u{feff}"] {
            let err = load_csv_ledger(LedgerSource::Bank, data, &SourceMapping::bank()).unwrap_err();
            assert!(
                matches!(err, ReconError::LoadFailure { source: LedgerSource::Bank, .. }),
                "{data:?}: {err}"
            );
        }

        let err = load_csv_ledger(LedgerSource::Bank, ",,\n1,2,3\n", &SourceMapping::bank())
            .unwrap_err();
        assert!(err.to_string().contains("no header row"));
    }

    #[test]
    fn missing_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        let err = load_ledger(LedgerSource::Internal, &path, &SourceMapping::internal()).unwrap_err();
        assert!(matches!(err, ReconError::LoadFailure { source: LedgerSource::Internal, .. }));
        assert!(err.to_string().starts_with("cannot load internal ledger"));
    }

    #[test]
    fn load_csv_file_with_latin1_bytes() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"Account Number,Date,Amount,Description\n1001,03/01/2024,10.00,Caf\xe9\n")
            .unwrap();
        file.flush().unwrap();

        let ledger = load_ledger(LedgerSource::Bank, file.path(), &SourceMapping::bank()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.transactions[0].get("Description"), &FieldValue::text("Café"));
    }

    #[test]
    fn load_workbook_keeps_cell_types() {
        use rust_xlsxwriter::{Format, Workbook};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_fmt = Format::new().set_num_format("mm/dd/yyyy");
        for (col, header) in ["Account Number", "Date", "Amount", "Description"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_number(1, 0, 1001.0).unwrap();
        sheet.write_number_with_format(1, 1, 45352.0, &date_fmt).unwrap();
        sheet.write_number(1, 2, -100.0).unwrap();
        sheet.write_string(1, 3, "Wire").unwrap();
        // row 3 left blank
        sheet.write_string(3, 0, "1002").unwrap();
        sheet.write_string(3, 1, "2024-03-09").unwrap();
        sheet.write_number(3, 2, 25.5).unwrap();
        workbook.save(&path).unwrap();

        let ledger = load_ledger(LedgerSource::Bank, &path, &SourceMapping::bank()).unwrap();
        assert_eq!(ledger.headers, vec!["Account Number", "Date", "Amount", "Description"]);
        assert_eq!(ledger.len(), 2);

        let first = &ledger.transactions[0];
        assert_eq!(first.get("Account Number"), &FieldValue::Number(1001.0));
        assert_eq!(first.get("Date"), &FieldValue::text("03/01/2024"));
        assert_eq!(first.get("Amount"), &FieldValue::Number(-100.0));

        let second = &ledger.transactions[1];
        assert_eq!(second.row, 2);
        assert_eq!(second.get("Date"), &FieldValue::text("03/09/2024"));
        assert_eq!(second.get("Description"), &FieldValue::Empty);
    }

    #[test]
    fn cell_mapping() {
        assert_eq!(cell_to_field(&Data::Empty), FieldValue::Empty);
        assert_eq!(cell_to_field(&Data::String("  ".into())), FieldValue::Empty);
        assert_eq!(cell_to_field(&Data::Int(7)), FieldValue::Number(7.0));
        assert_eq!(cell_to_field(&Data::Bool(true)), FieldValue::text("TRUE"));
        assert_eq!(
            cell_to_field(&Data::DateTimeIso("2024-03-01T00:00:00".into())),
            FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }
}
