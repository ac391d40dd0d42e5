//! `lmatch run` / `lmatch validate`.

use std::path::{Path, PathBuf};

use ledgermatch_recon::config::TierKind;
use ledgermatch_recon::summary::format_rate;
use ledgermatch_recon::{load_ledger, LedgerSource, ReconConfig, ReconReport};
use unicode_width::UnicodeWidthStr;

use crate::exit_codes::{EXIT_RUNTIME, EXIT_UNMATCHED};
use crate::CliError;

pub struct RunArgs {
    pub bank: PathBuf,
    pub internal: PathBuf,
    pub config: Option<PathBuf>,
    pub period: Option<String>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub strict: bool,
}

fn read_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_RUNTIME, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = ReconConfig::from_toml(&config_str)?;
    log::info!("config '{}' from {}", config.name, path.display());
    Ok(config)
}

fn current_period() -> String {
    chrono::Local::now().format("%Y_%m").to_string()
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => ReconConfig::default(),
    };
    let period = args.period.unwrap_or_else(current_period);
    log::debug!("period {period}, tiers {:?}", config.matching.tiers);

    let bank = load_ledger(LedgerSource::Bank, &args.bank, &config.sources.bank)?;
    let internal = load_ledger(LedgerSource::Internal, &args.internal, &config.sources.internal)?;

    let report = ledgermatch_recon::run(&config, &bank, &internal, &period)?;

    if let Some(ref path) = args.output {
        report.write_json(path)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render_summary(&report));
    }

    let t = &report.summary.totals;
    if args.json {
        eprintln!(
            "{} account(s): {} matched, {} bank-only, {} internal-only",
            report.summary.total_accounts, t.matched_count, t.bank_only_count, t.internal_only_count,
        );
    }

    if args.strict && !report.is_fully_reconciled() {
        return Err(CliError::new(
            EXIT_UNMATCHED,
            format!(
                "{} bank-only and {} internal-only item(s) remain",
                t.bank_only_count, t.internal_only_count
            ),
        )
        .with_hint("rerun without --strict, or with --json to inspect the leftovers"));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let m = &config.matching;
    let tiers: Vec<String> = m.tiers.iter().map(|t| t.to_string()).collect();
    eprintln!(
        "valid: '{}' tiers [{}], window {} day(s), tolerance {}",
        config.name,
        tiers.join(", "),
        m.close_match_days,
        m.tolerance(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary table
// ---------------------------------------------------------------------------

/// Master summary: one row per account in presentation order, then totals.
pub fn render_summary(report: &ReconReport) -> String {
    let show_checks = report.meta.tiers.contains(&TierKind::CheckNumber);

    let mut header = vec!["ACCOUNT", "NAME", "BANK", "INTERNAL", "MATCHED", "CLOSE"];
    if show_checks {
        header.push("CHECKS");
    }
    header.extend(["BANK ONLY", "INTERNAL ONLY", "RATE"]);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for a in &report.summary.accounts {
        let mut row = vec![
            a.account_key.clone(),
            a.account_name.clone(),
            a.bank_count.to_string(),
            a.internal_count.to_string(),
            a.matched_count.to_string(),
            a.close_match_count.to_string(),
        ];
        if show_checks {
            row.push(a.check_match_count.to_string());
        }
        row.extend([
            a.bank_only_count.to_string(),
            a.internal_only_count.to_string(),
            format!("{}%", format_rate(a.match_rate)),
        ]);
        rows.push(row);
    }

    let t = &report.summary.totals;
    let mut total = vec![
        "TOTAL".to_string(),
        format!("{} account(s)", report.summary.total_accounts),
        t.bank_count.to_string(),
        t.internal_count.to_string(),
        t.matched_count.to_string(),
        t.close_match_count.to_string(),
    ];
    if show_checks {
        total.push(t.check_match_count.to_string());
    }
    total.extend([
        t.bank_only_count.to_string(),
        t.internal_only_count.to_string(),
        format!("{}%", format_rate(t.match_rate)),
    ]);

    let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for row in rows.iter().chain(std::iter::once(&total)) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let mut out = String::new();
    out.push_str(&format_row(&header, &widths));
    for row in &rows {
        out.push_str(&format_row(row, &widths));
    }
    out.push_str(&format_row(&total, &widths));
    out
}

/// First two columns left-aligned, counts right-aligned.
fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let pad = " ".repeat(width.saturating_sub(cell.width()));
        if i < 2 {
            line.push_str(cell);
            line.push_str(&pad);
        } else {
            line.push_str(&pad);
            line.push_str(cell);
        }
    }
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermatch_recon::config::SourceMapping;
    use ledgermatch_recon::load_csv_ledger;

    fn report(config: &ReconConfig) -> ReconReport {
        let bank = load_csv_ledger(
            LedgerSource::Bank,
            "Account Number,Date,Amount\n1001,03/01/2024,-100.00\n2002,03/01/2024,5.00\n",
            &SourceMapping::bank(),
        )
        .unwrap();
        let internal = load_csv_ledger(
            LedgerSource::Internal,
            "transactiontable_accountings_ProbateMain::ACBT_AccountNumber,\
transactiontable_accountings_ProbateMain::DI FullName,Date,Amount\n\
1001,Zoë Estate,03/02/2024,100.00\n",
            &SourceMapping::internal(),
        )
        .unwrap();
        ledgermatch_recon::run(config, &bank, &internal, "2024_03").unwrap()
    }

    #[test]
    fn table_layout() {
        let text = render_summary(&report(&ReconConfig::default()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ACCOUNT  NAME"));
        assert!(lines[0].contains("MATCHED  CLOSE  BANK ONLY"));
        assert!(!lines[0].contains("CHECKS"));
        assert!(lines[1].starts_with("2002     Unknown"));
        assert!(lines[1].ends_with("0.0%"));
        assert!(lines[2].starts_with("1001     Zoë Estate"));
        assert!(lines[2].ends_with("100.0%"));
        assert!(lines[3].starts_with("TOTAL    2 account(s)"));
        assert!(lines[3].ends_with("100.0%"));
        let total: Vec<&str> = lines[3].split_whitespace().collect();
        // TOTAL 2 account(s) BANK INTERNAL MATCHED CLOSE BANK-ONLY INTERNAL-ONLY RATE
        assert_eq!(&total[3..], ["2", "1", "1", "0", "1", "0", "100.0%"]);

        // right edges line up
        let width = UnicodeWidthStr::width(lines[0]);
        for line in &lines {
            assert_eq!(UnicodeWidthStr::width(*line), width, "{line:?}");
        }
    }

    #[test]
    fn check_column_when_tier_enabled() {
        let mut config = ReconConfig::default();
        config.matching.tiers.push(TierKind::CheckNumber);
        let text = render_summary(&report(&config));
        assert!(text.lines().next().unwrap().contains("MATCHED  CLOSE  CHECKS  BANK ONLY"));
    }
}
