// ledgermatch CLI - bank feed vs. internal ledger reconciliation

mod exit_codes;
mod recon;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "lmatch")]
#[command(about = "Reconcile a bank feed against an internal ledger, account by account")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a bank ledger against an internal ledger and report per account
    #[command(after_help = "\
Examples:
  lmatch run --bank bank.csv --internal internal.csv
  lmatch run --bank bank.xlsx --internal internal.csv --config recon.toml
  lmatch run --bank bank.csv --internal internal.csv --json --period 2024_03
  lmatch run --bank bank.csv --internal internal.csv --output report.json --strict")]
    Run {
        /// Bank feed export (.csv or workbook)
        #[arg(long)]
        bank: PathBuf,

        /// Internal accounting export (.csv or workbook)
        #[arg(long)]
        internal: PathBuf,

        /// Matching config (.toml). Defaults apply when omitted.
        #[arg(long, short = 'c', env = "LMATCH_CONFIG")]
        config: Option<PathBuf>,

        /// Reporting period label (default: current YYYY_MM)
        #[arg(long)]
        period: Option<String>,

        /// Print the JSON report to stdout instead of the summary table
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit 1 when any bank-only or internal-only item remains
        #[arg(long)]
        strict: bool,
    },

    /// Check a config file without running
    #[command(after_help = "\
Examples:
  lmatch validate recon.toml")]
    Validate {
        /// Path to the .toml config file
        config: PathBuf,
    },
}

/// Error surfaced to the shell: message on stderr plus an exit code.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ledgermatch_recon::ReconError> for CliError {
    fn from(err: ledgermatch_recon::ReconError) -> Self {
        Self::new(exit_codes::recon_exit_code(&err), err.to_string())
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { bank, internal, config, period, json, output, strict } => {
            recon::cmd_run(recon::RunArgs { bank, internal, config, period, json, output, strict })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
