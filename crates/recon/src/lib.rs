//! `ledgermatch-recon`: bank-feed vs. internal-ledger reconciliation engine.
//!
//! Loads two ledgers, normalizes their records, groups them by account and
//! pairs them through an ordered list of matching tiers. No CLI dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod load;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod summary;

pub use config::{MatchingConfig, ReconConfig, SourceMapping, TierKind};
pub use engine::run;
pub use error::ReconError;
pub use load::{load_csv_ledger, load_ledger, load_workbook_ledger};
pub use matcher::{match_account, MatchTier};
pub use model::{
    Amount, FieldValue, Ledger, LedgerSource, MatchResult, MatchType, MatchedPair,
    NormalizedTransaction, RawTransaction, ReconReport, SummaryReport,
};
pub use summary::aggregate;
