use std::collections::BTreeMap;

use crate::model::{FieldValue, NormalizedTransaction};

/// Account key for records whose account field is missing.
pub const UNASSIGNED: &str = "UNASSIGNED";

/// Display name always registered for `UNASSIGNED`.
pub const UNASSIGNED_NAME: &str = "Unassigned Transactions";

/// Trimmed account field, or `UNASSIGNED` for empty, absent and literal `"null"`.
pub fn account_key(value: &FieldValue) -> String {
    let text = value.to_string();
    let key = text.trim();
    if key.is_empty() || key == "null" {
        UNASSIGNED.to_string()
    } else {
        key.to_string()
    }
}

/// Bucket records by account key. Relative order inside a bucket is preserved.
pub fn group_by_account<I>(transactions: I) -> BTreeMap<String, Vec<NormalizedTransaction>>
where
    I: IntoIterator<Item = NormalizedTransaction>,
{
    let mut groups: BTreeMap<String, Vec<NormalizedTransaction>> = BTreeMap::new();
    for txn in transactions {
        groups.entry(txn.account_key.clone()).or_default().push(txn);
    }
    groups
}

/// Account key -> display name, from the internal ledger only.
/// Later records overwrite earlier ones.
pub fn account_name_map(internal: &[NormalizedTransaction]) -> BTreeMap<String, String> {
    let mut names = BTreeMap::new();
    for txn in internal {
        if txn.account_key == UNASSIGNED {
            continue;
        }
        if let Some(name) = &txn.account_name {
            names.insert(txn.account_key.clone(), name.clone());
        }
    }
    names.insert(UNASSIGNED.to_string(), UNASSIGNED_NAME.to_string());
    names
}
