//! Read-only loader for the accounts file. Account CRUD belongs to the
//! external shell; the engine only consumes the stored records.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use denywatch_domain::model::{Account, ApiCredential, ProfileId};

/// Stored account record, keyed by profile id in the accounts file.
#[derive(Debug, Deserialize)]
struct AccountRecord {
    name: String,
    #[serde(default)]
    profile_name: String,
    api_key: String,
    #[serde(default)]
    active: bool,
}

#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("failed to read accounts file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed accounts file `{path}`: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads every account from the JSON accounts file (a map of profile id to
/// record). Inactive accounts are returned too; the supervisor filters.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<Account>, AccountsError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let raw = fs::read_to_string(path).map_err(|source| AccountsError::Io {
        path: display.clone(),
        source,
    })?;
    let records: HashMap<String, AccountRecord> =
        serde_json::from_str(&raw).map_err(|source| AccountsError::Malformed {
            path: display,
            source,
        })?;

    let mut accounts: Vec<Account> = records
        .into_iter()
        .map(|(profile_id, record)| Account {
            profile_id: ProfileId::new(profile_id),
            name: record.name,
            profile_name: record.profile_name,
            api_key: ApiCredential::new(record.api_key),
            active: record.active,
        })
        .collect();
    accounts.sort_by(|a, b| a.profile_id.as_str().cmp(b.profile_id.as_str()));
    Ok(accounts)
}
