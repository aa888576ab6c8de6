//! Read-once secret lookup.
//!
//! API keys come from two places, read exactly once at start-up:
//!
//! 1. a dotenv-format secrets file (`--secrets-file`, else `./.env` when it
//!    exists), parsed with `dotenvy` *without* touching the process
//!    environment;
//! 2. the process environment, which overrides the file.
//!
//! The resulting [`SecretStore`] is an immutable snapshot handed to
//! [`crate::config::AnalysisConfig`]; nothing reads the environment later.

use crate::error::RfpError;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Secret names the store picks up from the process environment.
pub const KNOWN_SECRETS: &[&str] = &["OPENAI_API_KEY", "GEMINI_API_KEY"];

/// Immutable name → value snapshot of the configured secrets.
#[derive(Clone, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

impl SecretStore {
    /// Load the store from an optional secrets file plus the environment.
    ///
    /// An explicit `path` must exist. Without one, `./.env` is used when
    /// present and silently skipped otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, RfpError> {
        let mut values = HashMap::new();

        let iter = match path {
            Some(p) => Some(dotenvy::from_path_iter(p).map_err(|e| {
                RfpError::InvalidConfig(format!("cannot read secrets file {}: {e}", p.display()))
            })?),
            None => match dotenvy::from_path_iter(".env") {
                Ok(iter) => Some(iter),
                Err(e) if e.not_found() => None,
                Err(e) => {
                    return Err(RfpError::InvalidConfig(format!(
                        "cannot read secrets file .env: {e}"
                    )))
                }
            },
        };

        if let Some(iter) = iter {
            for item in iter {
                let (key, value) = item
                    .map_err(|e| RfpError::InvalidConfig(format!("bad secrets file entry: {e}")))?;
                values.insert(key, value);
            }
        }

        for &name in KNOWN_SECRETS {
            if let Ok(value) = std::env::var(name) {
                values.insert(name.to_string(), value);
            }
        }

        debug!("Secret store loaded with {} entries", values.len());
        Ok(Self { values })
    }

    /// Build a store from explicit pairs, bypassing file and environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a secret. Blank values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("SecretStore").field("keys", &keys).finish()
    }
}
