//! API-token resolution.
//!
//! A token is taken from, in order:
//!
//! 1. an explicit value (`--qa-api-key`, `STACKOVERFLOW_API_KEY`, …)
//! 2. a named parameter looked up in a [`SecretStore`]
//!
//! Deployments that mount secrets as files use [`DirSecretStore`]; local runs
//! can export the parameter as an environment variable and use
//! [`EnvSecretStore`].

use crate::error::IngestError;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Named-secret lookup.
pub trait SecretStore: Send + Sync {
    /// Human-readable store name for error messages.
    fn describe(&self) -> String;

    /// Fetch the secret stored under `name`.
    fn get_secret(&self, name: &str) -> Result<String, IngestError>;
}

/// Reads `name` from an environment variable.
///
/// Parameter paths are mapped to upper snake case, so
/// `/kb/qa-api-key` is read from `KB_QA_API_KEY`.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn var_name(name: &str) -> String {
        name.trim_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }
}

impl SecretStore for EnvSecretStore {
    fn describe(&self) -> String {
        "environment".to_string()
    }

    fn get_secret(&self, name: &str) -> Result<String, IngestError> {
        let var = Self::var_name(name);
        match std::env::var(&var) {
            Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(IngestError::SecretNotFound {
                name: name.to_string(),
                store: format!("environment variable {var}"),
            }),
        }
    }
}

/// Reads `<dir>/<name>` as a secret file; leading slashes in `name` are ignored.
#[derive(Debug, Clone)]
pub struct DirSecretStore {
    dir: PathBuf,
}

impl DirSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SecretStore for DirSecretStore {
    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }

    fn get_secret(&self, name: &str) -> Result<String, IngestError> {
        let path = self.dir.join(name.trim_start_matches('/'));
        match std::fs::read_to_string(&path) {
            Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            Ok(_) => Err(IngestError::SecretUnreadable {
                name: name.to_string(),
                reason: format!("{} is empty", path.display()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(IngestError::SecretNotFound {
                name: name.to_string(),
                store: self.describe(),
            }),
            Err(e) => Err(IngestError::SecretUnreadable {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// In-memory secrets, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn describe(&self) -> String {
        "static store".to_string()
    }

    fn get_secret(&self, name: &str) -> Result<String, IngestError> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| IngestError::SecretNotFound {
                name: name.to_string(),
                store: self.describe(),
            })
    }
}

/// Resolve a token: explicit value first, then the named parameter.
pub fn resolve_token(
    explicit: Option<&str>,
    param: Option<&str>,
    store: &dyn SecretStore,
    source_label: &str,
) -> Result<String, IngestError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Using explicit token for {}", source_label);
        return Ok(token.to_string());
    }
    if let Some(name) = param {
        debug!("Resolving {} token from {}", source_label, store.describe());
        return store.get_secret(name);
    }
    Err(IngestError::MissingToken {
        source_label: source_label.to_string(),
        hint: "Pass the key directly or name a parameter to read it from.".to_string(),
    })
}
