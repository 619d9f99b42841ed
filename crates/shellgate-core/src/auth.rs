//! API key authentication and scope checks
//!
//! Keys are stored only as SHA-256 digests and compared in constant time.
//! A key carries a set of scopes; `Admin` implies every other scope.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of generated keys.
pub const KEY_PREFIX: &str = "sg_";

/// Characters of a generated key that may appear in logs.
const LOGGED_PREFIX_LEN: usize = 10;

/// Authentication and authorization failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No key in the request
    #[error("Authentication required")]
    MissingCredentials,

    /// Unknown key
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Key exists but was revoked
    #[error("Token revoked")]
    TokenRevoked,

    /// No key with that hash
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// Key lacks the scope the operation needs
    #[error("Insufficient scope: requires {required}")]
    InsufficientScope {
        /// Scope name
        required: String,
    },

    /// Store failure
    #[error("Auth internal error: {0}")]
    Internal(String),
}

/// Auth result type
pub type Result<T> = std::result::Result<T, AuthError>;

/// What a key is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Everything
    Admin,
    /// Run commands, background executions and PTY sessions
    TerminalExecute,
    /// List and read files
    FilesRead,
    /// Write, create and delete files and directories
    FilesWrite,
    /// List and read scripts
    ScriptsRead,
    /// Save and delete scripts
    ScriptsWrite,
    /// Turn the terminal feature on or off
    FeatureToggle,
}

impl Scope {
    /// Wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::TerminalExecute => "terminal_execute",
            Self::FilesRead => "files_read",
            Self::FilesWrite => "files_write",
            Self::ScriptsRead => "scripts_read",
            Self::ScriptsWrite => "scripts_write",
            Self::FeatureToggle => "feature_toggle",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and grants of the caller behind a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Owner of the key
    pub user_id: String,
    /// Granted scopes
    pub scopes: Vec<Scope>,
}

impl AuthContext {
    /// Whether the caller holds `scope`, directly or through `Admin`
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes
            .iter()
            .any(|granted| *granted == Scope::Admin || *granted == scope)
    }

    /// `InsufficientScope` unless the caller holds `scope`
    pub fn require_scope(&self, scope: Scope) -> Result<()> {
        if !self.has_scope(scope) {
            return Err(AuthError::InsufficientScope {
                required: scope.to_string(),
            });
        }
        Ok(())
    }

    fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            scopes: vec![Scope::Admin],
        }
    }
}

/// SHA-256 of a raw key.
#[derive(Clone, Copy)]
struct KeyDigest([u8; 32]);

impl KeyDigest {
    fn of(raw: &str) -> Self {
        Self(Sha256::digest(raw.as_bytes()).into())
    }

    fn hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn matches(&self, other: &KeyDigest) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

struct KeyRecord {
    digest: KeyDigest,
    user_id: String,
    scopes: Vec<Scope>,
    label: String,
    created_at: DateTime<Utc>,
    revoked: bool,
}

/// In-memory key registry
pub struct AuthStore {
    /// Indexed by hex digest
    keys: RwLock<HashMap<String, KeyRecord>>,
    enabled: bool,
}

impl AuthStore {
    /// Empty store. With `enabled == false` every token validates as an
    /// anonymous admin.
    pub fn new(enabled: bool) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            enabled,
        }
    }

    /// Whether keys are checked at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn read_keys(&self) -> Result<RwLockReadGuard<'_, HashMap<String, KeyRecord>>> {
        self.keys
            .read()
            .map_err(|e| AuthError::Internal(format!("key store lock poisoned: {}", e)))
    }

    fn write_keys(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, KeyRecord>>> {
        self.keys
            .write()
            .map_err(|e| AuthError::Internal(format!("key store lock poisoned: {}", e)))
    }

    fn insert(&self, raw_key: &str, user_id: &str, scopes: Vec<Scope>, label: &str) -> Result<String> {
        let digest = KeyDigest::of(raw_key);
        let id = digest.hex();
        self.write_keys()?.insert(
            id.clone(),
            KeyRecord {
                digest,
                user_id: user_id.to_string(),
                scopes,
                label: label.to_string(),
                created_at: Utc::now(),
                revoked: false,
            },
        );
        Ok(id)
    }

    /// Register a key supplied by the operator, e.g. from the environment.
    /// Returns the key hash.
    pub fn register_key(
        &self,
        raw_key: &str,
        user_id: &str,
        scopes: Vec<Scope>,
        label: &str,
    ) -> Result<String> {
        if raw_key.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let id = self.insert(raw_key, user_id, scopes, label)?;
        info!(user_id = %user_id, label = %label, "API key registered");
        Ok(id)
    }

    /// Mint a random key. Returns the raw key, which is not kept, and its
    /// hash.
    pub fn generate_api_key(
        &self,
        user_id: &str,
        scopes: Vec<Scope>,
        label: &str,
    ) -> Result<(SecretString, String)> {
        let raw_key = format!("{}{}", KEY_PREFIX, Uuid::new_v4().as_simple());
        let id = self.insert(&raw_key, user_id, scopes, label)?;
        info!(
            user_id = %user_id,
            label = %label,
            key_prefix = %&raw_key[..LOGGED_PREFIX_LEN],
            "API key generated"
        );
        Ok((SecretString::from(raw_key), id))
    }

    /// Resolve a presented key to its context.
    pub fn validate_token(&self, token: &str) -> Result<AuthContext> {
        if !self.enabled {
            return Ok(AuthContext::anonymous());
        }
        if token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let presented = KeyDigest::of(token);
        let keys = self.read_keys()?;
        let record = match keys.get(&presented.hex()) {
            Some(record) if record.digest.matches(&presented) => record,
            _ => {
                warn!("Rejected unknown API key");
                return Err(AuthError::InvalidCredentials);
            }
        };
        if record.revoked {
            return Err(AuthError::TokenRevoked);
        }

        debug!(user_id = %record.user_id, label = %record.label, "API key accepted");
        Ok(AuthContext {
            user_id: record.user_id.clone(),
            scopes: record.scopes.clone(),
        })
    }

    /// Revoke the key with hash `key_hash_hex`.
    pub fn revoke_key(&self, key_hash_hex: &str) -> Result<()> {
        let mut keys = self.write_keys()?;
        let record = keys
            .get_mut(key_hash_hex)
            .ok_or_else(|| AuthError::UnknownKey(key_hash_hex.to_string()))?;
        record.revoked = true;
        info!(user_id = %record.user_id, label = %record.label, "API key revoked");
        Ok(())
    }

    /// Every key, oldest first, without secrets.
    pub fn list_keys(&self) -> Result<Vec<ApiKeyInfo>> {
        let mut listed: Vec<ApiKeyInfo> = self
            .read_keys()?
            .iter()
            .map(|(id, record)| ApiKeyInfo {
                key_hash: id.clone(),
                user_id: record.user_id.clone(),
                label: record.label.clone(),
                scopes: record.scopes.clone(),
                created_at: record.created_at,
                revoked: record.revoked,
            })
            .collect();
        listed.sort_by_key(|k| k.created_at);
        Ok(listed)
    }

    /// Keys that are not revoked
    pub fn active_key_count(&self) -> usize {
        self.read_keys()
            .map(|keys| keys.values().filter(|k| !k.revoked).count())
            .unwrap_or(0)
    }
}

/// Listing entry for a key
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyInfo {
    /// Hex digest, also the revocation handle
    pub key_hash: String,
    /// Owner
    pub user_id: String,
    /// Free-form label
    pub label: String,
    /// Granted scopes
    pub scopes: Vec<Scope>,
    /// When the key was added
    pub created_at: DateTime<Utc>,
    /// Whether revoked
    pub revoked: bool,
}

/// Scopes for an operator who may use everything but toggle the feature.
pub fn operator_scopes() -> Vec<Scope> {
    vec![
        Scope::TerminalExecute,
        Scope::FilesRead,
        Scope::FilesWrite,
        Scope::ScriptsRead,
        Scope::ScriptsWrite,
    ]
}

/// Admin scope set
pub fn admin_scopes() -> Vec<Scope> {
    vec![Scope::Admin]
}
