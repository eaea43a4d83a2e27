//! Account registration and login.
//!
//! # Responsibilities
//! - Create accounts in the `auth` table with a random salt
//! - Verify a presented passhash against the stored salted hash
//!
//! # Design Decisions
//! - The client sends a passhash, never the password
//! - Stored hash = hex(SHA-256(alias ‖ passhash ‖ salt))
//! - New accounts start with the `user` privilege; promotion is a store edit

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::observability::metrics;
use crate::session::claim::SessionClaim;
use crate::store::{Store, StoreError};

/// Table holding one record per alias.
pub const AUTH_TABLE: &str = "auth";

/// Privilege granted on registration.
pub const DEFAULT_PRIVILEGE: &str = "user";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("alias must not be empty")]
    EmptyAlias,

    #[error("alias {0:?} is already registered")]
    AliasTaken(String),

    #[error("unknown alias {0:?}")]
    UnknownAlias(String),

    #[error("passhash does not match")]
    BadCredentials,

    #[error("stored account is malformed: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Store(StoreError),
}

/// Stored form of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    salt: String,
    hash: String,
    privilege: String,
}

fn derive_hash(alias: &str, passhash: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(alias.as_bytes());
    hasher.update(passhash.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Account operations over the `auth` table.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create an account and return the claim for its new session.
    pub fn register(&self, alias: &str, passhash: &str) -> Result<SessionClaim, AccountError> {
        let result = self.try_register(alias, passhash);
        metrics::record_auth("register", if result.is_ok() { "ok" } else { "error" });
        result
    }

    fn try_register(&self, alias: &str, passhash: &str) -> Result<SessionClaim, AccountError> {
        if alias.is_empty() {
            return Err(AccountError::EmptyAlias);
        }

        let salt = new_salt();
        let record = AccountRecord {
            hash: derive_hash(alias, passhash, &salt),
            salt,
            privilege: DEFAULT_PRIVILEGE.to_string(),
        };
        let value = serde_json::to_string(&record)?;

        match self.store.create(AUTH_TABLE, alias, &value) {
            Ok(()) => {
                tracing::info!(alias, "Account registered");
                Ok(SessionClaim::new(alias, record.privilege))
            }
            Err(StoreError::Conflict { .. }) => Err(AccountError::AliasTaken(alias.to_string())),
            Err(e) => Err(AccountError::Store(e)),
        }
    }

    /// Check credentials and return the stored claim.
    pub fn login(&self, alias: &str, passhash: &str) -> Result<SessionClaim, AccountError> {
        let result = self.try_login(alias, passhash);
        metrics::record_auth("login", if result.is_ok() { "ok" } else { "error" });
        result
    }

    fn try_login(&self, alias: &str, passhash: &str) -> Result<SessionClaim, AccountError> {
        let value = match self.store.get_one(AUTH_TABLE, alias) {
            Ok(value) => value,
            Err(e) if e.is_not_found() => return Err(AccountError::UnknownAlias(alias.to_string())),
            Err(StoreError::Malformed { source, .. }) => return Err(AccountError::Corrupt(source)),
            Err(e) => return Err(AccountError::Store(e)),
        };
        let record: AccountRecord = serde_json::from_value(value)?;

        if derive_hash(alias, passhash, &record.salt) != record.hash {
            tracing::info!(alias, "Login rejected");
            return Err(AccountError::BadCredentials);
        }

        tracing::info!(alias, privilege = %record.privilege, "Login accepted");
        Ok(SessionClaim::new(alias, record.privilege))
    }

    /// Overwrite the privilege of an existing account.
    pub fn set_privilege(&self, alias: &str, privilege: &str) -> Result<(), AccountError> {
        let value = self.store.get_one(AUTH_TABLE, alias).map_err(|e| {
            if e.is_not_found() {
                AccountError::UnknownAlias(alias.to_string())
            } else {
                AccountError::Store(e)
            }
        })?;
        let mut record: AccountRecord = serde_json::from_value(value)?;
        record.privilege = privilege.to_string();
        self.store
            .insert(AUTH_TABLE, alias, &serde_json::to_string(&record)?)
            .map_err(AccountError::Store)
    }
}
