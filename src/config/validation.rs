//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every route pattern compiles
//! - Validate value ranges (cookie lifetime > 0, store path present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use regex::Regex;
use thiserror::Error;

use crate::config::schema::{AppConfig, StoreBackend};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index} pattern {pattern:?} is not a valid regex: {reason}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        reason: String,
    },

    #[error("session secret must not be empty")]
    EmptySecret,

    #[error("session max_age_secs must be greater than zero")]
    ZeroMaxAge,

    #[error("sqlite store requires a path")]
    MissingStorePath,

    #[error("application name must be a valid cookie name, got {0:?}")]
    InvalidName(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, route) in config.routes.iter().enumerate() {
        if let Err(e) = Regex::new(&route.pattern) {
            errors.push(ValidationError::InvalidPattern {
                index,
                pattern: route.pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config.session.secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }
    if config.session.max_age_secs == 0 {
        errors.push(ValidationError::ZeroMaxAge);
    }
    if config.store.backend == StoreBackend::Sqlite && config.store.path.is_empty() {
        errors.push(ValidationError::MissingStorePath);
    }
    let valid_name = !config.name.is_empty()
        && config
            .name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !valid_name {
        errors.push(ValidationError::InvalidName(config.name.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
