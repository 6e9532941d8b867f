//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every check is named, names are unique, kind is present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Unknown kinds are not errors; they are skipped at scrape time
//! - Validation is pure function: ExporterConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::ExporterConfig;

/// A single semantic problem in the check document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("check #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("check '{name}' is declared more than once")]
    DuplicateName { name: String },

    #[error("check '{name}' has no kind")]
    MissingKind { name: String },
}

pub fn validate_config(config: &ExporterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, check) in config.checks.iter().enumerate() {
        if check.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { index });
        } else if !seen.insert(check.name.as_str()) {
            errors.push(ValidationError::DuplicateName { name: check.name.clone() });
        }

        if check.kind.trim().is_empty() {
            errors.push(ValidationError::MissingKind {
                name: check.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
