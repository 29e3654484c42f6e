//! Samurai roster domain model.
//!
//! # Responsibility
//! - Define the canonical records for roots, quotes and secret identities.
//! - Provide aggregate builders for registering whole object graphs.
//!
//! # Invariants
//! - Identifiers are storage-assigned on first successful commit and are
//!   never reassigned afterwards.
//! - Every persisted quote and secret identity references an existing root.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod quote;
pub mod samurai;
pub mod secret_identity;

/// Validation failure for model records on write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Root name is empty or whitespace-only.
    EmptyName,
    /// Quote text is empty or whitespace-only.
    EmptyQuoteText,
    /// Secret identity real name is empty or whitespace-only.
    EmptyRealName,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "samurai name must not be empty"),
            Self::EmptyQuoteText => write!(f, "quote text must not be empty"),
            Self::EmptyRealName => write!(f, "secret identity real name must not be empty"),
        }
    }
}

impl Error for ModelValidationError {}
