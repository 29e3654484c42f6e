//! Aggregate root record and graph builder.
//!
//! # Responsibility
//! - Define the `Samurai` root record.
//! - Provide `SamuraiAggregate` for registering a root together with its
//!   owned quotes and optional secret identity in one step.
//!
//! # Invariants
//! - `id` stays `None` until the first successful commit.
//! - A root owns its quotes and identity exclusively; deleting it removes
//!   them as well.

use crate::model::quote::Quote;
use crate::model::secret_identity::SecretIdentity;
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};

/// Storage-assigned primary key of a root record.
pub type SamuraiId = i64;

/// Aggregate root of the roster model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Samurai {
    /// Primary key. `None` until first commit, stable afterwards.
    pub id: Option<SamuraiId>,
    /// Display name. Must not be empty.
    pub name: String,
}

impl Samurai {
    /// Creates an unpersisted root with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Input graph for registering one root plus its owned records.
///
/// Quotes and the identity carry no back-reference yet; foreign keys are
/// wired when the owning root receives its key at commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamuraiAggregate {
    pub samurai: Samurai,
    pub quotes: Vec<Quote>,
    pub secret_identity: Option<SecretIdentity>,
}

impl SamuraiAggregate {
    /// Starts an aggregate with a root of the given name and no owned records.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            samurai: Samurai::named(name),
            quotes: Vec::new(),
            secret_identity: None,
        }
    }

    /// Appends an owned quote with the given text.
    pub fn with_quote(mut self, text: impl Into<String>) -> Self {
        self.quotes.push(Quote::unowned(text));
        self
    }

    /// Sets the optional secret identity, replacing any previous one.
    pub fn with_secret_identity(mut self, real_name: impl Into<String>) -> Self {
        self.secret_identity = Some(SecretIdentity::unowned(real_name));
        self
    }

    /// Validates the root and every owned record.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        self.samurai.validate()?;
        for quote in &self.quotes {
            quote.validate()?;
        }
        if let Some(identity) = &self.secret_identity {
            identity.validate()?;
        }
        Ok(())
    }
}
