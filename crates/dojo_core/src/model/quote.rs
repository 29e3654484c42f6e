//! Quote child record.

use crate::model::samurai::SamuraiId;
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};

/// Storage-assigned primary key of a quote record.
pub type QuoteId = i64;

/// Free-text record owned by exactly one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Primary key. `None` until first commit, stable afterwards.
    pub id: Option<QuoteId>,
    /// Quote text. Must not be empty.
    pub text: String,
    /// Owning root. `None` only while part of an unpersisted aggregate.
    pub samurai_id: Option<SamuraiId>,
}

impl Quote {
    /// Creates a quote not yet attached to a persisted root.
    pub fn unowned(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            samurai_id: None,
        }
    }

    /// Creates a quote attached to an already-persisted root.
    pub fn owned_by(samurai_id: SamuraiId, text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            samurai_id: Some(samurai_id),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.text.trim().is_empty() {
            return Err(ModelValidationError::EmptyQuoteText);
        }
        Ok(())
    }
}
