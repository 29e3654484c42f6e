//! Secret identity record, optional one-to-one companion of a root.

use crate::model::samurai::SamuraiId;
use crate::model::ModelValidationError;
use serde::{Deserialize, Serialize};

/// Storage-assigned primary key of a secret identity record.
pub type IdentityId = i64;

/// At most one per root, enforced by a UNIQUE constraint on `samurai_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretIdentity {
    /// Primary key. `None` until first commit, stable afterwards.
    pub id: Option<IdentityId>,
    /// Civilian name behind the root. Must not be empty.
    pub real_name: String,
    /// Owning root. `None` only while part of an unpersisted aggregate.
    pub samurai_id: Option<SamuraiId>,
}

impl SecretIdentity {
    /// Creates an identity not yet attached to a persisted root.
    pub fn unowned(real_name: impl Into<String>) -> Self {
        Self {
            id: None,
            real_name: real_name.into(),
            samurai_id: None,
        }
    }

    /// Creates an identity attached to an already-persisted root.
    pub fn owned_by(samurai_id: SamuraiId, real_name: impl Into<String>) -> Self {
        Self {
            id: None,
            real_name: real_name.into(),
            samurai_id: Some(samurai_id),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.real_name.trim().is_empty() {
            return Err(ModelValidationError::EmptyRealName);
        }
        Ok(())
    }
}
