//! Roster persistence core: a scoped unit of work with an identity map and
//! snapshot change tracking over SQLite.
//! This crate is the single source of truth for roster invariants.

pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;

pub use context::{
    AggregateHandles, EntityEntry, EntityKind, EntityState, SamuraiContext, SamuraiWithQuotes,
    Tracked,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::quote::{Quote, QuoteId};
pub use model::samurai::{Samurai, SamuraiAggregate, SamuraiId};
pub use model::secret_identity::{IdentityId, SecretIdentity};
pub use model::ModelValidationError;
pub use repo::samurai_repo::{
    QuoteSummary, RepoError, RepoResult, SamuraiOverview, SamuraiRepository,
    SqliteSamuraiRepository,
};
pub use seed::seed;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
