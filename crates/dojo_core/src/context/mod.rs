//! Unit-of-work persistence context for the roster model.
//!
//! # Responsibility
//! - Provide a scoped boundary for loading and saving the domain model.
//! - Maintain an identity map so repeated loads of one key return the same
//!   in-memory instance.
//! - Track field-level mutations and flush them on commit.
//!
//! # Invariants
//! - One context per logical operation sequence; never shared across threads
//!   (`Rc`/`RefCell` enforce this at compile time).
//! - `save_changes` is the only operation that writes durable storage, and
//!   it is all-or-nothing: on failure no identifier is assigned and no entry
//!   leaves its current state.
//! - Dropping the context discards tracked state without flushing.

use crate::db::{open_db, open_db_in_memory};
use crate::model::quote::Quote;
use crate::model::samurai::{Samurai, SamuraiAggregate, SamuraiId};
use crate::model::secret_identity::SecretIdentity;
use crate::repo::samurai_repo::{
    QuoteSummary, RepoError, RepoResult, SamuraiOverview, SamuraiRepository,
    SqliteSamuraiRepository,
};
use log::{error, info};
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

mod tracking;

pub use tracking::{EntityEntry, EntityKind, EntityState};
use tracking::TrackedSet;

/// Shared handle to a tracked record.
pub type Tracked<E> = Rc<RefCell<E>>;

/// Result of the tracked eager-load projection: one root plus its quotes.
///
/// This projection is the only graph view; tracked roots do not grow an
/// in-memory quote collection of their own after the load.
pub struct SamuraiWithQuotes {
    pub samurai: Tracked<Samurai>,
    pub quotes: Vec<Tracked<Quote>>,
}

/// Handles to a registered-but-uncommitted aggregate graph.
pub struct AggregateHandles {
    pub samurai: Tracked<Samurai>,
    pub quotes: Vec<Tracked<Quote>>,
    pub secret_identity: Option<Tracked<SecretIdentity>>,
}

struct PendingAggregate {
    samurai: Tracked<Samurai>,
    quotes: Vec<Tracked<Quote>>,
    secret_identity: Option<Tracked<SecretIdentity>>,
}

struct AggregateIds {
    root: SamuraiId,
    quotes: Vec<i64>,
    identity: Option<i64>,
}

/// Scoped unit of work over one roster connection.
pub struct SamuraiContext {
    conn: Connection,
    samurais: TrackedSet<Samurai>,
    quotes: TrackedSet<Quote>,
    identities: TrackedSet<SecretIdentity>,
    pending_aggregates: Vec<PendingAggregate>,
    pending_quotes: Vec<Tracked<Quote>>,
    pending_identities: Vec<Tracked<SecretIdentity>>,
}

impl SamuraiContext {
    /// Wraps an already-bootstrapped connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            samurais: TrackedSet::new(),
            quotes: TrackedSet::new(),
            identities: TrackedSet::new(),
            pending_aggregates: Vec::new(),
            pending_quotes: Vec::new(),
            pending_identities: Vec::new(),
        }
    }

    /// Opens a file-backed context with migrations applied.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a private in-memory context with migrations applied.
    pub fn in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Raw connection access for callers that need to bypass tracking.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn repo(&self) -> RepoResult<SqliteSamuraiRepository<'_>> {
        SqliteSamuraiRepository::try_new(&self.conn)
    }

    // --- queries -----------------------------------------------------------

    /// Loads one root by key through the identity map.
    ///
    /// A missing key is an absent result, not an error.
    pub fn find_samurai(&mut self, id: SamuraiId) -> RepoResult<Option<Tracked<Samurai>>> {
        if let Some(handle) = self.samurais.get(id) {
            return Ok(Some(handle));
        }

        let row = self.repo()?.get_samurai(id)?;
        match row {
            Some(row) => Ok(Some(self.attach_samurai(row)?)),
            None => Ok(None),
        }
    }

    /// Loads every root, read-through: already-tracked rows keep their
    /// in-memory values.
    pub fn samurais(&mut self) -> RepoResult<Vec<Tracked<Samurai>>> {
        let rows = self.repo()?.list_samurais()?;
        rows.into_iter()
            .map(|row| self.attach_samurai(row))
            .collect()
    }

    /// Loads the quotes of one root as tracked handles.
    pub fn quotes_by_samurai(&mut self, samurai_id: SamuraiId) -> RepoResult<Vec<Tracked<Quote>>> {
        let rows = self.repo()?.list_quotes_by_samurai(samurai_id)?;
        rows.into_iter().map(|row| self.attach_quote(row)).collect()
    }

    /// Loads the optional secret identity of one root as a tracked handle.
    pub fn secret_identity_of(
        &mut self,
        samurai_id: SamuraiId,
    ) -> RepoResult<Option<Tracked<SecretIdentity>>> {
        let row = self.repo()?.get_identity_by_samurai(samurai_id)?;
        match row {
            Some(row) => Ok(Some(self.attach_identity(row)?)),
            None => Ok(None),
        }
    }

    /// Eager-load projection: every root together with its quotes, all
    /// tracked. After this call the tracked quote entries equal the total
    /// number of quote rows.
    pub fn samurais_with_quotes(&mut self) -> RepoResult<Vec<SamuraiWithQuotes>> {
        let roots = self.repo()?.list_samurais()?;
        let mut graphs = Vec::with_capacity(roots.len());

        for row in roots {
            let samurai_id = row
                .id
                .ok_or_else(|| RepoError::InvalidData("samurai row without id".to_string()))?;
            let samurai = self.attach_samurai(row)?;
            let quotes = self.quotes_by_samurai(samurai_id)?;
            graphs.push(SamuraiWithQuotes { samurai, quotes });
        }

        Ok(graphs)
    }

    /// Untracked projection: id and text of every quote.
    pub fn quote_summaries(&self) -> RepoResult<Vec<QuoteSummary>> {
        self.repo()?.quote_summaries()
    }

    /// Untracked projection: per-root overview with optional real name and
    /// quote count.
    pub fn samurai_overviews(&self) -> RepoResult<Vec<SamuraiOverview>> {
        self.repo()?.samurai_overviews()
    }

    pub fn count_samurais(&self) -> RepoResult<i64> {
        self.repo()?.count_samurais()
    }

    pub fn count_quotes(&self) -> RepoResult<i64> {
        self.repo()?.count_quotes()
    }

    pub fn count_samurais_with_identity(&self) -> RepoResult<i64> {
        self.repo()?.count_samurais_with_identity()
    }

    // --- registration ------------------------------------------------------

    /// Registers a whole aggregate graph for insert.
    ///
    /// No identifier is assigned until the next successful `save_changes`.
    pub fn add_samurai(&mut self, aggregate: SamuraiAggregate) -> RepoResult<AggregateHandles> {
        aggregate.validate()?;

        let samurai = Rc::new(RefCell::new(aggregate.samurai));
        let quotes: Vec<Tracked<Quote>> = aggregate
            .quotes
            .into_iter()
            .map(|quote| Rc::new(RefCell::new(quote)))
            .collect();
        let secret_identity = aggregate
            .secret_identity
            .map(|identity| Rc::new(RefCell::new(identity)));

        self.pending_aggregates.push(PendingAggregate {
            samurai: Rc::clone(&samurai),
            quotes: quotes.iter().map(Rc::clone).collect(),
            secret_identity: secret_identity.as_ref().map(Rc::clone),
        });

        Ok(AggregateHandles {
            samurai,
            quotes,
            secret_identity,
        })
    }

    /// Registers one quote for an already-persisted root.
    pub fn add_quote(
        &mut self,
        samurai_id: SamuraiId,
        text: impl Into<String>,
    ) -> RepoResult<Tracked<Quote>> {
        let quote = Quote::owned_by(samurai_id, text);
        quote.validate()?;

        let handle = Rc::new(RefCell::new(quote));
        self.pending_quotes.push(Rc::clone(&handle));
        Ok(handle)
    }

    /// Registers a secret identity for an already-persisted root.
    ///
    /// The one-identity-per-root rule is enforced by storage; a duplicate
    /// surfaces as `RepoError::Constraint` from the next `save_changes`.
    pub fn give_secret_identity(
        &mut self,
        samurai_id: SamuraiId,
        real_name: impl Into<String>,
    ) -> RepoResult<Tracked<SecretIdentity>> {
        let identity = SecretIdentity::owned_by(samurai_id, real_name);
        identity.validate()?;

        let handle = Rc::new(RefCell::new(identity));
        self.pending_identities.push(Rc::clone(&handle));
        Ok(handle)
    }

    /// Marks one root and its loaded dependents for deletion.
    ///
    /// Dependents that were never loaded into this context are removed by
    /// the schema's ON DELETE CASCADE at commit.
    pub fn remove_samurai(&mut self, id: SamuraiId) -> RepoResult<()> {
        if self.find_samurai(id)?.is_none() {
            return Err(RepoError::NotFound {
                kind: "samurai",
                id,
            });
        }

        self.samurais.mark_deleted(id);
        self.quotes
            .mark_deleted_where(|quote| quote.samurai_id == Some(id));
        self.identities
            .mark_deleted_where(|identity| identity.samurai_id == Some(id));
        Ok(())
    }

    // --- tracking report ---------------------------------------------------

    /// Reports the state of every tracked and pending record.
    pub fn entries(&self) -> Vec<EntityEntry> {
        let mut entries = Vec::new();

        for pending in &self.pending_aggregates {
            entries.push(added_entry(EntityKind::Samurai));
            entries.extend(pending.quotes.iter().map(|_| added_entry(EntityKind::Quote)));
            if pending.secret_identity.is_some() {
                entries.push(added_entry(EntityKind::SecretIdentity));
            }
        }
        entries.extend(self.pending_quotes.iter().map(|_| added_entry(EntityKind::Quote)));
        entries.extend(
            self.pending_identities
                .iter()
                .map(|_| added_entry(EntityKind::SecretIdentity)),
        );

        entries.extend(self.samurais.entries(EntityKind::Samurai));
        entries.extend(self.quotes.entries(EntityKind::Quote));
        entries.extend(self.identities.entries(EntityKind::SecretIdentity));
        entries
    }

    /// Tracked entries of one record category.
    pub fn entries_of(&self, kind: EntityKind) -> Vec<EntityEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.kind == kind)
            .collect()
    }

    /// Tracked entries currently in the given state.
    pub fn entries_in_state(&self, state: EntityState) -> Vec<EntityEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.state == state)
            .collect()
    }

    // --- commit ------------------------------------------------------------

    /// Persists all pending inserts, updates and deletes in one transaction.
    ///
    /// Assigns identifiers to newly inserted records and resets every entry
    /// to Unchanged. On failure the transaction rolls back, no identifier is
    /// assigned and tracked state is left as it was. Returns the number of
    /// rows written.
    pub fn save_changes(&mut self) -> RepoResult<usize> {
        let started_at = Instant::now();

        match self.commit_pending() {
            Ok(written) => {
                info!(
                    "event=save_changes module=context status=ok written={} duration_ms={}",
                    written,
                    started_at.elapsed().as_millis()
                );
                Ok(written)
            }
            Err(err) => {
                error!(
                    "event=save_changes module=context status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn commit_pending(&mut self) -> RepoResult<usize> {
        let samurai_updates = self.samurais.modified_values();
        let quote_updates = self.quotes.modified_values();
        let identity_updates = self.identities.modified_values();
        let quote_deletes = self.quotes.deleted_ids();
        let identity_deletes = self.identities.deleted_ids();
        let samurai_deletes = self.samurais.deleted_ids();

        let mut written = 0usize;
        let mut aggregate_ids = Vec::with_capacity(self.pending_aggregates.len());
        let mut new_quote_ids = Vec::with_capacity(self.pending_quotes.len());
        let mut new_identity_ids = Vec::with_capacity(self.pending_identities.len());

        let tx = self.conn.transaction()?;
        {
            let repo = SqliteSamuraiRepository::try_new(&tx)?;

            // Inserts first, roots before dependents, so fresh foreign keys
            // exist by the time dependent rows land.
            for pending in &self.pending_aggregates {
                let root_id = repo.insert_samurai(&pending.samurai.borrow())?;
                written += 1;

                let mut quote_ids = Vec::with_capacity(pending.quotes.len());
                for quote in &pending.quotes {
                    let mut row = quote.borrow().clone();
                    row.samurai_id = Some(root_id);
                    quote_ids.push(repo.insert_quote(&row)?);
                    written += 1;
                }

                let identity = match &pending.secret_identity {
                    Some(identity) => {
                        let mut row = identity.borrow().clone();
                        row.samurai_id = Some(root_id);
                        let id = repo.insert_identity(&row)?;
                        written += 1;
                        Some(id)
                    }
                    None => None,
                };

                aggregate_ids.push(AggregateIds {
                    root: root_id,
                    quotes: quote_ids,
                    identity,
                });
            }

            for quote in &self.pending_quotes {
                new_quote_ids.push(repo.insert_quote(&quote.borrow())?);
                written += 1;
            }
            for identity in &self.pending_identities {
                new_identity_ids.push(repo.insert_identity(&identity.borrow())?);
                written += 1;
            }

            for samurai in &samurai_updates {
                repo.update_samurai(samurai)?;
                written += 1;
            }
            for quote in &quote_updates {
                repo.update_quote(quote)?;
                written += 1;
            }
            for identity in &identity_updates {
                repo.update_identity(identity)?;
                written += 1;
            }

            // Dependents first; root deletion also cascades to anything
            // this context never loaded.
            for id in &quote_deletes {
                repo.delete_quote(*id)?;
                written += 1;
            }
            for id in &identity_deletes {
                repo.delete_identity(*id)?;
                written += 1;
            }
            for id in &samurai_deletes {
                repo.delete_samurai(*id)?;
                written += 1;
            }
        }
        tx.commit()?;

        // Only now that the transaction is durable do identifiers and
        // foreign keys flow back into the shared handles.
        let pendings = std::mem::take(&mut self.pending_aggregates);
        for (pending, ids) in pendings.into_iter().zip(aggregate_ids) {
            pending.samurai.borrow_mut().id = Some(ids.root);
            self.samurais.adopt(ids.root, pending.samurai);

            for (quote, quote_id) in pending.quotes.into_iter().zip(ids.quotes) {
                {
                    let mut row = quote.borrow_mut();
                    row.id = Some(quote_id);
                    row.samurai_id = Some(ids.root);
                }
                self.quotes.adopt(quote_id, quote);
            }

            if let (Some(identity), Some(identity_id)) = (pending.secret_identity, ids.identity) {
                {
                    let mut row = identity.borrow_mut();
                    row.id = Some(identity_id);
                    row.samurai_id = Some(ids.root);
                }
                self.identities.adopt(identity_id, identity);
            }
        }

        let pending_quotes = std::mem::take(&mut self.pending_quotes);
        for (quote, id) in pending_quotes.into_iter().zip(new_quote_ids) {
            quote.borrow_mut().id = Some(id);
            self.quotes.adopt(id, quote);
        }

        let pending_identities = std::mem::take(&mut self.pending_identities);
        for (identity, id) in pending_identities.into_iter().zip(new_identity_ids) {
            identity.borrow_mut().id = Some(id);
            self.identities.adopt(id, identity);
        }

        self.samurais.accept_commit();
        self.quotes.accept_commit();
        self.identities.accept_commit();

        Ok(written)
    }

    // --- attach helpers ----------------------------------------------------

    fn attach_samurai(&mut self, row: Samurai) -> RepoResult<Tracked<Samurai>> {
        let id = row
            .id
            .ok_or_else(|| RepoError::InvalidData("samurai row without id".to_string()))?;
        Ok(self.samurais.attach(id, row))
    }

    fn attach_quote(&mut self, row: Quote) -> RepoResult<Tracked<Quote>> {
        let id = row
            .id
            .ok_or_else(|| RepoError::InvalidData("quote row without id".to_string()))?;
        Ok(self.quotes.attach(id, row))
    }

    fn attach_identity(&mut self, row: SecretIdentity) -> RepoResult<Tracked<SecretIdentity>> {
        let id = row
            .id
            .ok_or_else(|| RepoError::InvalidData("secret identity row without id".to_string()))?;
        Ok(self.identities.attach(id, row))
    }
}

fn added_entry(kind: EntityKind) -> EntityEntry {
    EntityEntry {
        kind,
        id: None,
        state: EntityState::Added,
    }
}
