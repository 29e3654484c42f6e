//! Roster repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level CRUD, count and projection APIs over the roster tables.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call model `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Constraint failures (duplicate one-to-one identity, dangling foreign
//!   key) surface as `RepoError::Constraint`, never as partial success.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::quote::{Quote, QuoteId};
use crate::model::samurai::{Samurai, SamuraiId};
use crate::model::secret_identity::{IdentityId, SecretIdentity};
use crate::model::ModelValidationError;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REQUIRED_TABLES: &[&str] = &["samurais", "quotes", "secret_identities"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for roster persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    /// Storage rejected the write with a constraint violation.
    Constraint(String),
    NotFound {
        kind: &'static str,
        id: i64,
    },
    /// Write was attempted on a record that has never been committed.
    Unpersisted(&'static str),
    InvalidData(String),
    /// Connection schema version does not match this binary.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Unpersisted(kind) => {
                write!(f, "{kind} has no id yet; commit the aggregate first")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted roster data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(inner, message)
                if inner.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Untracked read model: one row per quote, id plus text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSummary {
    pub id: QuoteId,
    pub text: String,
}

/// Untracked read model: one row per root with related facts folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamuraiOverview {
    pub id: SamuraiId,
    pub name: String,
    /// Real name of the optional secret identity, when one exists.
    pub real_name: Option<String>,
    /// Number of quotes owned by this root.
    pub quote_count: i64,
}

/// Repository interface for roster row operations.
pub trait SamuraiRepository {
    fn insert_samurai(&self, samurai: &Samurai) -> RepoResult<SamuraiId>;
    fn update_samurai(&self, samurai: &Samurai) -> RepoResult<()>;
    fn delete_samurai(&self, id: SamuraiId) -> RepoResult<()>;
    fn get_samurai(&self, id: SamuraiId) -> RepoResult<Option<Samurai>>;
    fn list_samurais(&self) -> RepoResult<Vec<Samurai>>;

    fn insert_quote(&self, quote: &Quote) -> RepoResult<QuoteId>;
    fn update_quote(&self, quote: &Quote) -> RepoResult<()>;
    fn delete_quote(&self, id: QuoteId) -> RepoResult<()>;
    fn list_quotes_by_samurai(&self, samurai_id: SamuraiId) -> RepoResult<Vec<Quote>>;

    fn insert_identity(&self, identity: &SecretIdentity) -> RepoResult<IdentityId>;
    fn update_identity(&self, identity: &SecretIdentity) -> RepoResult<()>;
    fn delete_identity(&self, id: IdentityId) -> RepoResult<()>;
    fn get_identity_by_samurai(&self, samurai_id: SamuraiId)
        -> RepoResult<Option<SecretIdentity>>;

    fn count_samurais(&self) -> RepoResult<i64>;
    fn count_quotes(&self) -> RepoResult<i64>;
    fn count_samurais_with_identity(&self) -> RepoResult<i64>;

    fn quote_summaries(&self) -> RepoResult<Vec<QuoteSummary>>;
    fn samurai_overviews(&self) -> RepoResult<Vec<SamuraiOverview>>;
}

/// SQLite-backed roster repository.
///
/// Borrows a plain connection, so it also works inside a transaction scope
/// (`rusqlite::Transaction` derefs to `Connection`).
pub struct SqliteSamuraiRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSamuraiRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SamuraiRepository for SqliteSamuraiRepository<'_> {
    fn insert_samurai(&self, samurai: &Samurai) -> RepoResult<SamuraiId> {
        samurai.validate()?;

        self.conn.execute(
            "INSERT INTO samurais (name) VALUES (?1);",
            params![samurai.name.as_str()],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_samurai(&self, samurai: &Samurai) -> RepoResult<()> {
        samurai.validate()?;
        let id = samurai.id.ok_or(RepoError::Unpersisted("samurai"))?;

        let changed = self.conn.execute(
            "UPDATE samurais SET name = ?1 WHERE id = ?2;",
            params![samurai.name.as_str(), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "samurai",
                id,
            });
        }

        Ok(())
    }

    fn delete_samurai(&self, id: SamuraiId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM samurais WHERE id = ?1;", params![id])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "samurai",
                id,
            });
        }

        Ok(())
    }

    fn get_samurai(&self, id: SamuraiId) -> RepoResult<Option<Samurai>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM samurais WHERE id = ?1;")?;

        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_samurai_row(row)?));
        }

        Ok(None)
    }

    fn list_samurais(&self) -> RepoResult<Vec<Samurai>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM samurais ORDER BY id;")?;
        let mut rows = stmt.query([])?;
        let mut samurais = Vec::new();

        while let Some(row) = rows.next()? {
            samurais.push(parse_samurai_row(row)?);
        }

        Ok(samurais)
    }

    fn insert_quote(&self, quote: &Quote) -> RepoResult<QuoteId> {
        quote.validate()?;
        let samurai_id = quote.samurai_id.ok_or(RepoError::Unpersisted("quote"))?;

        self.conn.execute(
            "INSERT INTO quotes (text, samurai_id) VALUES (?1, ?2);",
            params![quote.text.as_str(), samurai_id],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_quote(&self, quote: &Quote) -> RepoResult<()> {
        quote.validate()?;
        let id = quote.id.ok_or(RepoError::Unpersisted("quote"))?;
        let samurai_id = quote.samurai_id.ok_or(RepoError::Unpersisted("quote"))?;

        let changed = self.conn.execute(
            "UPDATE quotes SET text = ?1, samurai_id = ?2 WHERE id = ?3;",
            params![quote.text.as_str(), samurai_id, id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { kind: "quote", id });
        }

        Ok(())
    }

    fn delete_quote(&self, id: QuoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM quotes WHERE id = ?1;", params![id])?;

        if changed == 0 {
            return Err(RepoError::NotFound { kind: "quote", id });
        }

        Ok(())
    }

    fn list_quotes_by_samurai(&self, samurai_id: SamuraiId) -> RepoResult<Vec<Quote>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, samurai_id FROM quotes WHERE samurai_id = ?1 ORDER BY id;",
        )?;
        let mut rows = stmt.query(params![samurai_id])?;
        let mut quotes = Vec::new();

        while let Some(row) = rows.next()? {
            quotes.push(parse_quote_row(row)?);
        }

        Ok(quotes)
    }

    fn insert_identity(&self, identity: &SecretIdentity) -> RepoResult<IdentityId> {
        identity.validate()?;
        let samurai_id = identity
            .samurai_id
            .ok_or(RepoError::Unpersisted("secret identity"))?;

        self.conn.execute(
            "INSERT INTO secret_identities (real_name, samurai_id) VALUES (?1, ?2);",
            params![identity.real_name.as_str(), samurai_id],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_identity(&self, identity: &SecretIdentity) -> RepoResult<()> {
        identity.validate()?;
        let id = identity.id.ok_or(RepoError::Unpersisted("secret identity"))?;
        let samurai_id = identity
            .samurai_id
            .ok_or(RepoError::Unpersisted("secret identity"))?;

        let changed = self.conn.execute(
            "UPDATE secret_identities SET real_name = ?1, samurai_id = ?2 WHERE id = ?3;",
            params![identity.real_name.as_str(), samurai_id, id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "secret identity",
                id,
            });
        }

        Ok(())
    }

    fn delete_identity(&self, id: IdentityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM secret_identities WHERE id = ?1;", params![id])?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "secret identity",
                id,
            });
        }

        Ok(())
    }

    fn get_identity_by_samurai(
        &self,
        samurai_id: SamuraiId,
    ) -> RepoResult<Option<SecretIdentity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, real_name, samurai_id FROM secret_identities WHERE samurai_id = ?1;",
        )?;

        let mut rows = stmt.query(params![samurai_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_identity_row(row)?));
        }

        Ok(None)
    }

    fn count_samurais(&self) -> RepoResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM samurais;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_quotes(&self) -> RepoResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn count_samurais_with_identity(&self) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM samurais s
             WHERE EXISTS (
                 SELECT 1 FROM secret_identities si WHERE si.samurai_id = s.id
             );",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn quote_summaries(&self) -> RepoResult<Vec<QuoteSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, text FROM quotes ORDER BY id;")?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();

        while let Some(row) = rows.next()? {
            summaries.push(QuoteSummary {
                id: row.get("id")?,
                text: row.get("text")?,
            });
        }

        Ok(summaries)
    }

    fn samurai_overviews(&self) -> RepoResult<Vec<SamuraiOverview>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                s.id,
                s.name,
                si.real_name,
                (SELECT COUNT(*) FROM quotes q WHERE q.samurai_id = s.id) AS quote_count
             FROM samurais s
             LEFT JOIN secret_identities si ON si.samurai_id = s.id
             ORDER BY s.id;",
        )?;
        let mut rows = stmt.query([])?;
        let mut overviews = Vec::new();

        while let Some(row) = rows.next()? {
            overviews.push(SamuraiOverview {
                id: row.get("id")?,
                name: row.get("name")?,
                real_name: row.get("real_name")?,
                quote_count: row.get("quote_count")?,
            });
        }

        Ok(overviews)
    }
}

fn parse_samurai_row(row: &Row<'_>) -> RepoResult<Samurai> {
    let samurai = Samurai {
        id: Some(row.get("id")?),
        name: row.get("name")?,
    };
    samurai.validate().map_err(|err| {
        RepoError::InvalidData(format!("samurai row {:?}: {err}", samurai.id))
    })?;
    Ok(samurai)
}

fn parse_quote_row(row: &Row<'_>) -> RepoResult<Quote> {
    let quote = Quote {
        id: Some(row.get("id")?),
        text: row.get("text")?,
        samurai_id: Some(row.get("samurai_id")?),
    };
    quote
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("quote row {:?}: {err}", quote.id)))?;
    Ok(quote)
}

fn parse_identity_row(row: &Row<'_>) -> RepoResult<SecretIdentity> {
    let identity = SecretIdentity {
        id: Some(row.get("id")?),
        real_name: row.get("real_name")?,
        samurai_id: Some(row.get("samurai_id")?),
    };
    identity.validate().map_err(|err| {
        RepoError::InvalidData(format!("secret identity row {:?}: {err}", identity.id))
    })?;
    Ok(identity)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected = latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual != expected {
        return Err(RepoError::UninitializedConnection {
            expected_version: expected,
            actual_version: actual,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            params![table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
