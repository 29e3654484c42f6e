use dojo_core::db::migrations::latest_version;
use dojo_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "samurais");
    assert_table_exists(&conn, "quotes");
    assert_table_exists(&conn, "secret_identities");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "samurais");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn root_deletion_cascades_at_the_storage_level() {
    let conn = open_db_in_memory().unwrap();

    conn.execute("INSERT INTO samurais (name) VALUES ('lone');", [])
        .unwrap();
    let root_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO quotes (text, samurai_id) VALUES ('gone with me', ?1);",
        [root_id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO secret_identities (real_name, samurai_id) VALUES ('nobody', ?1);",
        [root_id],
    )
    .unwrap();

    conn.execute("DELETE FROM samurais WHERE id = ?1;", [root_id])
        .unwrap();

    let quotes: i64 = conn
        .query_row("SELECT COUNT(*) FROM quotes;", [], |row| row.get(0))
        .unwrap();
    let identities: i64 = conn
        .query_row("SELECT COUNT(*) FROM secret_identities;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(quotes, 0);
    assert_eq!(identities, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
