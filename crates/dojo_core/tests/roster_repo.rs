use dojo_core::db::open_db_in_memory;
use dojo_core::{
    Quote, RepoError, Samurai, SamuraiRepository, SecretIdentity, SqliteSamuraiRepository,
};
use rusqlite::Connection;

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSamuraiRepository::try_new(&conn).unwrap();

    let id = repo.insert_samurai(&Samurai::named("Kambei Shimada")).unwrap();

    let loaded = repo.get_samurai(id).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.name, "Kambei Shimada");
    assert!(repo.get_samurai(id + 1).unwrap().is_none());
}

#[test]
fn update_rewrites_the_row_and_flags_missing_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSamuraiRepository::try_new(&conn).unwrap();

    let id = repo.insert_samurai(&Samurai::named("draft")).unwrap();
    let updated = Samurai {
        id: Some(id),
        name: "renamed".to_string(),
    };
    repo.update_samurai(&updated).unwrap();
    assert_eq!(repo.get_samurai(id).unwrap().unwrap().name, "renamed");

    let missing = Samurai {
        id: Some(id + 50),
        name: "ghost".to_string(),
    };
    let err = repo.update_samurai(&missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { kind: "samurai", .. }));

    let unpersisted = Samurai::named("no id yet");
    let err = repo.update_samurai(&unpersisted).unwrap_err();
    assert!(matches!(err, RepoError::Unpersisted("samurai")));
}

#[test]
fn validation_failure_blocks_writes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSamuraiRepository::try_new(&conn).unwrap();

    let err = repo.insert_samurai(&Samurai::named("  ")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.count_samurais().unwrap(), 0);
}

#[test]
fn quote_insert_requires_an_existing_root() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSamuraiRepository::try_new(&conn).unwrap();

    let err = repo
        .insert_quote(&Quote::owned_by(42, "dangling"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));

    let root_id = repo.insert_samurai(&Samurai::named("Kyūzō")).unwrap();
    let quote_id = repo
        .insert_quote(&Quote::owned_by(root_id, "Watch out for my sharp sword!"))
        .unwrap();

    let quotes = repo.list_quotes_by_samurai(root_id).unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].id, Some(quote_id));
}

#[test]
fn second_identity_for_one_root_is_a_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSamuraiRepository::try_new(&conn).unwrap();

    let root_id = repo.insert_samurai(&Samurai::named("Shichirōji ")).unwrap();
    repo.insert_identity(&SecretIdentity::owned_by(root_id, "Julie"))
        .unwrap();

    let err = repo
        .insert_identity(&SecretIdentity::owned_by(root_id, "Julia"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
    assert_eq!(repo.count_samurais_with_identity().unwrap(), 1);
}

#[test]
fn counts_and_projections_reflect_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSamuraiRepository::try_new(&conn).unwrap();

    let kambei = repo.insert_samurai(&Samurai::named("Kambei Shimada")).unwrap();
    let kyuzo = repo.insert_samurai(&Samurai::named("Kyūzō")).unwrap();
    repo.insert_quote(&Quote::owned_by(kambei, "I've come to save you"))
        .unwrap();
    repo.insert_quote(&Quote::owned_by(kyuzo, "Watch out for my sharp sword!"))
        .unwrap();
    repo.insert_identity(&SecretIdentity::owned_by(kambei, "Julie"))
        .unwrap();

    assert_eq!(repo.count_samurais().unwrap(), 2);
    assert_eq!(repo.count_quotes().unwrap(), 2);
    assert_eq!(repo.count_samurais_with_identity().unwrap(), 1);

    let summaries = repo.quote_summaries().unwrap();
    assert_eq!(summaries.len(), 2);

    let overviews = repo.samurai_overviews().unwrap();
    assert_eq!(overviews.len(), 2);
    let kambei_overview = overviews
        .iter()
        .find(|overview| overview.id == kambei)
        .unwrap();
    assert_eq!(kambei_overview.quote_count, 1);
    assert_eq!(kambei_overview.real_name.as_deref(), Some("Julie"));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteSamuraiRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "PRAGMA user_version = {};",
        dojo_core::db::migrations::latest_version()
    ))
    .unwrap();

    let result = SqliteSamuraiRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("samurais"))
    ));
}
