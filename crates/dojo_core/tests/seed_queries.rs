use dojo_core::{seed, SamuraiContext};

fn seeded_context() -> SamuraiContext {
    let mut ctx = SamuraiContext::in_memory().unwrap();
    assert!(seed(&mut ctx).unwrap());
    ctx
}

fn id_of(ctx: &SamuraiContext, name: &str) -> i64 {
    ctx.samurai_overviews()
        .unwrap()
        .into_iter()
        .find(|overview| overview.name == name)
        .unwrap_or_else(|| panic!("no root named `{name}`"))
        .id
}

#[test]
fn seed_produces_expected_counts() {
    let ctx = seeded_context();

    assert_eq!(ctx.count_samurais().unwrap(), 3);
    assert_eq!(ctx.count_quotes().unwrap(), 3);
    assert_eq!(ctx.count_samurais_with_identity().unwrap(), 1);
}

#[test]
fn seed_is_idempotent() {
    let mut ctx = seeded_context();

    assert!(!seed(&mut ctx).unwrap());

    assert_eq!(ctx.count_samurais().unwrap(), 3);
    assert_eq!(ctx.count_quotes().unwrap(), 3);
    assert_eq!(ctx.count_samurais_with_identity().unwrap(), 1);
}

#[test]
fn seed_persists_across_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    {
        let mut ctx = SamuraiContext::open(&path).unwrap();
        assert!(seed(&mut ctx).unwrap());
    }

    let mut ctx = SamuraiContext::open(&path).unwrap();
    assert!(!seed(&mut ctx).unwrap());
    assert_eq!(ctx.count_samurais().unwrap(), 3);
    assert_eq!(ctx.count_quotes().unwrap(), 3);
    assert_eq!(ctx.count_samurais_with_identity().unwrap(), 1);
}

#[test]
fn quote_summaries_projection_returns_every_quote() {
    let ctx = seeded_context();

    let summaries = ctx.quote_summaries().unwrap();

    assert_eq!(summaries.len(), 3);
    assert!(summaries
        .iter()
        .any(|summary| summary.text == "I've come to save you"));
    assert!(summaries.iter().all(|summary| summary.id > 0));
}

#[test]
fn overview_projection_folds_in_related_facts() {
    let ctx = seeded_context();

    let overviews = ctx.samurai_overviews().unwrap();

    assert_eq!(overviews.len(), 3);
    let total_quotes: i64 = overviews.iter().map(|overview| overview.quote_count).sum();
    assert_eq!(total_quotes, 3);

    let real_names: Vec<&str> = overviews
        .iter()
        .filter_map(|overview| overview.real_name.as_deref())
        .collect();
    assert_eq!(real_names, vec!["Julie"]);

    let kyuzo = overviews
        .iter()
        .find(|overview| overview.name == "Kyūzō")
        .unwrap();
    assert_eq!(kyuzo.quote_count, 2);
    assert_eq!(kyuzo.real_name, None);
}

#[test]
fn quotes_by_owner_are_nonempty_for_a_root_with_children() {
    let mut ctx = seeded_context();
    let kambei_id = id_of(&ctx, "Kambei Shimada");

    let quotes = ctx.quotes_by_samurai(kambei_id).unwrap();

    assert!(!quotes.is_empty());
    assert!(quotes
        .iter()
        .all(|quote| quote.borrow().samurai_id == Some(kambei_id)));
}

#[test]
fn finding_a_missing_root_returns_none() {
    let mut ctx = seeded_context();

    assert!(ctx.find_samurai(9_999).unwrap().is_none());
}
