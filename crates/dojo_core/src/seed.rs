//! Idempotent sample-data bootstrap.
//!
//! # Responsibility
//! - Insert the fixed roster dataset exactly once per store.
//!
//! # Invariants
//! - A store that already holds any root is left untouched.
//! - After one successful run the store holds 3 roots, 3 quotes and 1
//!   secret identity.

use crate::context::SamuraiContext;
use crate::model::samurai::SamuraiAggregate;
use crate::repo::samurai_repo::RepoResult;
use log::info;

/// Seeds the fixed roster dataset through the given context.
///
/// Returns `true` when data was written, `false` when the store was already
/// populated (no-op, not an error).
pub fn seed(ctx: &mut SamuraiContext) -> RepoResult<bool> {
    if ctx.count_samurais()? > 0 {
        info!("event=seed module=seed status=skip reason=already_populated");
        return Ok(false);
    }

    ctx.add_samurai(
        SamuraiAggregate::named("Kambei Shimada").with_quote("I've come to save you"),
    )?;
    ctx.add_samurai(
        SamuraiAggregate::named("Kyūzō")
            .with_quote("Watch out for my sharp sword!")
            .with_quote("I told you to watch out for the sharp sword! Oh well!"),
    )?;
    // Trailing space in the name is part of the canonical dataset.
    ctx.add_samurai(SamuraiAggregate::named("Shichirōji ").with_secret_identity("Julie"))?;

    let written = ctx.save_changes()?;
    info!("event=seed module=seed status=ok written={written}");
    Ok(true)
}
