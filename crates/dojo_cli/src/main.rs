//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `dojo_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use dojo_core::{seed, SamuraiContext};

fn main() {
    println!("dojo_core version={}", dojo_core::core_version());

    let mut ctx = match SamuraiContext::in_memory() {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("failed to open in-memory store: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = smoke(&mut ctx) {
        eprintln!("smoke run failed: {err}");
        std::process::exit(1);
    }
}

fn smoke(ctx: &mut SamuraiContext) -> Result<(), dojo_core::RepoError> {
    let seeded = seed(ctx)?;
    println!("seeded={seeded}");
    println!("samurais={}", ctx.count_samurais()?);
    println!("quotes={}", ctx.count_quotes()?);
    println!("secret_identities={}", ctx.count_samurais_with_identity()?);
    Ok(())
}
