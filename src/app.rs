//! Application lifecycle: connect, migrate, init, start, serve, stop.

use anyhow::Context;
use bookshelf_db::{migrate, Database};
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

fn registry_for(db: &Database) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(bookshelf_db::create_module(db.clone()));
    modules::register_all(&mut registry, db);
    registry
}

/// Connect the pool, apply pending migrations and initialize every module.
/// The returned registry is ready to be started and mounted.
pub async fn prepare(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let db = Database::connect(&settings.database).await?;
    let registry = registry_for(&db);

    let applied = migrate::run(&db, &registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "migrations up to date");

    registry.init_all(&InitCtx { settings }).await?;
    Ok(registry)
}

/// Run the service until a shutdown signal arrives, then stop every module.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let registry = prepare(settings).await?;
    registry.start_all(&InitCtx { settings }).await?;

    let served = bookshelf_http::start_server(&registry, settings).await;
    let stopped = registry.stop_all().await;

    served?;
    stopped?;
    tracing::info!("bookshelf stopped");
    Ok(())
}

/// Apply pending migrations and exit. Returns how many were applied.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database).await?;
    let registry = registry_for(&db);

    let applied = migrate::run(&db, &registry.collect_migrations()).await;
    db.close().await;
    applied
}
