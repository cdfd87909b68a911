use std::collections::HashSet;

use sqlx::PgPool;

/// Schema files applied in order; a name is never reused once shipped.
const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_init_schema",
    sql: include_str!("../../sql/001_init_schema.sql"),
}];

struct Migration {
    name: &'static str,
    sql: &'static str,
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    ensure_ledger(pool).await?;
    let applied = applied_names(pool).await?;

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(m.name))
        .collect();
    if pending.is_empty() {
        tracing::info!(applied = applied.len(), "Schema is up to date");
        return Ok(());
    }

    for migration in &pending {
        apply(pool, migration).await?;
    }
    tracing::info!(count = pending.len(), "Schema migrations applied");
    Ok(())
}

async fn ensure_ledger(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" SERIAL PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn applied_names(pool: &PgPool) -> Result<HashSet<String>, MigrationError> {
    let names: Vec<String> = sqlx::query_scalar(r#"SELECT "name" FROM "_migrations""#)
        .fetch_all(pool)
        .await?;
    Ok(names.into_iter().collect())
}

/// Runs one file and records it in the same transaction.
async fn apply(pool: &PgPool, migration: &Migration) -> Result<(), MigrationError> {
    let failed = |source| MigrationError::Migration {
        name: migration.name.to_string(),
        source,
    };

    tracing::info!(migration = migration.name, "Applying migration");
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(migration.sql)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
        .bind(migration.name)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    tx.commit().await.map_err(failed)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
