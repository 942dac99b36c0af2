use super::record::{AppliedRecord, ApplyOutcome};
use super::schema::SQLITE_INIT;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

/// Durable tracker for the last-applied record.
///
/// The reconciler is the only writer by construction (single active run),
/// so atomicity only has to hold per `save`, which is one upsert statement.
#[derive(Clone)]
pub struct StateStore {
    pool: SqlitePool,
}

impl StateStore {
    /// Opens (creating if missing) the state database at `database_url`
    /// and initializes the schema.
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;

        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&pool).await?;
        }

        info!(database_url, "state store initialized");
        Ok(Self { pool })
    }

    /// Returns the persisted record, or `None` if nothing was ever applied.
    pub async fn load(&self) -> Result<Option<AppliedRecord>, sqlx::Error> {
        let row: Option<(String, String, String, DateTime<Utc>, i64)> = sqlx::query_as(
            r#"
        SELECT artifact_fingerprint, applied_db_name, applied_db_user, applied_at, outcome
        FROM applied_record
        WHERE id = 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(artifact_fingerprint, applied_db_name, applied_db_user, applied_at, outcome)| {
                AppliedRecord {
                    artifact_fingerprint,
                    applied_db_name,
                    applied_db_user,
                    applied_at,
                    outcome: ApplyOutcome::from_db(outcome),
                }
            },
        ))
    }

    /// Overwrites the record. A single upsert, so a concurrent `load` sees
    /// either the old or the new record, never a partial one.
    pub async fn save(&self, record: &AppliedRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
        INSERT INTO applied_record (
            id, artifact_fingerprint, applied_db_name, applied_db_user, applied_at, outcome
        )
        VALUES (1, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            artifact_fingerprint = excluded.artifact_fingerprint,
            applied_db_name = excluded.applied_db_name,
            applied_db_user = excluded.applied_db_user,
            applied_at = excluded.applied_at,
            outcome = excluded.outcome
        "#,
        )
        .bind(&record.artifact_fingerprint)
        .bind(&record.applied_db_name)
        .bind(&record.applied_db_user)
        .bind(record.applied_at)
        .bind(record.outcome.to_db())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
