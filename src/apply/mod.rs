//! Database applier: replays extracted SQL files, in order, against the
//! target database under the configured owning role.

use crate::config::RelationEndpoint;
use crate::error::ApplyError;
use crate::extract::SqlFile;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

/// Database/role pair the dump must land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyTarget {
    pub db_name: String,
    pub db_user: String,
}

/// Seam between the reconciler and the live database, so the engine is
/// exercisable without a running server.
#[async_trait]
pub trait SqlApplier: Send + Sync {
    /// Applies `files` in the given order. Returns `Ok` only if every file
    /// applied; aborts at the first failure. Partial application is a
    /// possible outcome and is reported, never rolled back here.
    async fn apply(
        &self,
        endpoint: &RelationEndpoint,
        target: &ApplyTarget,
        files: &[SqlFile],
    ) -> Result<(), ApplyError>;
}

/// Production applier over a single sqlx Postgres connection.
pub struct PgApplier {
    connect_timeout: Duration,
    statement_timeout: Duration,
}

impl PgApplier {
    pub fn new(connect_timeout: Duration, statement_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            statement_timeout,
        }
    }

    async fn connect(
        &self,
        endpoint: &RelationEndpoint,
        target: &ApplyTarget,
    ) -> Result<PgConnection, ApplyError> {
        let opts = PgConnectOptions::new()
            .host(&endpoint.host)
            .port(endpoint.port)
            .username(&endpoint.admin_user)
            .password(&endpoint.admin_password)
            .database(&target.db_name);

        let connect = PgConnection::connect_with(&opts);
        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(res) => res.map_err(ApplyError::Connect),
            Err(_) => Err(ApplyError::Connect(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "database connect timed out",
            )))),
        }
    }

    /// Creates the owning role if absent, grants it to the admin user, and
    /// switches the session to it, so every object the dump creates is
    /// owned by the configured role rather than the admin role.
    async fn assume_owning_role(
        conn: &mut PgConnection,
        role: &str,
    ) -> Result<(), ApplyError> {
        let wrap = |source: sqlx::Error| ApplyError::Role {
            role: role.to_string(),
            source,
        };

        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_roles WHERE rolname = $1")
            .bind(role)
            .fetch_optional(&mut *conn)
            .await
            .map_err(wrap)?;

        if exists.is_none() {
            info!(role, "owning role does not exist, creating it");
            // `Executor::execute(conn, raw_sql(..))` rather than
            // `raw_sql(..).execute(conn)`: the latter trips rustc's
            // "implementation of `Executor` is not general enough"
            // higher-ranked lifetime check inside this async call chain.
            Executor::execute(
                &mut *conn,
                sqlx::raw_sql(&format!("CREATE ROLE {} LOGIN", quote_ident(role))),
            )
            .await
            .map_err(wrap)?;
        }

        Executor::execute(
            &mut *conn,
            sqlx::raw_sql(&format!("GRANT {} TO CURRENT_USER", quote_ident(role))),
        )
        .await
        .map_err(wrap)?;
        Executor::execute(
            &mut *conn,
            sqlx::raw_sql(&format!("SET ROLE {}", quote_ident(role))),
        )
        .await
        .map_err(wrap)?;

        Ok(())
    }
}

#[async_trait]
impl SqlApplier for PgApplier {
    async fn apply(
        &self,
        endpoint: &RelationEndpoint,
        target: &ApplyTarget,
        files: &[SqlFile],
    ) -> Result<(), ApplyError> {
        let mut conn = self.connect(endpoint, target).await?;

        Self::assume_owning_role(&mut conn, &target.db_user).await?;

        for (index, file) in files.iter().enumerate() {
            debug!(index, file = %file.name, "applying SQL file");
            // Simple query protocol: a dump file legitimately holds many
            // independent statements. Bounded so a wedged server fails the
            // run instead of hanging it.
            let execute = Executor::execute(&mut conn, sqlx::raw_sql(&file.contents));
            match tokio::time::timeout(self.statement_timeout, execute).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    return Err(ApplyError::Statement {
                        index,
                        file: file.name.clone(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    return Err(ApplyError::Statement {
                        index,
                        file: file.name.clone(),
                        message: format!(
                            "timed out after {}s",
                            self.statement_timeout.as_secs()
                        ),
                    });
                }
            }
        }

        let _ = conn.close().await;
        info!(
            files = files.len(),
            db = %target.db_name,
            role = %target.db_user,
            "dump applied"
        );
        Ok(())
    }
}

/// Double-quote a SQL identifier, doubling embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::quote_ident;

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
