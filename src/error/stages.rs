use thiserror::Error as ThisError;

/// Errors from the artifact fetch stage.
#[derive(Debug, ThisError)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response from the dump URL.
    #[error("fetch failed ({})", .0.as_u16())]
    Status(reqwest::StatusCode),

    #[error("fetch failed: empty response body")]
    EmptyBody,

    #[error("fetch failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the dump extraction stage.
#[derive(Debug, ThisError)]
pub enum ExtractError {
    #[error("corrupt archive: {0}")]
    Corrupt(#[from] std::io::Error),

    /// Cumulative extracted size crossed the archive-bomb guard.
    #[error("extracted size exceeds safety bound of {limit} bytes")]
    SizeLimit { limit: u64 },

    #[error("archive contains no SQL files")]
    NoSqlMembers,
}

/// Errors from the database apply stage.
#[derive(Debug, ThisError)]
pub enum ApplyError {
    #[error("apply failed: database connection: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("apply failed: ensuring role {role:?}: {source}")]
    Role {
        role: String,
        #[source]
        source: sqlx::Error,
    },

    /// A statement file failed; remaining files were not applied.
    #[error("apply failed at file {index} ({file}): {message}")]
    Statement {
        index: usize,
        file: String,
        message: String,
    },
}

/// Errors from configuration validation at run time. A missing URL is not
/// an error here; the engine reports it as a waiting status instead.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid sql-dump-url: {0}")]
    InvalidDumpUrl(#[from] url::ParseError),
}
