use serde::{Deserialize, Serialize};

/// Desired-state table: which dump to apply, to which database/role pair,
/// and how often to forcibly reapply it.
///
/// Any change to these values is delivered to the reconciler as a
/// `ConfigChanged` event; the engine re-evaluates on every change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    /// URL of the SQL dump archive (tar or tar.gz). Empty disables the
    /// reconciler until a URL is configured.
    /// TOML: `reconciler.sql_dump_url`. Default: empty.
    #[serde(default)]
    pub sql_dump_url: String,

    /// Forced-reapply period in minutes. 0 disables the periodic timer;
    /// the dump is then applied once and only reapplied when its content
    /// or the target pair changes.
    /// TOML: `reconciler.refresh_period_minutes`. Default: `0`.
    #[serde(default)]
    pub refresh_period_minutes: u64,

    /// Target database name requested from the relation.
    /// TOML: `reconciler.db_name`. Default: `dumpsync`.
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Role that must end up owning every object the dump creates.
    /// TOML: `reconciler.db_user`. Default: `dumpsync`.
    #[serde(default = "default_db_user")]
    pub db_user: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            sql_dump_url: String::new(),
            refresh_period_minutes: 0,
            db_name: default_db_name(),
            db_user: default_db_user(),
        }
    }
}

impl ReconcilerConfig {
    /// Whether a dump URL has been configured at all.
    pub fn has_dump_url(&self) -> bool {
        !self.sql_dump_url.trim().is_empty()
    }
}

fn default_db_name() -> String {
    "dumpsync".to_string()
}

fn default_db_user() -> String {
    "dumpsync".to_string()
}
