use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection facts supplied by the related database dependency.
///
/// These are read-only inputs to the engine and are never written to
/// durable state; only the fingerprint of what was applied is persisted.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelationEndpoint {
    pub host: String,

    /// TOML: `relation.port`. Default: `5432`.
    #[serde(default = "default_port")]
    pub port: u16,

    pub admin_user: String,
    pub admin_password: String,

    /// Database provisioned for us by the dependency.
    pub database: String,
}

// Manual Debug so the admin password never lands in logs.
impl fmt::Debug for RelationEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

fn default_port() -> u16 {
    5432
}
