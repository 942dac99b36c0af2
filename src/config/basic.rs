use serde::{Deserialize, Serialize};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// SQLite URL for the persisted applied-record state.
    /// TOML: `basic.state_url`. Default: `sqlite://dumpsync-state.db`.
    #[serde(default = "default_state_url")]
    pub state_url: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
            state_url: default_state_url(),
        }
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_state_url() -> String {
    "sqlite://dumpsync-state.db".to_string()
}
