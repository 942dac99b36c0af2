mod dumpsync;
mod stages;

pub use dumpsync::DumpsyncError;
pub use stages::{ApplyError, ConfigError, ExtractError, FetchError};
