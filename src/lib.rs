pub mod apply;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod reconciler;
pub mod state;

pub use error::DumpsyncError;
