use std::fmt;

/// Consolidated unit status, recomputed on every event and published for
/// the surrounding platform. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// No database relation; nothing can be applied.
    WaitingForRelation,
    /// Relation present but no dump URL configured.
    WaitingForConfig,
    /// A reconciliation run is in flight.
    Applying,
    /// Last run completed; database matches the configured dump.
    Active,
    /// Last run failed; reason carries the originating stage's error.
    Error(String),
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStatus::WaitingForRelation => write!(f, "WaitingForRelation"),
            ReconcileStatus::WaitingForConfig => write!(f, "WaitingForConfig"),
            ReconcileStatus::Applying => write!(f, "Applying"),
            ReconcileStatus::Active => write!(f, "Active"),
            ReconcileStatus::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}
