use chrono::{DateTime, Utc};

/// Outcome of the most recent apply attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Success,
    Failed,
}

impl ApplyOutcome {
    pub(crate) fn to_db(self) -> i64 {
        match self {
            ApplyOutcome::Success => 1,
            ApplyOutcome::Failed => 0,
        }
    }

    pub(crate) fn from_db(value: i64) -> Self {
        if value == 1 {
            ApplyOutcome::Success
        } else {
            ApplyOutcome::Failed
        }
    }
}

/// The sole persisted state: identity of the last-applied artifact and
/// target pair. Survives process restarts; never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRecord {
    /// SHA-256 of the fetched archive bytes, lowercase hex.
    pub artifact_fingerprint: String,
    pub applied_db_name: String,
    pub applied_db_user: String,
    pub applied_at: DateTime<Utc>,
    pub outcome: ApplyOutcome,
}

impl AppliedRecord {
    /// Idempotency gate for non-forced triggers: the last run succeeded
    /// against this exact artifact and target pair.
    pub fn matches(&self, fingerprint: &str, db_name: &str, db_user: &str) -> bool {
        self.outcome == ApplyOutcome::Success
            && self.artifact_fingerprint == fingerprint
            && self.applied_db_name == db_name
            && self.applied_db_user == db_user
    }
}
