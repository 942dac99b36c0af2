//! Decision core and run pipeline.
//!
//! `decide` is pure logic (no IO, no locks); the actor logs and publishes
//! at its boundary. `execute_run` is the Fetch → Extract → Apply → Save
//! pipeline executed inside the single active run.

use crate::apply::{ApplyTarget, SqlApplier};
use crate::config::{ReconcilerConfig, RelationEndpoint};
use crate::error::{ConfigError, DumpsyncError, FetchError};
use crate::extract::extract_sql_files;
use crate::fetch::Fetcher;
use crate::state::{AppliedRecord, ApplyOutcome, StateStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::status::ReconcileStatus;

/// What woke the engine up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    RelationEstablished,
    ConfigChanged,
    ScheduledTick,
    Manual,
}

impl Trigger {
    /// Forced triggers bypass the fingerprint-match skip; they exist to
    /// rewrite data unconditionally.
    pub fn forces_apply(self) -> bool {
        matches!(self, Trigger::ScheduledTick | Trigger::Manual)
    }
}

/// Outcome of `decide`: either a run is warranted, or the status that
/// explains why not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(ReconcileStatus),
    Run { forced: bool },
}

/// Whether a reconciliation run is warranted right now. An apply attempt
/// only starts when a relation is present and a dump URL is configured.
pub fn decide(
    desired: &ReconcilerConfig,
    relation: Option<&RelationEndpoint>,
    trigger: Trigger,
) -> Decision {
    if relation.is_none() {
        return Decision::Skip(ReconcileStatus::WaitingForRelation);
    }
    if !desired.has_dump_url() {
        return Decision::Skip(ReconcileStatus::WaitingForConfig);
    }
    Decision::Run {
        forced: trigger.forces_apply(),
    }
}

/// Shared collaborators for run execution; cheap to clone into the task
/// that drives one run.
#[derive(Clone)]
pub struct RunContext {
    pub fetcher: Fetcher,
    pub applier: Arc<dyn SqlApplier>,
    pub store: StateStore,
    pub extract_size_limit: u64,
}

/// Snapshot of desired state and relation facts taken when the run starts.
/// Events arriving mid-run do not mutate an in-flight run.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub desired: ReconcilerConfig,
    pub relation: RelationEndpoint,
    pub forced: bool,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Dump applied and the record saved.
    Applied(AppliedRecord),
    /// Fingerprint matched the last successful record; apply skipped.
    Unchanged,
    /// Some stage failed; the previously persisted record is untouched.
    Failed(DumpsyncError),
}

/// One complete reconciliation run. Never panics the caller; every stage
/// error is folded into `RunOutcome::Failed`.
pub async fn execute_run(ctx: &RunContext, inputs: &RunInputs) -> RunOutcome {
    match run_inner(ctx, inputs).await {
        Ok(outcome) => outcome,
        Err(err) => RunOutcome::Failed(err),
    }
}

async fn run_inner(ctx: &RunContext, inputs: &RunInputs) -> Result<RunOutcome, DumpsyncError> {
    let desired = &inputs.desired;
    let url = Url::parse(desired.sql_dump_url.trim()).map_err(ConfigError::InvalidDumpUrl)?;

    // Scratch area lives for this run only; Drop cleans it up on every
    // exit path, including failure.
    let scratch = tempfile::tempdir().map_err(FetchError::Io)?;
    let artifact = ctx.fetcher.fetch(&url, scratch.path()).await?;

    // The URL alone proves nothing; content can change behind it. The
    // fingerprint of the fetched bytes is the idempotency gate.
    if !inputs.forced {
        let prior = ctx.store.load().await?;
        if prior.as_ref().is_some_and(|r| {
            r.matches(&artifact.fingerprint, &desired.db_name, &desired.db_user)
        }) {
            debug!(fingerprint = %artifact.fingerprint, "artifact unchanged, skipping apply");
            return Ok(RunOutcome::Unchanged);
        }
    }

    let archive_path = artifact.path.clone();
    let size_limit = ctx.extract_size_limit;
    let files = tokio::task::spawn_blocking(move || extract_sql_files(&archive_path, size_limit))
        .await
        .map_err(|e| DumpsyncError::Ractor(format!("extract task failed: {e}")))??;

    let target = ApplyTarget {
        db_name: desired.db_name.clone(),
        db_user: desired.db_user.clone(),
    };
    ctx.applier.apply(&inputs.relation, &target, &files).await?;

    let record = AppliedRecord {
        artifact_fingerprint: artifact.fingerprint,
        applied_db_name: target.db_name,
        applied_db_user: target.db_user,
        applied_at: Utc::now(),
        outcome: ApplyOutcome::Success,
    };
    ctx.store.save(&record).await?;

    info!(
        fingerprint = %record.artifact_fingerprint,
        files = files.len(),
        "reconciliation run applied the dump"
    );
    Ok(RunOutcome::Applied(record))
}
