use super::engine::{Decision, RunContext, RunInputs, RunOutcome, Trigger, decide, execute_run};
use super::status::ReconcileStatus;
use crate::apply::SqlApplier;
use crate::config::{ReconcilerConfig, RelationEndpoint};
use crate::error::DumpsyncError;
use crate::fetch::Fetcher;
use crate::state::StateStore;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Public messages handled by the reconciler actor.
#[derive(Debug)]
pub enum ReconcilerMessage {
    /// The database dependency published (new) connection facts.
    RelationEstablished(RelationEndpoint),

    /// The database dependency went away; nothing can be applied until it
    /// returns.
    RelationBroken,

    /// The desired state changed; re-evaluate and re-arm the timer.
    ConfigChanged(ReconcilerConfig),

    /// Periodic forced reapply (armed only while the timer is active).
    ScheduledTick,

    /// Operator-requested forced reapply.
    ManualTrigger,

    // Internal: the spawned run task finished.
    RunComplete(RunOutcome),
}

/// Handle for feeding events to the reconciler and observing its status.
#[derive(Clone)]
pub struct ReconcilerHandle {
    actor: ActorRef<ReconcilerMessage>,
    status_rx: watch::Receiver<ReconcileStatus>,
}

impl ReconcilerHandle {
    pub fn relation_established(&self, endpoint: RelationEndpoint) -> Result<(), DumpsyncError> {
        ractor::cast!(self.actor, ReconcilerMessage::RelationEstablished(endpoint))
            .map_err(|e| DumpsyncError::Ractor(format!("RelationEstablished cast failed: {e}")))
    }

    pub fn relation_broken(&self) -> Result<(), DumpsyncError> {
        ractor::cast!(self.actor, ReconcilerMessage::RelationBroken)
            .map_err(|e| DumpsyncError::Ractor(format!("RelationBroken cast failed: {e}")))
    }

    pub fn config_changed(&self, desired: ReconcilerConfig) -> Result<(), DumpsyncError> {
        ractor::cast!(self.actor, ReconcilerMessage::ConfigChanged(desired))
            .map_err(|e| DumpsyncError::Ractor(format!("ConfigChanged cast failed: {e}")))
    }

    pub fn manual_trigger(&self) -> Result<(), DumpsyncError> {
        ractor::cast!(self.actor, ReconcilerMessage::ManualTrigger)
            .map_err(|e| DumpsyncError::Ractor(format!("ManualTrigger cast failed: {e}")))
    }

    /// Current consolidated status.
    pub fn status(&self) -> ReconcileStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch-channel receiver for awaiting status transitions.
    pub fn subscribe(&self) -> watch::Receiver<ReconcileStatus> {
        self.status_rx.clone()
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}

/// Everything the actor needs at spawn time.
pub struct ReconcilerArgs {
    pub desired: ReconcilerConfig,
    pub relation: Option<RelationEndpoint>,
    pub store: StateStore,
    pub applier: Arc<dyn SqlApplier>,
    pub fetch_timeout: Duration,
    pub extract_size_limit: u64,
    /// Length of one refresh-period unit. Production runs with one minute;
    /// tests shrink it so tick-driven runs are observable.
    pub refresh_unit: Duration,
}

struct ReconcilerState {
    desired: ReconcilerConfig,
    relation: Option<RelationEndpoint>,
    ctx: RunContext,

    /// Single-active-run invariant: true while a run task is in flight.
    running: bool,
    /// Single-slot coalescing: the strongest trigger seen mid-run, causing
    /// exactly one follow-up run after the current one completes.
    rerun: Option<Trigger>,
    /// Set by RelationBroken; a rejoin then always warrants an apply even
    /// if the fingerprint is unchanged.
    relation_cycled: bool,

    timer: Option<JoinHandle<()>>,
    refresh_unit: Duration,
    status_tx: watch::Sender<ReconcileStatus>,
}

impl ReconcilerState {
    fn publish(&self, status: ReconcileStatus) {
        debug!(status = %status, "status published");
        self.status_tx.send_replace(status);
    }
}

struct ReconcilerActor;

#[ractor::async_trait]
impl Actor for ReconcilerActor {
    type Msg = ReconcilerMessage;
    type State = ReconcilerState;
    type Arguments = (ReconcilerArgs, watch::Sender<ReconcileStatus>);

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        (args, status_tx): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let ctx = RunContext {
            fetcher: Fetcher::new(args.fetch_timeout),
            applier: args.applier,
            store: args.store,
            extract_size_limit: args.extract_size_limit,
        };

        let mut state = ReconcilerState {
            desired: args.desired,
            relation: args.relation,
            ctx,
            running: false,
            rerun: None,
            relation_cycled: false,
            timer: None,
            refresh_unit: args.refresh_unit,
            status_tx,
        };

        rearm_timer(&myself, &mut state);

        // Evaluate the initial desired state the same way any later
        // config delivery is evaluated.
        let initial = state.desired.clone();
        myself
            .cast(ReconcilerMessage::ConfigChanged(initial))
            .map_err(|e| ActorProcessingErr::from(format!("initial evaluation failed: {e}")))?;

        info!(
            dump_url = %state.desired.sql_dump_url,
            refresh_period_minutes = state.desired.refresh_period_minutes,
            db_name = %state.desired.db_name,
            db_user = %state.desired.db_user,
            relation = state.relation.is_some(),
            "Reconciler initialized"
        );
        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ReconcilerMessage::RelationEstablished(endpoint) => {
                let rejoined = state.relation.as_ref() != Some(&endpoint);
                if rejoined {
                    info!(
                        host = %endpoint.host,
                        port = endpoint.port,
                        database = %endpoint.database,
                        "database relation established"
                    );
                }
                state.relation = Some(endpoint);
                rearm_timer(&myself, state);
                self.consider_run(&myself, state, Trigger::RelationEstablished);
            }

            ReconcilerMessage::RelationBroken => {
                info!("database relation broken");
                state.relation = None;
                state.relation_cycled = true;
                rearm_timer(&myself, state);
                if state.running {
                    // The in-flight run is not interrupted; RunComplete
                    // recomputes the status against the missing relation.
                    state.rerun = Some(coalesce(state.rerun.take(), Trigger::ConfigChanged));
                } else {
                    state.publish(ReconcileStatus::WaitingForRelation);
                }
            }

            ReconcilerMessage::ConfigChanged(desired) => {
                if desired != state.desired {
                    info!(
                        dump_url = %desired.sql_dump_url,
                        refresh_period_minutes = desired.refresh_period_minutes,
                        db_name = %desired.db_name,
                        db_user = %desired.db_user,
                        "desired state changed"
                    );
                }
                state.desired = desired;
                rearm_timer(&myself, state);
                self.consider_run(&myself, state, Trigger::ConfigChanged);
            }

            ReconcilerMessage::ScheduledTick => {
                // Spurious ticks can race a disarm; drop them.
                if state.desired.refresh_period_minutes == 0 {
                    debug!("scheduled tick after disarm, ignoring");
                } else {
                    self.consider_run(&myself, state, Trigger::ScheduledTick);
                }
            }

            ReconcilerMessage::ManualTrigger => {
                info!("manual reapply requested");
                self.consider_run(&myself, state, Trigger::Manual);
            }

            ReconcilerMessage::RunComplete(outcome) => {
                self.handle_run_complete(&myself, state, outcome);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        Ok(())
    }
}

impl ReconcilerActor {
    /// Evaluates `trigger` against the current state and either starts a
    /// run, records it for after the in-flight run, or publishes why no
    /// run is warranted.
    fn consider_run(
        &self,
        myself: &ActorRef<ReconcilerMessage>,
        state: &mut ReconcilerState,
        trigger: Trigger,
    ) {
        if state.running {
            debug!(?trigger, "run in flight, coalescing into pending slot");
            state.rerun = Some(coalesce(state.rerun.take(), trigger));
            return;
        }

        match decide(&state.desired, state.relation.as_ref(), trigger) {
            Decision::Skip(status) => state.publish(status),
            Decision::Run { forced } => {
                let inputs = RunInputs {
                    desired: state.desired.clone(),
                    relation: state
                        .relation
                        .clone()
                        .expect("decide only chooses Run with a relation present"),
                    forced: forced || state.relation_cycled,
                };

                state.running = true;
                state.publish(ReconcileStatus::Applying);

                let ctx = state.ctx.clone();
                let myself = myself.clone();
                tokio::spawn(async move {
                    let outcome = execute_run(&ctx, &inputs).await;
                    if let Err(e) = myself.cast(ReconcilerMessage::RunComplete(outcome)) {
                        warn!("actor unreachable, dropping run outcome: {e}");
                    }
                });
            }
        }
    }

    fn handle_run_complete(
        &self,
        myself: &ActorRef<ReconcilerMessage>,
        state: &mut ReconcilerState,
        outcome: RunOutcome,
    ) {
        state.running = false;

        let settled = match outcome {
            RunOutcome::Applied(record) => {
                state.relation_cycled = false;
                info!(fingerprint = %record.artifact_fingerprint, "run complete, dump applied");
                ReconcileStatus::Active
            }
            RunOutcome::Unchanged => {
                info!("run complete, artifact unchanged");
                ReconcileStatus::Active
            }
            RunOutcome::Failed(err) => {
                warn!(stage = err.stage(), error = %err, "run failed");
                ReconcileStatus::Error(err.to_string())
            }
        };

        // The relation or config may have moved while the run was in
        // flight; a waiting condition wins over the run's own result.
        let status = match decide(&state.desired, state.relation.as_ref(), Trigger::ConfigChanged) {
            Decision::Skip(waiting) => waiting,
            Decision::Run { .. } => settled,
        };
        state.publish(status);

        if let Some(trigger) = state.rerun.take() {
            debug!(?trigger, "starting coalesced follow-up run");
            self.consider_run(myself, state, trigger);
        }
    }
}

/// Keep the strongest pending trigger: a forced one is never downgraded.
fn coalesce(pending: Option<Trigger>, incoming: Trigger) -> Trigger {
    match pending {
        Some(t) if t.forces_apply() => t,
        _ => incoming,
    }
}

/// Arms the periodic forced-reapply timer iff a period is configured and a
/// relation is present; disarms it otherwise.
fn rearm_timer(myself: &ActorRef<ReconcilerMessage>, state: &mut ReconcilerState) {
    if let Some(timer) = state.timer.take() {
        timer.abort();
    }

    let minutes = state.desired.refresh_period_minutes;
    if minutes == 0 || state.relation.is_none() {
        debug!("refresh timer disarmed");
        return;
    }

    let period = state
        .refresh_unit
        .saturating_mul(u32::try_from(minutes).unwrap_or(u32::MAX));
    let actor = myself.clone();
    state.timer = Some(tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut ticks = tokio::time::interval_at(start, period);
        loop {
            ticks.tick().await;
            if actor.cast(ReconcilerMessage::ScheduledTick).is_err() {
                break;
            }
        }
    }));
    info!(minutes, "refresh timer armed");
}

/// Spawns the reconciler actor and returns its handle.
pub async fn spawn(args: ReconcilerArgs) -> ReconcilerHandle {
    let (status_tx, status_rx) = watch::channel(ReconcileStatus::WaitingForRelation);

    // Unnamed spawn: ractor's name registry is process-global, so a fixed
    // name would make any second spawn in one process fail with
    // `ActorAlreadyRegistered`. Nothing resolves this actor by name.
    let (actor, _jh) = ractor::Actor::spawn(None, ReconcilerActor, (args, status_tx))
    .await
    .expect("failed to spawn Reconciler");

    ReconcilerHandle { actor, status_rx }
}

#[cfg(test)]
mod tests {
    use super::coalesce;
    use crate::reconciler::Trigger;

    #[test]
    fn coalesce_never_downgrades_a_forced_trigger() {
        assert_eq!(
            coalesce(Some(Trigger::ScheduledTick), Trigger::ConfigChanged),
            Trigger::ScheduledTick
        );
        assert_eq!(
            coalesce(Some(Trigger::ConfigChanged), Trigger::Manual),
            Trigger::Manual
        );
        assert_eq!(coalesce(None, Trigger::ConfigChanged), Trigger::ConfigChanged);
    }
}
