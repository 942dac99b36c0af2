use dumpsync::apply::PgApplier;
use dumpsync::config::Config;
use dumpsync::extract::DEFAULT_SIZE_LIMIT;
use dumpsync::reconciler::{ReconcilerArgs, ReconcilerHandle};
use dumpsync::state::StateStore;
use mimalloc::MiMalloc;
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_default_file()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        state_url = %cfg.basic.state_url,
        loglevel = %cfg.basic.loglevel,
        dump_url = %cfg.reconciler.sql_dump_url,
        refresh_period_minutes = cfg.reconciler.refresh_period_minutes,
        db_name = %cfg.reconciler.db_name,
        db_user = %cfg.reconciler.db_user,
        relation = cfg.relation.is_some(),
    );

    let store = StateStore::open(&cfg.basic.state_url).await?;
    let applier = Arc::new(PgApplier::new(
        Duration::from_secs(10),
        Duration::from_secs(600),
    ));

    let handle = dumpsync::reconciler::spawn(ReconcilerArgs {
        desired: cfg.reconciler.clone(),
        relation: cfg.relation.clone(),
        store,
        applier,
        fetch_timeout: Duration::from_secs(120),
        extract_size_limit: DEFAULT_SIZE_LIMIT,
        refresh_unit: Duration::from_secs(60),
    })
    .await;

    // Config and relation changes arrive by rewriting config.toml and
    // signalling SIGHUP; the loop converts each reload into events.
    #[cfg(unix)]
    tokio::spawn(reload_on_sighup(handle.clone()));

    shutdown_signal().await;
    handle.stop();
    info!("Reconciler has shut down gracefully.");
    Ok(())
}

#[cfg(unix)]
async fn reload_on_sighup(handle: ReconcilerHandle) {
    let mut hangup = signal::unix::signal(signal::unix::SignalKind::hangup())
        .expect("failed to install SIGHUP handler");

    while hangup.recv().await.is_some() {
        match Config::from_default_file() {
            Ok(cfg) => {
                info!("SIGHUP received, reloading configuration");
                if let Err(e) = handle.config_changed(cfg.reconciler) {
                    warn!(error = %e, "failed to deliver config change");
                }
                let relation_event = match cfg.relation {
                    Some(endpoint) => handle.relation_established(endpoint),
                    None => handle.relation_broken(),
                };
                if let Err(e) = relation_event {
                    warn!(error = %e, "failed to deliver relation change");
                }
            }
            Err(e) => warn!(error = %e, "config reload failed, keeping previous state"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { /* ... */ },
        _ = terminate => { /* ... */ },
    }
}
