use anyhow::Context;
use dispatch_catalog::InventoryProvider;
use dispatch_daemon::scenario::Scenario;
use dispatch_daemon::worker::{channel, run_reconciliation_worker, WorkerMessage};
use dispatch_daemon::{AppState, Config};
use dispatch_order::{OrderQueueProvider, ShipmentRecord};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting dispatch daemon");

    let state = AppState::new(&config);

    if config.logging.json_events {
        state.reconciler.executor().subscribe(Arc::new(|record: &ShipmentRecord| {
            match serde_json::to_string(&record.to_event()) {
                Ok(json) => tracing::info!(target: "dispatch_events", "{}", json),
                Err(e) => tracing::warn!("Failed to encode shipment event: {}", e),
            }
        }));
    }

    let (tx, rx) = channel();
    state.connect(tx.clone());
    let worker = tokio::spawn(run_reconciliation_worker(
        state.reconciler.clone(),
        rx,
        config.logging.json_events,
    ));

    let scenario = match &config.scenario.path {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo()?,
    };
    tracing::info!("Replaying scenario with {} steps", scenario.steps.len());
    scenario.apply(&state.inventory, &state.book)?;

    tx.send(WorkerMessage::Shutdown)
        .context("Reconciliation worker exited early")?;
    let summary = worker.await.context("Reconciliation worker panicked")?;

    tracing::info!(
        passes = summary.passes,
        shipped = summary.shipped,
        coalesced = summary.coalesced,
        "Scenario complete"
    );
    tracing::info!(
        stock = ?state.inventory.counts_by_type(),
        pending_orders = state.book.pending_orders().len(),
        "Final state"
    );

    Ok(())
}
