use dispatch_core::{ChangeEvent, ChangeListener};
use dispatch_order::Reconciler;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Changed(ChangeEvent),
    /// Finish everything queued before this message, then stop
    Shutdown,
}

pub type WorkerSender = UnboundedSender<WorkerMessage>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub passes: u64,
    pub shipped: usize,
    /// Change events folded into an earlier pass instead of triggering their own
    pub coalesced: usize,
}

pub fn channel() -> (WorkerSender, UnboundedReceiver<WorkerMessage>) {
    mpsc::unbounded_channel()
}

/// Provider listener that queues the event for the worker without blocking
pub fn forward_changes(tx: WorkerSender) -> ChangeListener {
    Arc::new(move |event: &ChangeEvent| {
        if tx.send(WorkerMessage::Changed(event.clone())).is_err() {
            debug!(?event, "Reconciliation worker stopped; change dropped");
        }
    })
}

/// Single consumer of change notifications.
///
/// Everything already queued when a message is received is folded into one
/// pass, so bursts of restocks or orders cost a single reconciliation.
pub async fn run_reconciliation_worker(
    reconciler: Arc<Reconciler>,
    mut rx: UnboundedReceiver<WorkerMessage>,
    json_events: bool,
) -> WorkerSummary {
    info!("Reconciliation worker started, listening for inventory and order changes...");
    let mut summary = WorkerSummary::default();

    while let Some(message) = rx.recv().await {
        let mut batch = vec![message];
        while let Ok(more) = rx.try_recv() {
            batch.push(more);
        }

        let shutdown = batch.iter().any(|m| matches!(m, WorkerMessage::Shutdown));
        let triggers = batch
            .iter()
            .filter(|m| matches!(m, WorkerMessage::Changed(e) if e.may_enable_shipments()))
            .count();

        if triggers > 0 {
            debug!(triggers, "Inventory or order book updated - checking shippable orders");
            // A pass holds blocking locks for its whole duration
            let pass = reconciler.clone();
            match tokio::task::spawn_blocking(move || pass.reconcile()).await {
                Ok(report) => {
                    summary.passes += 1;
                    summary.shipped += report.shipped.len();
                    summary.coalesced += triggers - 1;

                    if json_events {
                        match serde_json::to_string(&report.to_event()) {
                            Ok(json) => info!(target: "dispatch_events", "{}", json),
                            Err(e) => debug!(error = %e, "Failed to encode reconciliation event"),
                        }
                    }
                }
                Err(e) => error!(error = %e, "Reconciliation pass panicked"),
            }
        }

        if shutdown {
            break;
        }
    }

    info!(passes = summary.passes, shipped = summary.shipped, "Reconciliation worker stopped");
    summary
}
