use std::time::Duration;

use dagstream_core::types::{Dag, StateFrame};
use dagstream_hub::{HubError, HubHandle};
use tokio::{
    sync::watch,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Publishes the current DAG as a `state` frame on a fixed cadence.
pub struct DagProducer {
    hub: HubHandle,
    period: Duration,
    dag: Dag,
}

impl DagProducer {
    pub fn new(hub: HubHandle, period: Duration, dag: Dag) -> Self {
        if !dag.is_closed() {
            warn!("DAG has edges to unknown nodes, the graph view will drop them");
        }
        Self { hub, period, dag }
    }

    /// Tick until `shutdown` flips to `true` or the hub goes away.
    ///
    /// The first frame goes out one period after start, not immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = self.period.as_millis() as u64, "DAG producer started");

        let mut tick = interval_at(Instant::now() + self.period, self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let frame = StateFrame::new(self.dag.clone());

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let payload = match frame.to_json() {
                        Ok(p) => p,
                        Err(e) => {
                            error!(error = %e, "state frame serialization failed");
                            continue;
                        }
                    };
                    match self.hub.publish(payload).await {
                        Ok(()) => debug!("state frame published"),
                        Err(HubError::Closed) => {
                            info!("hub closed, DAG producer stopping");
                            break;
                        }
                        Err(e) => error!(error = %e, "publish failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("DAG producer shutting down");
                        break;
                    }
                }
            }
        }
    }
}
