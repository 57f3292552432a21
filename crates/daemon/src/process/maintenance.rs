use std::time::Duration;

use chrono::Utc;
use common::prelude::NodeStore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::ServiceState;

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub owners: usize,
    pub purged: usize,
    pub sweeps_queued: usize,
}

/// Erase expired trash for every owner, then queue a reconciliation sweep
/// for each of them on the cascade worker.
///
/// A failure for one owner is logged and does not stop the others.
pub async fn run_once(state: &ServiceState) -> anyhow::Result<MaintenanceReport> {
    let engine = state.engine();
    let owners = engine.store().list_owners().await?;
    let now = Utc::now();

    let mut report = MaintenanceReport {
        owners: owners.len(),
        ..Default::default()
    };

    for owner in owners {
        match engine.purge_expired(&owner, now).await {
            Ok(purged) => report.purged += purged,
            Err(e) => tracing::warn!(owner = %owner, error = %e, "trash purge failed"),
        }
        match engine.request_sweep(owner.clone()) {
            Ok(()) => report.sweeps_queued += 1,
            Err(e) => tracing::warn!(owner = %owner, error = %e, "failed to queue sweep"),
        }
    }

    Ok(report)
}

/// Run [`run_once`] every `interval` until shutdown is signalled.
pub async fn run_loop(state: ServiceState, interval: Duration, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately; let startup settle first
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_once(&state).await {
                    Ok(report) => tracing::info!(
                        owners = report.owners,
                        purged = report.purged,
                        sweeps = report.sweeps_queued,
                        "maintenance pass finished"
                    ),
                    Err(e) => tracing::error!("maintenance pass failed: {}", e),
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }

    tracing::info!("maintenance loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceConfig;
    use common::engine::ops::LifecycleRequest;
    use common::prelude::{Node, UserId};

    #[tokio::test]
    async fn test_run_once_purges_expired_trash() {
        let mut config = ServiceConfig::default();
        config.engine.trash_retention_days = 0;
        let (state, _receiver) = ServiceState::from_config(&config).await.unwrap();
        let engine = state.engine();

        let owner = UserId::from("alice");
        let root = engine.store().root_folder(&owner).await.unwrap();
        let file = Node::file(owner.clone(), "old.txt", root.id);
        engine.store().put_node(&file).await.unwrap();

        engine
            .trash(LifecycleRequest {
                node_id: file.id,
                is_folder: false,
                actor: owner.clone(),
                force: false,
            })
            .await
            .unwrap();

        let report = run_once(&state).await.unwrap();
        assert_eq!(report.owners, 1);
        assert_eq!(report.purged, 1);
        assert_eq!(report.sweeps_queued, 1);
    }

    #[tokio::test]
    async fn test_run_once_with_no_owners() {
        let (state, _receiver) = ServiceState::from_config(&ServiceConfig::default())
            .await
            .unwrap();
        let report = run_once(&state).await.unwrap();
        assert_eq!(report, MaintenanceReport::default());
    }
}
