use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};

use super::dispatcher::CascadeReceiver;
use super::task::CascadeTask;

/// Something that knows how to carry out a cascade task.
#[async_trait]
pub trait CascadeRunner: Send + Sync + Clone + 'static {
    async fn run(&self, task: CascadeTask);
}

/// Pulls tasks off the channel and runs up to `concurrency` of them at once.
pub struct CascadeWorker<R> {
    runner: R,
    receiver: CascadeReceiver,
    permits: Arc<Semaphore>,
}

impl<R: CascadeRunner> CascadeWorker<R> {
    pub fn new(runner: R, receiver: CascadeReceiver, concurrency: usize) -> Self {
        Self {
            runner,
            receiver,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Spawn the worker loop onto the current runtime.
    pub fn spawn(self, shutdown_rx: Option<watch::Receiver<()>>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown_rx))
    }

    /// Run the worker loop until every dispatcher is dropped or shutdown is signalled.
    ///
    /// After a shutdown signal the worker keeps taking tasks, including ones
    /// dispatched by running cascades, and returns once nothing is queued or
    /// running.
    pub async fn run(self, shutdown_rx: Option<watch::Receiver<()>>) {
        tracing::info!("cascade worker started");

        let mut shutdown_rx = shutdown_rx;
        let mut draining = false;
        loop {
            let task = if draining {
                tokio::select! {
                    biased;
                    task = self.receiver.recv() => task,
                    _ = self.receiver.in_flight.wait_idle() => None,
                }
            } else if let Some(rx) = shutdown_rx.as_mut() {
                tokio::select! {
                    biased;
                    task = self.receiver.recv() => task,
                    _ = rx.changed() => {
                        draining = true;
                        tracing::info!(
                            in_flight = self.receiver.in_flight.current(),
                            "shutdown requested, draining cascades"
                        );
                        continue;
                    }
                }
            } else {
                self.receiver.recv().await
            };
            let Some(task) = task else {
                break;
            };

            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let runner = self.runner.clone();
            let in_flight = self.receiver.in_flight.clone();
            tokio::spawn(async move {
                let kind = task.kind();
                let root = task.subtree_root();
                tracing::debug!(kind, ?root, "cascade started");
                runner.run(task).await;
                tracing::debug!(kind, ?root, "cascade finished");
                drop(permit);
                in_flight.finish();
            });
        }

        tracing::info!("cascade worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::cascade::CascadeDispatcher;
    use crate::model::UserId;

    /// Records each swept owner; sweeping "parent" queues a sweep of "child".
    #[derive(Clone)]
    struct Recorder {
        dispatcher: CascadeDispatcher,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CascadeRunner for Recorder {
        async fn run(&self, task: CascadeTask) {
            if let CascadeTask::Sweep { owner } = task {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if owner.as_str() == "parent" {
                    self.dispatcher
                        .dispatch(CascadeTask::Sweep {
                            owner: UserId::from("child"),
                        })
                        .unwrap();
                }
                self.seen.lock().push(owner.as_str().to_string());
            }
        }
    }

    fn sweep(owner: &str) -> CascadeTask {
        CascadeTask::Sweep {
            owner: UserId::from(owner),
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_and_follow_up_tasks() {
        let (dispatcher, receiver) = CascadeDispatcher::new();
        let recorder = Recorder {
            dispatcher: dispatcher.clone(),
            seen: Arc::new(Mutex::new(Vec::new())),
        };

        dispatcher.dispatch(sweep("a")).unwrap();
        dispatcher.dispatch(sweep("parent")).unwrap();
        dispatcher.dispatch(sweep("b")).unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        shutdown_tx.send(()).unwrap();

        let handle = CascadeWorker::new(recorder.clone(), receiver, 1).spawn(Some(shutdown_rx));
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let mut seen = recorder.seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "child", "parent"]);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_idle_worker_stops_on_shutdown() {
        let (dispatcher, receiver) = CascadeDispatcher::new();
        let recorder = Recorder {
            dispatcher: dispatcher.clone(),
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = CascadeWorker::new(recorder.clone(), receiver, 2).spawn(Some(shutdown_rx));

        dispatcher.dispatch(sweep("a")).unwrap();
        dispatcher.wait_idle().await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*recorder.seen.lock(), vec!["a"]);
    }
}
