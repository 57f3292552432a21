use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use super::task::CascadeTask;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("cascade receiver has been dropped")]
    ReceiverDropped,
}

/// Count of dispatched-but-unfinished tasks.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub(crate) fn current(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Cascade dispatcher that can be cloned and shared across tasks
///
/// This is a lightweight handle; cloning it shares the same channel
/// and in-flight counter.
#[derive(Debug, Clone)]
pub struct CascadeDispatcher {
    tx: flume::Sender<CascadeTask>,
    in_flight: Arc<InFlight>,
}

impl CascadeDispatcher {
    /// Create a new dispatcher and receiver pair
    ///
    /// The receiver should be handed to a [`CascadeWorker`](super::CascadeWorker).
    pub fn new() -> (Self, CascadeReceiver) {
        let (tx, rx) = flume::unbounded();
        let in_flight = Arc::new(InFlight::default());
        (
            Self {
                tx,
                in_flight: in_flight.clone(),
            },
            CascadeReceiver { rx, in_flight },
        )
    }

    /// Queue a task for the background worker
    ///
    /// This never blocks and succeeds unless the receiver has been dropped.
    pub fn dispatch(&self, task: CascadeTask) -> Result<(), DispatchError> {
        tracing::debug!(
            kind = task.kind(),
            root = ?task.subtree_root(),
            "dispatching cascade"
        );
        self.in_flight.begin();
        self.tx.send(task).map_err(|_| {
            self.in_flight.finish();
            DispatchError::ReceiverDropped
        })
    }

    /// Number of tasks queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    /// Wait until every dispatched task has finished, including tasks
    ///  dispatched by other tasks while waiting.
    pub async fn wait_idle(&self) {
        self.in_flight.wait_idle().await
    }
}

/// Receiving half, consumed by the worker loop.
#[derive(Debug)]
pub struct CascadeReceiver {
    rx: flume::Receiver<CascadeTask>,
    pub(crate) in_flight: Arc<InFlight>,
}

impl CascadeReceiver {
    /// Wait for the next task. `None` once every dispatcher is dropped.
    pub async fn recv(&self) -> Option<CascadeTask> {
        self.rx.recv_async().await.ok()
    }

    /// Take a task if one is queued, without waiting.
    pub fn try_recv(&self) -> Option<CascadeTask> {
        self.rx.try_recv().ok()
    }
}
