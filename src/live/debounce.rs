//! Trailing-edge debounce coalescing bursts of "recompute needed" signals
//! into a single refresh per quiet window.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::trace;

/// Cheap cloneable handle used to flag that the live view needs recomputing.
#[derive(Clone)]
pub(crate) struct DirtyHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl DirtyHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<()>) -> Self {
        Self { tx }
    }

    /// Signal that a recompute is needed. Never blocks; signals arriving after
    /// the coordinator is torn down are silently dropped.
    pub(crate) fn mark_dirty(&self) {
        let _ = self.tx.send(());
    }
}

/// Owner of the debounce task.
///
/// Each dirty signal re-arms the window; when the window elapses without a
/// new signal, exactly one unit is pushed into the fire channel. Dropping the
/// coordinator cancels any pending window without firing it.
pub(crate) struct RefreshCoordinator {
    dirty_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl RefreshCoordinator {
    /// Spawn the coordinator with the given window.
    ///
    /// The fire channel is bounded at capacity 1 by the caller, so a recompute
    /// already in flight absorbs additional fires instead of queueing them.
    pub(crate) fn spawn(window: Duration, fire_tx: mpsc::Sender<()>) -> Self {
        let (dirty_tx, mut dirty_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while dirty_rx.recv().await.is_some() {
                let mut deadline = Instant::now() + window;
                loop {
                    tokio::select! {
                        more = dirty_rx.recv() => match more {
                            Some(()) => deadline = Instant::now() + window,
                            None => return,
                        },
                        _ = sleep_until(deadline) => {
                            if fire_tx.try_send(()).is_err() {
                                trace!("recompute already pending; folding refresh into it");
                            }
                            break;
                        }
                    }
                }
            }
        });

        Self { dirty_tx, task }
    }

    /// Handle for signal producers.
    pub(crate) fn handle(&self) -> DirtyHandle {
        DirtyHandle::new(self.dirty_tx.clone())
    }
}

impl Drop for RefreshCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}
