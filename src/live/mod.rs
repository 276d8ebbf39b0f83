//! Live engine wiring: transport signals are debounced into recompute cycles
//! that batch-fetch events, derive scores, and publish a reconciled view.

mod debounce;
mod fetch;
mod reconcile;
mod transport;

use std::sync::Arc;

use indexmap::IndexMap;
use time::OffsetDateTime;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    model::{ConnectionStatus, GameScoreSnapshot, LiveBoard, LiveGameView, ScoreSource},
    score::derive_score,
    store::{EventStore, GameDirectory, PushChannel},
};
use self::{
    debounce::RefreshCoordinator,
    fetch::{BatchFetcher, FetchOutcome},
    reconcile::Reconciler,
    transport::TransportManager,
};

/// Owner of the engine's background tasks.
///
/// Dropping the engine (or calling [`LiveScoreEngine::shutdown`]) aborts the
/// transport, debounce, and recompute tasks; all timers are cancelled with
/// them and any pending debounce state is discarded.
pub struct LiveScoreEngine {
    transport: JoinHandle<()>,
    recompute: JoinHandle<()>,
    _coordinator: RefreshCoordinator,
}

/// Consumer-facing handle: a pull-based read of the latest reconciled view,
/// the connection status, and a manual forced-refresh escape hatch.
#[derive(Clone)]
pub struct LiveHandle {
    board: watch::Receiver<Arc<LiveBoard>>,
    status: watch::Receiver<ConnectionStatus>,
    refetch_tx: mpsc::Sender<()>,
}

impl LiveHandle {
    /// Latest reconciled view.
    ///
    /// The returned `Arc` stays pointer-identical across calls until a
    /// material change is published, so consumers can compare identities to
    /// skip redundant work.
    pub fn board(&self) -> Arc<LiveBoard> {
        self.board.borrow().clone()
    }

    /// Current connection status of the transport layer.
    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Force a refresh, bypassing the debounce window.
    ///
    /// A recompute already in flight absorbs the request instead of being
    /// restarted.
    pub fn refetch(&self) {
        let _ = self.refetch_tx.try_send(());
    }

    /// Wait for the next material publish and return the new view. Returns
    /// the current view when the engine has shut down.
    pub async fn changed(&mut self) -> Arc<LiveBoard> {
        if self.board.changed().await.is_err() {
            return self.board.borrow().clone();
        }
        self.board.borrow_and_update().clone()
    }

    /// Wait for the next connection status transition and return it.
    pub async fn status_changed(&mut self) -> ConnectionStatus {
        let _ = self.status.changed().await;
        *self.status.borrow_and_update()
    }
}

impl LiveScoreEngine {
    /// Spawn the engine over the given backends for a fixed set of games.
    pub fn spawn(
        store: Arc<dyn EventStore>,
        directory: Arc<dyn GameDirectory>,
        channel: Arc<dyn PushChannel>,
        game_ids: Vec<Uuid>,
        config: EngineConfig,
    ) -> (Self, LiveHandle) {
        let (board_tx, board_rx) = watch::channel(Arc::new(LiveBoard::default()));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        // Capacity 1: a fire that lands while a recompute runs is coalesced.
        let (fire_tx, fire_rx) = mpsc::channel(1);

        let coordinator = RefreshCoordinator::spawn(config.debounce_window, fire_tx.clone());
        let transport = TransportManager::new(
            channel,
            game_ids.clone(),
            config.clone(),
            coordinator.handle(),
            status_tx,
        )
        .spawn();

        let fetcher = BatchFetcher::new(store, config.fetch_concurrency, config.fetch_timeout);
        let recompute = tokio::spawn(
            RecomputeLoop {
                directory,
                fetcher,
                game_ids,
                reconciler: Reconciler::new(),
                board_tx,
                fire_rx,
            }
            .run(),
        );

        (
            Self {
                transport,
                recompute,
                _coordinator: coordinator,
            },
            LiveHandle {
                board: board_rx,
                status: status_rx,
                refetch_tx: fire_tx,
            },
        )
    }

    /// Tear the engine down, cancelling all timers and in-flight work.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for LiveScoreEngine {
    fn drop(&mut self) {
        self.transport.abort();
        self.recompute.abort();
    }
}

/// Consumes coalesced refresh fires and runs full recompute cycles.
struct RecomputeLoop {
    directory: Arc<dyn GameDirectory>,
    fetcher: BatchFetcher,
    game_ids: Vec<Uuid>,
    reconciler: Reconciler,
    board_tx: watch::Sender<Arc<LiveBoard>>,
    fire_rx: mpsc::Receiver<()>,
}

impl RecomputeLoop {
    async fn run(mut self) {
        while self.fire_rx.recv().await.is_some() {
            self.recompute_once().await;
        }
    }

    /// One full cycle: load records, fetch events per game, derive scores,
    /// merge live fields, reconcile, publish only on material change.
    async fn recompute_once(&mut self) {
        let records = match self.directory.load_games(&self.game_ids).await {
            Ok(records) => records,
            Err(err) => {
                // Keep serving the previous view; the next trigger retries.
                warn!(error = %err, "failed to load game records; keeping previous view");
                return;
            }
        };

        let computed_at = OffsetDateTime::now_utc();
        let fetches = self.fetcher.fetch_events(records).await;

        let mut games = IndexMap::with_capacity(fetches.len());
        for fetch in fetches {
            let record = fetch.record;
            let (score, source) = match fetch.outcome {
                FetchOutcome::Events(events) => (
                    derive_score(&events, record.team_a_id, record.team_b_id),
                    ScoreSource::Derived,
                ),
                FetchOutcome::Degraded => (record.last_known_score, ScoreSource::LastKnown),
            };
            let snapshot = GameScoreSnapshot {
                game_id: record.id,
                score,
                computed_at,
            };
            games.insert(record.id, LiveGameView::merge(&record, snapshot, source));
        }

        let next = self.reconciler.reconcile(LiveBoard { games });
        let published = self.board_tx.send_if_modified(|current| {
            if Arc::ptr_eq(current, &next) {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        debug!(published, "recompute cycle finished");
    }
}
