//! In-memory backend implementing every trait the engine consumes: an
//! append-only event log, game records, per-player running lines, and a
//! broadcast push hub. Backs the demo binary and the test suite.

use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
};

use dashmap::{DashMap, DashSet};
use futures::{FutureExt, StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    milestone::{Milestone, detect_new_milestones},
    model::{GameRecord, PlayerCumulativeStats, StatEvent},
    store::{
        EVENT_ROW_CAP, EventStore, GameDirectory, PushChannel, PushSignal, PushSubscription,
    },
};
use futures::future::BoxFuture;

/// Capacity of the push hub. Laggy subscribers coalesce missed notifications
/// into a single full-recompute signal instead of erroring out.
const HUB_CAPACITY: usize = 64;

/// In-memory store, directory, and push channel in one.
pub struct MemoryStore {
    events: DashMap<Uuid, Vec<StatEvent>>,
    games: DashMap<Uuid, GameRecord>,
    player_lines: DashMap<(Uuid, Uuid), PlayerCumulativeStats>,
    failing_fetches: DashSet<Uuid>,
    reject_subscriptions: AtomicBool,
    hub: broadcast::Sender<PushSignal>,
}

impl MemoryStore {
    /// Empty store with a fresh push hub.
    pub fn new() -> Self {
        let (hub, _receiver) = broadcast::channel(HUB_CAPACITY);
        Self {
            events: DashMap::new(),
            games: DashMap::new(),
            player_lines: DashMap::new(),
            failing_fetches: DashSet::new(),
            reject_subscriptions: AtomicBool::new(false),
            hub,
        }
    }

    /// Insert or replace a game record and notify subscribers.
    pub fn upsert_game(&self, record: GameRecord) {
        let id = record.id;
        self.games.insert(id, record);
        self.notify(Some(id));
    }

    /// Append one stat event and notify subscribers.
    ///
    /// When a player is attributed, the player's running line is advanced and
    /// the milestones newly crossed by this event are returned, highest
    /// priority first — the synchronous detection path of the recording
    /// workflow.
    pub fn record_event(&self, event: StatEvent, player_id: Option<Uuid>) -> Vec<Milestone> {
        let game_id = event.game_id;

        let milestones = match player_id {
            Some(player) => {
                let mut line = self
                    .player_lines
                    .entry((game_id, player))
                    .or_default();
                let before = *line;
                let after = before.apply(&event);
                *line = after;
                drop(line);
                detect_new_milestones(&before, &after)
            }
            None => Vec::new(),
        };

        self.events.entry(game_id).or_default().push(event);
        self.notify(Some(game_id));
        milestones
    }

    /// Running line for a player in a game; zeros when nothing is recorded.
    pub fn player_line(&self, game_id: Uuid, player_id: Uuid) -> PlayerCumulativeStats {
        self.player_lines
            .get(&(game_id, player_id))
            .map(|line| *line)
            .unwrap_or_default()
    }

    /// Make `query_events` fail for one game, exercising per-game isolation.
    pub fn set_fetch_failing(&self, game_id: Uuid, failing: bool) {
        if failing {
            self.failing_fetches.insert(game_id);
        } else {
            self.failing_fetches.remove(&game_id);
        }
    }

    /// Reject new push subscriptions, forcing the polling fallback.
    pub fn set_push_rejected(&self, rejected: bool) {
        self.reject_subscriptions.store(rejected, Ordering::SeqCst);
    }

    fn notify(&self, game_id: Option<Uuid>) {
        let _ = self.hub.send(PushSignal { game_id });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryStore {
    fn query_events(&self, game_ids: &[Uuid]) -> BoxFuture<'static, StoreResult<Vec<StatEvent>>> {
        let mut rows = Vec::new();
        let mut failed = None;
        for id in game_ids {
            if self.failing_fetches.contains(id) {
                failed = Some(StoreError::Unavailable(format!(
                    "events for game `{id}` unavailable"
                )));
                break;
            }
            if let Some(events) = self.events.get(id) {
                rows.extend(events.iter().cloned());
            }
        }

        // The real backend truncates silently at the row cap; mirror that so
        // truncation behavior is exercised in tests.
        rows.truncate(EVENT_ROW_CAP);

        let result = match failed {
            Some(err) => Err(err),
            None => Ok(rows),
        };
        async move { result }.boxed()
    }
}

impl GameDirectory for MemoryStore {
    fn load_games(&self, ids: &[Uuid]) -> BoxFuture<'static, StoreResult<Vec<GameRecord>>> {
        let records = ids
            .iter()
            .filter_map(|id| self.games.get(id).map(|record| record.clone()))
            .collect::<Vec<_>>();
        async move { Ok(records) }.boxed()
    }
}

impl PushChannel for MemoryStore {
    fn subscribe(&self, game_ids: &[Uuid]) -> BoxFuture<'static, StoreResult<PushSubscription>> {
        if self.reject_subscriptions.load(Ordering::SeqCst) {
            return async {
                Err(StoreError::SubscriptionRejected(
                    "push channel is disabled".into(),
                ))
            }
            .boxed();
        }

        let relevant: HashSet<Uuid> = game_ids.iter().copied().collect();
        let stream = BroadcastStream::new(self.hub.subscribe()).filter_map(move |item| {
            let signal = match item {
                Ok(signal) if signal.game_id.is_none_or(|id| relevant.contains(&id)) => {
                    Some(signal)
                }
                Ok(_) => None,
                // Missed notifications collapse into one full-recompute signal.
                Err(BroadcastStreamRecvError::Lagged(_)) => Some(PushSignal { game_id: None }),
            };
            future::ready(signal)
        });
        async move { Ok(PushSubscription::new(stream)) }.boxed()
    }
}
