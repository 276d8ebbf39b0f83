//! Batch fetcher: complete, untruncated event sets via bounded per-game
//! queries with per-game failure isolation.

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::{StreamExt, stream};
use tokio::time::timeout;
use tracing::warn;

use crate::{model::GameRecord, store::EventStore};
use crate::model::StatEvent;

/// Outcome of one game's event fetch.
#[derive(Debug)]
pub(crate) enum FetchOutcome {
    /// Full event set for the game.
    Events(Vec<StatEvent>),
    /// Fetch failed or timed out; fall back to the record's last-known score.
    Degraded,
}

/// One game's record paired with its fetch outcome.
#[derive(Debug)]
pub(crate) struct GameFetch {
    pub(crate) record: GameRecord,
    pub(crate) outcome: FetchOutcome,
}

/// Issues one bounded query per game id, fanned out over a small worker pool.
///
/// A single cross-game query can truncate at the server row cap before any
/// individual game's events are fully returned; per-game queries bound the
/// truncation risk to a single game's own volume.
pub(crate) struct BatchFetcher {
    store: Arc<dyn EventStore>,
    concurrency: usize,
    fetch_timeout: Duration,
}

impl BatchFetcher {
    pub(crate) fn new(store: Arc<dyn EventStore>, concurrency: usize, fetch_timeout: Duration) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
            fetch_timeout,
        }
    }

    /// Fetch the event set for every game, preserving input order.
    ///
    /// A failed or timed-out fetch degrades that one game without aborting
    /// its siblings.
    pub(crate) async fn fetch_events(&self, records: Vec<GameRecord>) -> Vec<GameFetch> {
        if records.is_empty() {
            return Vec::new();
        }

        let ids = records.iter().map(|record| record.id).collect::<Vec<_>>();
        let mut outcomes: HashMap<_, _> = stream::iter(ids)
            .map(|game_id| {
                let store = self.store.clone();
                let limit = self.fetch_timeout;
                async move {
                    let outcome = match timeout(limit, store.query_events(&[game_id])).await {
                        Ok(Ok(events)) => FetchOutcome::Events(events),
                        Ok(Err(err)) => {
                            warn!(
                                game_id = %game_id,
                                error = %err,
                                "event fetch failed; falling back to last-known score"
                            );
                            FetchOutcome::Degraded
                        }
                        Err(_) => {
                            warn!(
                                game_id = %game_id,
                                "event fetch timed out; falling back to last-known score"
                            );
                            FetchOutcome::Degraded
                        }
                    };
                    (game_id, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        records
            .into_iter()
            .map(|record| {
                let outcome = outcomes
                    .remove(&record.id)
                    .unwrap_or(FetchOutcome::Degraded);
                GameFetch { record, outcome }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StoreResult,
        model::{StatModifier, StatType},
        store::memory::MemoryStore,
    };
    use futures::future::BoxFuture;
    use uuid::Uuid;

    fn fetcher(store: Arc<dyn EventStore>) -> BatchFetcher {
        BatchFetcher::new(store, 4, Duration::from_secs(10))
    }

    fn seeded_game(store: &MemoryStore, events: u32) -> GameRecord {
        let record = GameRecord::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.upsert_game(record.clone());
        for _ in 0..events {
            store.record_event(
                StatEvent::new(
                    record.id,
                    Some(record.team_a_id),
                    StatType::FieldGoal,
                    Some(StatModifier::Made),
                    2,
                    false,
                ),
                None,
            );
        }
        record
    }

    #[tokio::test]
    async fn failed_game_degrades_without_affecting_siblings() {
        let store = Arc::new(MemoryStore::new());
        let healthy = seeded_game(&store, 3);
        let broken = seeded_game(&store, 2);
        store.set_fetch_failing(broken.id, true);

        let fetches = fetcher(store.clone())
            .fetch_events(vec![healthy.clone(), broken.clone()])
            .await;

        assert!(matches!(&fetches[0].outcome, FetchOutcome::Events(events) if events.len() == 3));
        assert!(matches!(fetches[1].outcome, FetchOutcome::Degraded));
    }

    #[tokio::test]
    async fn results_preserve_input_order_despite_unordered_completion() {
        let store = Arc::new(MemoryStore::new());
        let games = (0..5).map(|i| seeded_game(&store, i)).collect::<Vec<_>>();
        let expected = games.iter().map(|record| record.id).collect::<Vec<_>>();

        let fetches = fetcher(store.clone()).fetch_events(games).await;
        let actual = fetches
            .iter()
            .map(|fetch| fetch.record.id)
            .collect::<Vec<_>>();
        assert_eq!(actual, expected);
    }

    struct HangingStore;

    impl EventStore for HangingStore {
        fn query_events(
            &self,
            _game_ids: &[Uuid],
        ) -> BoxFuture<'static, StoreResult<Vec<StatEvent>>> {
            Box::pin(futures::future::pending())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_fetch_times_out_and_degrades() {
        let record = GameRecord::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let fetches = fetcher(Arc::new(HangingStore))
            .fetch_events(vec![record])
            .await;

        assert!(matches!(fetches[0].outcome, FetchOutcome::Degraded));
    }

    #[tokio::test]
    async fn empty_game_set_short_circuits() {
        let store = Arc::new(MemoryStore::new());
        assert!(fetcher(store).fetch_events(Vec::new()).await.is_empty());
    }
}
