//! External interfaces consumed by the engine: the append-only event store,
//! the game directory, and the push notification channel.

pub mod memory;

use futures::{Stream, StreamExt, future::BoxFuture, stream::BoxStream};
use uuid::Uuid;

use crate::{
    error::StoreResult,
    model::{GameRecord, StatEvent},
};

/// Maximum rows the backing store returns for a single `query_events` call.
///
/// Queries spanning many games can truncate silently at this cap, which is
/// why the batch fetcher issues one bounded query per game id: truncation
/// risk is then limited to a single game's own event volume.
pub const EVENT_ROW_CAP: usize = 1_000;

/// Read-only access to the append-only stat event log.
pub trait EventStore: Send + Sync {
    /// Fetch the events for the given game ids, capped at [`EVENT_ROW_CAP`]
    /// rows per call.
    fn query_events(&self, game_ids: &[Uuid]) -> BoxFuture<'static, StoreResult<Vec<StatEvent>>>;
}

/// Access to game records: status, quarter, clock, and last-known scores.
pub trait GameDirectory: Send + Sync {
    /// Load records for the given ids, preserving input order. Unknown ids
    /// are skipped rather than failing the whole load.
    fn load_games(&self, ids: &[Uuid]) -> BoxFuture<'static, StoreResult<Vec<GameRecord>>>;
}

/// Opaque change notification from the push channel.
///
/// Carries at most a relevance hint, never a diff: any signal means
/// "recompute the full view".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSignal {
    /// Game the change concerns, when the backend knows it. Used only for
    /// subscription filtering, never to compute partial updates.
    pub game_id: Option<Uuid>,
}

/// Live stream of push signals. Dropping the subscription unsubscribes.
pub struct PushSubscription {
    stream: BoxStream<'static, PushSignal>,
}

impl PushSubscription {
    /// Wrap any signal stream.
    pub fn new(stream: impl Stream<Item = PushSignal> + Send + 'static) -> Self {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Next signal, or `None` once the channel has closed or errored out.
    pub async fn recv(&mut self) -> Option<PushSignal> {
        self.stream.next().await
    }
}

/// Server-initiated notification channel for stat changes on a set of games.
pub trait PushChannel: Send + Sync {
    /// Open a subscription filtered to the given game ids.
    fn subscribe(&self, game_ids: &[Uuid]) -> BoxFuture<'static, StoreResult<PushSubscription>>;
}
