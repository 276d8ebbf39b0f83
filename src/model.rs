//! Core data model: stat events, game records, derived scores, and the
//! published live view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind of statistical occurrence a [`StatEvent`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    /// Two-point field goal attempt.
    FieldGoal,
    /// Three-point attempt.
    ThreePointer,
    /// Free throw attempt.
    FreeThrow,
    /// Rebound, offensive or defensive.
    Rebound,
    /// Assist.
    Assist,
    /// Steal.
    Steal,
    /// Blocked shot.
    Block,
    /// Turnover.
    Turnover,
    /// Personal foul.
    Foul,
}

/// Qualifier refining a [`StatType`]: shot outcome or rebound side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatModifier {
    /// Shot attempt that scored. Only made events contribute points.
    Made,
    /// Shot attempt that missed.
    Missed,
    /// Offensive rebound.
    Offensive,
    /// Defensive rebound.
    Defensive,
}

/// Immutable record of one statistical occurrence in a game.
///
/// Written only by the external recording workflow; this engine reads the log
/// and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEvent {
    /// Unique event identifier, used to de-duplicate overlapping fetches.
    pub id: Uuid,
    /// Game this event belongs to.
    pub game_id: Uuid,
    /// Team credited with the stat; `None` when attribution is pending.
    pub team_id: Option<Uuid>,
    /// Kind of occurrence.
    pub stat_type: StatType,
    /// Optional qualifier; scoring requires `Some(Made)`.
    pub modifier: Option<StatModifier>,
    /// Non-negative point or count value of the event.
    pub value: u32,
    /// Opponent-attributed mode: the event counts for the opposing side
    /// regardless of `team_id`.
    pub is_opponent_stat: bool,
    /// When the recording workflow persisted the event.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StatEvent {
    /// Fresh event with a random id and the current timestamp.
    pub fn new(
        game_id: Uuid,
        team_id: Option<Uuid>,
        stat_type: StatType,
        modifier: Option<StatModifier>,
        value: u32,
        is_opponent_stat: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            team_id,
            stat_type,
            modifier,
            value,
            is_opponent_stat,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Lifecycle status of a game, sourced directly from the game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Not started yet.
    Scheduled,
    /// Currently being played.
    InProgress,
    /// Finished.
    Completed,
}

/// Game clock position within the current quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    /// Minutes remaining.
    pub minutes: u8,
    /// Seconds remaining.
    pub seconds: u8,
}

/// Point totals for the two sides of one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    /// Points credited to team A.
    pub team_a: u32,
    /// Points credited to team B.
    pub team_b: u32,
}

/// Directory record for one game.
///
/// Status, quarter, and clock are live fields maintained by the external
/// recording workflow, not derived here. `last_known_score` is the fallback
/// aggregate shown when a fresh per-game event fetch fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game identifier.
    pub id: Uuid,
    /// Identifier of team A.
    pub team_a_id: Uuid,
    /// Identifier of team B.
    pub team_b_id: Uuid,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Current quarter, 1-based.
    pub quarter: u8,
    /// Game clock within the quarter.
    pub clock: GameClock,
    /// Last aggregate persisted on the record itself.
    pub last_known_score: TeamScores,
}

impl GameRecord {
    /// Record for a not-yet-started game between two teams.
    pub fn new(id: Uuid, team_a_id: Uuid, team_b_id: Uuid) -> Self {
        Self {
            id,
            team_a_id,
            team_b_id,
            status: GameStatus::Scheduled,
            quarter: 1,
            clock: GameClock {
                minutes: 12,
                seconds: 0,
            },
            last_known_score: TeamScores::default(),
        }
    }
}

/// Where a published score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Freshly derived from the full event log.
    Derived,
    /// The per-game fetch failed; the record's last-known aggregate is shown.
    LastKnown,
}

/// Ephemeral derived score for one game. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GameScoreSnapshot {
    /// Game the snapshot belongs to.
    pub game_id: Uuid,
    /// Derived point totals.
    pub score: TeamScores,
    /// When the derivation ran.
    #[serde(with = "time::serde::rfc3339")]
    pub computed_at: OffsetDateTime,
}

/// One game's entry in the published live view: a derived score snapshot
/// merged with status, quarter, and clock sourced from the game record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveGameView {
    /// Game identifier.
    pub game_id: Uuid,
    /// Point totals for both sides.
    pub score: TeamScores,
    /// Lifecycle status from the record.
    pub status: GameStatus,
    /// Current quarter from the record.
    pub quarter: u8,
    /// Game clock from the record.
    pub clock: GameClock,
    /// Whether the score is fresh or a degraded fallback.
    pub source: ScoreSource,
    /// When the score was computed. Volatile; excluded from change detection.
    #[serde(with = "time::serde::rfc3339")]
    pub computed_at: OffsetDateTime,
}

impl LiveGameView {
    /// Merge a derived snapshot with the live fields of its game record.
    pub fn merge(record: &GameRecord, snapshot: GameScoreSnapshot, source: ScoreSource) -> Self {
        Self {
            game_id: record.id,
            score: snapshot.score,
            status: record.status,
            quarter: record.quarter,
            clock: record.clock,
            source,
            computed_at: snapshot.computed_at,
        }
    }
}

/// The reconciled view over the tracked game set.
///
/// Always handed out as `Arc<LiveBoard>`; the pointer stays identical until a
/// material change is published, so consumers can skip redundant work.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveBoard {
    /// Views keyed by game id, in the order the games were requested.
    pub games: IndexMap<Uuid, LiveGameView>,
}

impl LiveBoard {
    /// View for one game, if it is part of the tracked set.
    pub fn game(&self, id: &Uuid) -> Option<&LiveGameView> {
        self.games.get(id)
    }

    /// Number of tracked games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the board tracks no games.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

/// Public projection of the transport connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Push subscription is live.
    Connected,
    /// A subscription attempt is in flight.
    Connecting,
    /// Interval polling is active as a fallback.
    Polling,
    /// The subscription just dropped and the fallback has not engaged yet.
    Error,
}

/// Running per-player totals, supplied as before/after pairs around each
/// recorded event. Never stored by the engine itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCumulativeStats {
    /// Total points scored.
    pub points: u32,
    /// Total rebounds.
    pub rebounds: u32,
    /// Total assists.
    pub assists: u32,
    /// Total steals.
    pub steals: u32,
    /// Total blocks.
    pub blocks: u32,
}

impl PlayerCumulativeStats {
    /// Fold one stat event into the running line.
    ///
    /// Shooting events contribute points only when made; rebounds count on
    /// both sides; turnovers and fouls leave the line unchanged.
    pub fn apply(mut self, event: &StatEvent) -> Self {
        match event.stat_type {
            StatType::FieldGoal | StatType::ThreePointer | StatType::FreeThrow => {
                if event.modifier == Some(StatModifier::Made) {
                    self.points += event.value;
                }
            }
            StatType::Rebound => self.rebounds += event.value,
            StatType::Assist => self.assists += event.value,
            StatType::Steal => self.steals += event.value,
            StatType::Block => self.blocks += event.value,
            StatType::Turnover | StatType::Foul => {}
        }
        self
    }
}
