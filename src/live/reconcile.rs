//! Stable-state reconciliation: republish only on material change, preserving
//! reference identity otherwise so consumers can skip redundant work.

use std::sync::Arc;

use crate::model::LiveBoard;

/// Owner of the previously published view.
///
/// The view is replaced atomically per recompute; readers observe either the
/// old or the fully-new board, never a torn intermediate state. The result is
/// always one of: the previous `Arc` unchanged, or the next board wholesale —
/// never a partial merge.
pub(crate) struct Reconciler {
    current: Arc<LiveBoard>,
}

impl Reconciler {
    pub(crate) fn new() -> Self {
        Self {
            current: Arc::new(LiveBoard::default()),
        }
    }

    /// Previously published view.
    #[cfg(test)]
    pub(crate) fn current(&self) -> Arc<LiveBoard> {
        self.current.clone()
    }

    /// Compare `next` against the published view and return the one to serve.
    ///
    /// Returns the previous reference (pointer-identical) when nothing
    /// material changed; otherwise installs and returns the next board.
    pub(crate) fn reconcile(&mut self, next: LiveBoard) -> Arc<LiveBoard> {
        if !is_material_change(&self.current, &next) {
            return self.current.clone();
        }
        self.current = Arc::new(next);
        self.current.clone()
    }
}

/// Whether two boards differ in a way consumers can see.
///
/// A game-set size or identity change is always material; otherwise a fixed
/// field set is compared per game. Volatile fields (`computed_at`, the score
/// source tag) are excluded on purpose.
fn is_material_change(previous: &LiveBoard, next: &LiveBoard) -> bool {
    if previous.games.len() != next.games.len() {
        return true;
    }

    for (id, next_view) in &next.games {
        let Some(previous_view) = previous.games.get(id) else {
            return true;
        };
        if previous_view.score != next_view.score
            || previous_view.status != next_view.status
            || previous_view.quarter != next_view.quarter
            || previous_view.clock != next_view.clock
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        GameClock, GameStatus, LiveGameView, ScoreSource, TeamScores,
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn view(game_id: Uuid, team_a: u32, team_b: u32) -> LiveGameView {
        LiveGameView {
            game_id,
            score: TeamScores { team_a, team_b },
            status: GameStatus::InProgress,
            quarter: 2,
            clock: GameClock {
                minutes: 7,
                seconds: 31,
            },
            source: ScoreSource::Derived,
            computed_at: OffsetDateTime::now_utc(),
        }
    }

    fn board(views: Vec<LiveGameView>) -> LiveBoard {
        LiveBoard {
            games: views.into_iter().map(|v| (v.game_id, v)).collect(),
        }
    }

    #[test]
    fn identical_views_return_the_previous_reference() {
        let game = Uuid::new_v4();
        let mut reconciler = Reconciler::new();
        let first = reconciler.reconcile(board(vec![view(game, 10, 8)]));

        // Fresh timestamp, same material fields.
        let second = reconciler.reconcile(board(vec![view(game, 10, 8)]));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn source_flip_alone_is_not_material() {
        let game = Uuid::new_v4();
        let mut reconciler = Reconciler::new();
        let first = reconciler.reconcile(board(vec![view(game, 10, 8)]));

        let mut degraded = view(game, 10, 8);
        degraded.source = ScoreSource::LastKnown;
        let second = reconciler.reconcile(board(vec![degraded]));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn score_change_returns_a_new_reference() {
        let game = Uuid::new_v4();
        let mut reconciler = Reconciler::new();
        let first = reconciler.reconcile(board(vec![view(game, 10, 8)]));

        let second = reconciler.reconcile(board(vec![view(game, 12, 8)]));
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.game(&game).unwrap().score.team_a, 12);
    }

    #[test]
    fn status_quarter_and_clock_changes_are_material() {
        let game = Uuid::new_v4();
        let mut reconciler = Reconciler::new();
        let first = reconciler.reconcile(board(vec![view(game, 0, 0)]));

        let mut finished = view(game, 0, 0);
        finished.status = GameStatus::Completed;
        assert!(!Arc::ptr_eq(&first, &reconciler.reconcile(board(vec![finished]))));

        let mut late = view(game, 0, 0);
        late.status = GameStatus::Completed;
        late.quarter = 4;
        assert!(!Arc::ptr_eq(
            &reconciler.current(),
            &reconciler.reconcile(board(vec![late.clone()]))
        ));

        let mut ticked = late;
        ticked.clock = GameClock {
            minutes: 7,
            seconds: 30,
        };
        assert!(!Arc::ptr_eq(
            &reconciler.current(),
            &reconciler.reconcile(board(vec![ticked]))
        ));
    }

    #[test]
    fn game_set_identity_change_is_always_material() {
        let mut reconciler = Reconciler::new();
        let first = reconciler.reconcile(board(vec![view(Uuid::new_v4(), 0, 0)]));

        // Same size, different game id.
        let second = reconciler.reconcile(board(vec![view(Uuid::new_v4(), 0, 0)]));
        assert!(!Arc::ptr_eq(&first, &second));

        // Removal.
        let third = reconciler.reconcile(board(Vec::new()));
        assert!(!Arc::ptr_eq(&second, &third));
        assert!(third.is_empty());
    }
}
