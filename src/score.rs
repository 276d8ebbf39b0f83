//! Score derivation: turns one game's append-only event set into authoritative
//! point totals. Pure over its inputs, order-independent, and idempotent.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use crate::model::{StatEvent, StatModifier, TeamScores};

/// Derive the point totals for one game from its full event set.
///
/// Events are de-duplicated by id first, so overlapping fetch batches sum the
/// same as a single fetch. Only events with a `Made` modifier score. An
/// opponent-attributed event counts for team B regardless of its team id;
/// otherwise the team id picks the side. A made event matching neither team
/// is logged and discarded, never an error.
pub fn derive_score(events: &[StatEvent], team_a_id: Uuid, team_b_id: Uuid) -> TeamScores {
    let mut seen = HashSet::with_capacity(events.len());
    let mut score = TeamScores::default();

    for event in events {
        if !seen.insert(event.id) {
            continue;
        }
        if event.modifier != Some(StatModifier::Made) {
            continue;
        }

        if event.is_opponent_stat {
            score.team_b += event.value;
        } else if event.team_id == Some(team_a_id) {
            score.team_a += event.value;
        } else if event.team_id == Some(team_b_id) {
            score.team_b += event.value;
        } else {
            warn!(
                event_id = %event.id,
                game_id = %event.game_id,
                team_id = ?event.team_id,
                "made event references a team outside this matchup; discarding"
            );
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatType;

    fn event(
        game_id: Uuid,
        team_id: Option<Uuid>,
        modifier: Option<StatModifier>,
        value: u32,
        opponent: bool,
    ) -> StatEvent {
        StatEvent::new(game_id, team_id, StatType::FieldGoal, modifier, value, opponent)
    }

    #[test]
    fn routes_made_events_and_discards_unresolvable_teams() {
        let game = Uuid::new_v4();
        let (team_a, team_b, team_x) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let events = vec![
            event(game, Some(team_a), Some(StatModifier::Made), 2, false),
            event(game, Some(team_a), Some(StatModifier::Missed), 2, false),
            event(game, Some(team_b), Some(StatModifier::Made), 3, false),
            event(game, Some(team_x), Some(StatModifier::Made), 2, false),
        ];

        let score = derive_score(&events, team_a, team_b);
        assert_eq!(
            score,
            TeamScores {
                team_a: 2,
                team_b: 3
            }
        );
    }

    #[test]
    fn non_made_events_never_contribute() {
        let game = Uuid::new_v4();
        let (team_a, team_b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut events = vec![event(game, Some(team_a), Some(StatModifier::Made), 2, false)];
        let baseline = derive_score(&events, team_a, team_b);

        events.push(event(game, Some(team_a), Some(StatModifier::Missed), 3, false));
        events.push(event(game, Some(team_b), None, 2, false));
        events.push(event(game, Some(team_b), Some(StatModifier::Defensive), 1, false));
        assert_eq!(derive_score(&events, team_a, team_b), baseline);
    }

    #[test]
    fn derivation_is_order_independent() {
        let game = Uuid::new_v4();
        let (team_a, team_b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut events = vec![
            event(game, Some(team_a), Some(StatModifier::Made), 2, false),
            event(game, Some(team_b), Some(StatModifier::Made), 3, false),
            event(game, Some(team_a), Some(StatModifier::Made), 1, false),
            event(game, Some(team_b), Some(StatModifier::Missed), 2, false),
        ];
        let forward = derive_score(&events, team_a, team_b);

        events.reverse();
        assert_eq!(derive_score(&events, team_a, team_b), forward);
    }

    #[test]
    fn duplicate_ids_from_overlapping_batches_count_once() {
        let game = Uuid::new_v4();
        let (team_a, team_b) = (Uuid::new_v4(), Uuid::new_v4());
        let shared = event(game, Some(team_a), Some(StatModifier::Made), 2, false);
        let batch_one = vec![
            shared.clone(),
            event(game, Some(team_b), Some(StatModifier::Made), 3, false),
        ];
        let batch_two = vec![
            shared.clone(),
            event(game, Some(team_a), Some(StatModifier::Made), 1, false),
        ];

        let mut merged = batch_one.clone();
        merged.extend(batch_two.clone());
        let mut single = vec![shared];
        single.push(batch_one[1].clone());
        single.push(batch_two[1].clone());

        assert_eq!(
            derive_score(&merged, team_a, team_b),
            derive_score(&single, team_a, team_b)
        );
    }

    #[test]
    fn opponent_attributed_events_always_count_for_team_b() {
        let game = Uuid::new_v4();
        let (team_a, team_b) = (Uuid::new_v4(), Uuid::new_v4());
        // Opponent mode routes by flag even when the team id points at team A.
        let events = vec![event(game, Some(team_a), Some(StatModifier::Made), 2, true)];
        assert_eq!(
            derive_score(&events, team_a, team_b),
            TeamScores {
                team_a: 0,
                team_b: 2
            }
        );
    }

    #[test]
    fn empty_event_set_scores_zero() {
        let (team_a, team_b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(derive_score(&[], team_a, team_b), TeamScores::default());
    }
}
