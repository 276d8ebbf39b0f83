//! Milestone detection: compares two cumulative per-player snapshots and
//! reports achievement thresholds newly crossed by the event between them.

use serde::Serialize;

use crate::model::PlayerCumulativeStats;

/// Upper bound on milestones reported for a single event.
pub const MAX_MILESTONES_PER_EVENT: usize = 2;

/// Stat value a category must reach to count toward a combo milestone.
const COMBO_BAR: u32 = 10;

/// Descending threshold ladders per category: `(threshold, priority, label)`.
/// Priorities are globally comparable; rarer feats rank higher.
const POINTS_LADDER: &[(u32, u8, &str)] = &[
    (50, 95, "50-point game"),
    (40, 90, "40-point game"),
    (30, 85, "30-point game"),
    (20, 75, "20-point game"),
    (10, 60, "10+ points"),
];
const ASSISTS_LADDER: &[(u32, u8, &str)] = &[
    (20, 92, "20-assist game"),
    (15, 82, "15+ assists"),
    (10, 70, "10+ assists"),
    (5, 45, "5+ assists"),
];
const REBOUNDS_LADDER: &[(u32, u8, &str)] = &[
    (20, 91, "20-rebound game"),
    (15, 80, "15+ rebounds"),
    (10, 68, "10+ rebounds"),
];
const STEALS_LADDER: &[(u32, u8, &str)] = &[
    (7, 88, "7+ steals"),
    (5, 72, "5+ steals"),
    (3, 50, "3+ steals"),
];
const BLOCKS_LADDER: &[(u32, u8, &str)] = &[
    (7, 89, "7+ blocks"),
    (5, 73, "5+ blocks"),
    (3, 51, "3+ blocks"),
];

const TRIPLE_DOUBLE_PRIORITY: u8 = 100;
const DOUBLE_DOUBLE_PRIORITY: u8 = 97;

/// Which achievement a [`Milestone`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// Double digits in at least three categories simultaneously.
    TripleDouble,
    /// Double digits in at least two categories simultaneously.
    DoubleDouble,
    /// Points threshold crossed.
    Points(u32),
    /// Rebounds threshold crossed.
    Rebounds(u32),
    /// Assists threshold crossed.
    Assists(u32),
    /// Steals threshold crossed.
    Steals(u32),
    /// Blocks threshold crossed.
    Blocks(u32),
}

/// Transient achievement value object handed to the recording workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    /// Which achievement was reached.
    pub kind: MilestoneKind,
    /// Display label for highlight surfaces.
    pub label: &'static str,
    /// Relative weight used for ordering; higher is more notable.
    pub priority: u8,
}

/// Find the milestones newly crossed between two cumulative snapshots.
///
/// Pure and total: never fails, returns an empty list when nothing is newly
/// crossed. Thresholds are monotonic — a milestone is reported only when the
/// previous snapshot was strictly below it, so replayed snapshots never
/// re-trigger. At most one milestone per category per call, and at most
/// [`MAX_MILESTONES_PER_EVENT`] overall, highest priority first.
pub fn detect_new_milestones(
    previous: &PlayerCumulativeStats,
    current: &PlayerCumulativeStats,
) -> Vec<Milestone> {
    let mut found = Vec::new();

    let combo_before = double_digit_categories(previous);
    let combo_after = double_digit_categories(current);
    if combo_after >= 3 && combo_before < 3 {
        found.push(Milestone {
            kind: MilestoneKind::TripleDouble,
            label: "triple-double",
            priority: TRIPLE_DOUBLE_PRIORITY,
        });
    } else if combo_after >= 2 && combo_before < 2 {
        found.push(Milestone {
            kind: MilestoneKind::DoubleDouble,
            label: "double-double",
            priority: DOUBLE_DOUBLE_PRIORITY,
        });
    }

    let categories = [
        (previous.points, current.points, POINTS_LADDER, MilestoneKind::Points as fn(u32) -> MilestoneKind),
        (previous.rebounds, current.rebounds, REBOUNDS_LADDER, MilestoneKind::Rebounds),
        (previous.assists, current.assists, ASSISTS_LADDER, MilestoneKind::Assists),
        (previous.steals, current.steals, STEALS_LADDER, MilestoneKind::Steals),
        (previous.blocks, current.blocks, BLOCKS_LADDER, MilestoneKind::Blocks),
    ];
    for (before, after, ladder, kind) in categories {
        if let Some(milestone) = highest_crossed(before, after, ladder, kind) {
            found.push(milestone);
        }
    }

    found.sort_by(|a, b| b.priority.cmp(&a.priority));
    found.truncate(MAX_MILESTONES_PER_EVENT);
    found
}

/// Number of tracked categories at or above the combo bar.
fn double_digit_categories(stats: &PlayerCumulativeStats) -> usize {
    [
        stats.points,
        stats.rebounds,
        stats.assists,
        stats.steals,
        stats.blocks,
    ]
    .into_iter()
    .filter(|value| *value >= COMBO_BAR)
    .count()
}

/// Highest ladder threshold with `before < threshold <= after`, if any.
///
/// The ladders are ordered descending, so the first hit is the highest; a
/// single event jumping across several thresholds reports only the top one.
fn highest_crossed(
    before: u32,
    after: u32,
    ladder: &[(u32, u8, &'static str)],
    kind: fn(u32) -> MilestoneKind,
) -> Option<Milestone> {
    ladder
        .iter()
        .find(|(threshold, _, _)| before < *threshold && *threshold <= after)
        .map(|&(threshold, priority, label)| Milestone {
            kind: kind(threshold),
            label,
            priority,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: u32, rebounds: u32, assists: u32, steals: u32, blocks: u32) -> PlayerCumulativeStats {
        PlayerCumulativeStats {
            points,
            rebounds,
            assists,
            steals,
            blocks,
        }
    }

    #[test]
    fn crossing_ten_points_emits_only_the_ten_threshold() {
        let found = detect_new_milestones(&line(8, 0, 0, 0, 0), &line(11, 0, 0, 0, 0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MilestoneKind::Points(10));
    }

    #[test]
    fn jump_across_several_thresholds_reports_only_the_highest() {
        let found = detect_new_milestones(&line(8, 0, 0, 0, 0), &line(35, 0, 0, 0, 0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MilestoneKind::Points(30));
    }

    #[test]
    fn replayed_snapshot_never_retriggers() {
        let snapshot = line(11, 10, 3, 0, 0);
        assert!(detect_new_milestones(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn nothing_newly_crossed_yields_empty_list() {
        assert!(detect_new_milestones(&line(12, 4, 2, 0, 0), &line(14, 4, 2, 0, 0)).is_empty());
    }

    #[test]
    fn missing_previous_snapshot_defaults_to_zero() {
        let found =
            detect_new_milestones(&PlayerCumulativeStats::default(), &line(10, 0, 0, 0, 0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MilestoneKind::Points(10));
    }

    #[test]
    fn double_double_is_emitted_with_the_crossing_category() {
        let found = detect_new_milestones(&line(10, 9, 0, 0, 0), &line(10, 10, 0, 0, 0));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, MilestoneKind::DoubleDouble);
        assert_eq!(found[1].kind, MilestoneKind::Rebounds(10));
    }

    #[test]
    fn double_double_does_not_retrigger_once_reached() {
        // Already at two categories; a third does not re-emit double-double.
        let found = detect_new_milestones(&line(10, 10, 9, 0, 0), &line(10, 10, 10, 0, 0));
        assert_eq!(found[0].kind, MilestoneKind::TripleDouble);
        assert!(found.iter().all(|m| m.kind != MilestoneKind::DoubleDouble));
    }

    #[test]
    fn triple_double_outranks_categories_and_output_caps_at_two() {
        let found = detect_new_milestones(&line(9, 9, 9, 0, 0), &line(12, 11, 10, 0, 0));
        assert_eq!(found.len(), MAX_MILESTONES_PER_EVENT);
        assert_eq!(found[0].kind, MilestoneKind::TripleDouble);
        // Assists(10) carries the highest category priority of the three.
        assert_eq!(found[1].kind, MilestoneKind::Assists(10));
    }

    #[test]
    fn five_assist_rung_is_detected() {
        let found = detect_new_milestones(&line(0, 0, 4, 0, 0), &line(0, 0, 5, 0, 0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MilestoneKind::Assists(5));
    }

    #[test]
    fn defensive_ladders_use_their_own_rungs() {
        let steals = detect_new_milestones(&line(0, 0, 0, 2, 0), &line(0, 0, 0, 3, 0));
        assert_eq!(steals[0].kind, MilestoneKind::Steals(3));

        let blocks = detect_new_milestones(&line(0, 0, 0, 0, 4), &line(0, 0, 0, 0, 6));
        assert_eq!(blocks[0].kind, MilestoneKind::Blocks(5));
    }
}
