//! Demo binary running the live score engine over the in-memory store with a
//! simulated stat feed.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use rand::Rng;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use courtside_live::{
    config::EngineConfig,
    live::LiveScoreEngine,
    model::{GameRecord, GameStatus, StatEvent, StatModifier, StatType},
    store::memory::MemoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = EngineConfig::load().context("loading engine configuration")?;
    let store = Arc::new(MemoryStore::new());

    let games = [seed_game(&store), seed_game(&store)];
    let game_ids = games.iter().map(|record| record.id).collect::<Vec<_>>();

    let (engine, mut handle) = LiveScoreEngine::spawn(
        store.clone(),
        store.clone(),
        store.clone(),
        game_ids,
        config,
    );

    for game in &games {
        tokio::spawn(simulate_feed(store.clone(), game.clone()));
    }

    loop {
        tokio::select! {
            board = handle.changed() => {
                for view in board.games.values() {
                    info!(
                        game_id = %view.game_id,
                        team_a = view.score.team_a,
                        team_b = view.score.team_b,
                        source = ?view.source,
                        status = ?handle.connection_status(),
                        "scoreboard update"
                    );
                }
            }
            _ = shutdown_signal() => break,
        }
    }

    info!("shutting down");
    engine.shutdown();
    Ok(())
}

/// Create an in-progress game in the store.
fn seed_game(store: &MemoryStore) -> GameRecord {
    let mut record = GameRecord::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    record.status = GameStatus::InProgress;
    store.upsert_game(record.clone());
    info!(game_id = %record.id, "seeded game");
    record
}

/// Feed a game with random stat events on a jittered cadence, logging any
/// milestones the scorers cross.
async fn simulate_feed(store: Arc<MemoryStore>, record: GameRecord) {
    let players = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

    loop {
        let delay = Duration::from_millis(rand::rng().random_range(400..2_500));
        sleep(delay).await;

        let (stat_type, modifier, value) = match rand::rng().random_range(0..6) {
            0 => (StatType::FieldGoal, Some(StatModifier::Made), 2),
            1 => (StatType::ThreePointer, Some(StatModifier::Made), 3),
            2 => (StatType::FreeThrow, Some(StatModifier::Made), 1),
            3 => (StatType::FieldGoal, Some(StatModifier::Missed), 2),
            4 => (StatType::Rebound, Some(StatModifier::Defensive), 1),
            _ => (StatType::Assist, None, 1),
        };
        let team_id = if rand::rng().random_bool(0.5) {
            record.team_a_id
        } else {
            record.team_b_id
        };
        let player_id = players[rand::rng().random_range(0..players.len())];

        let event = StatEvent::new(
            record.id,
            Some(team_id),
            stat_type,
            modifier,
            value,
            false,
        );
        for milestone in store.record_event(event, Some(player_id)) {
            info!(
                game_id = %record.id,
                player_id = %player_id,
                milestone = milestone.label,
                "milestone reached"
            );
        }
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,courtside_live=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM to begin a graceful shutdown.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
