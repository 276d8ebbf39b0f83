//! Transport management: owns the push subscription, the polling fallback,
//! and the reconnection state machine feeding refresh signals.

use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    live::debounce::DirtyHandle,
    model::ConnectionStatus,
    store::{PushChannel, PushSignal, PushSubscription},
};

/// Upper bound on the random jitter added to reconnect delays.
const RECONNECT_JITTER_MS: u64 = 250;

/// Connection lifecycle phases for the live update channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionPhase {
    /// No subscription attempt has been made yet.
    Idle,
    /// A subscription attempt is in flight.
    Connecting,
    /// The push subscription is live.
    Connected,
    /// The subscription just dropped; the fallback has not engaged yet.
    Disconnected,
    /// Interval polling is active, with or without background reconnects.
    Polling,
}

/// What the transport loop should do after a subscription failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecoveryAction {
    /// Schedule a background reconnect attempt after the given delay.
    RetryAfter(Duration),
    /// The reconnect budget is spent; polling is now the stable mode.
    StayPolling,
}

/// Pure reconnection state machine.
///
/// Keeps ownership of the connection state in one place and makes the
/// transition table testable without timers or a real channel. Polling is a
/// permanent fallback mode, never a terminal failure: a later successful
/// subscribe moves the machine back to connected and resets the budget.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionStateMachine {
    phase: ConnectionPhase,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    last_confirmed: Option<Instant>,
}

impl ConnectionStateMachine {
    pub(crate) fn new(
        max_reconnect_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            reconnect_attempts: 0,
            max_reconnect_attempts,
            initial_delay,
            max_delay,
            last_confirmed: None,
        }
    }

    pub(crate) fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Public projection of the phase exposed to consumers.
    pub(crate) fn status(&self) -> ConnectionStatus {
        match self.phase {
            ConnectionPhase::Idle | ConnectionPhase::Connecting => ConnectionStatus::Connecting,
            ConnectionPhase::Connected => ConnectionStatus::Connected,
            ConnectionPhase::Disconnected => ConnectionStatus::Error,
            ConnectionPhase::Polling => ConnectionStatus::Polling,
        }
    }

    /// A subscription attempt is starting from a cold state.
    pub(crate) fn begin_connect(&mut self) {
        self.phase = ConnectionPhase::Connecting;
    }

    /// The push subscription is established; resets the retry budget.
    pub(crate) fn established(&mut self, now: Instant) {
        self.phase = ConnectionPhase::Connected;
        self.reconnect_attempts = 0;
        self.last_confirmed = Some(now);
    }

    /// A push message arrived, reconfirming the subscription is alive.
    pub(crate) fn confirm_liveness(&mut self, now: Instant) {
        self.last_confirmed = Some(now);
    }

    /// The subscription dropped or the attempt failed.
    pub(crate) fn connection_lost(&mut self) {
        self.phase = ConnectionPhase::Disconnected;
    }

    /// Engage interval polling and decide whether another background
    /// reconnect attempt is within budget.
    pub(crate) fn schedule_recovery(&mut self) -> RecoveryAction {
        self.phase = ConnectionPhase::Polling;
        self.reconnect_attempts += 1;
        if self.reconnect_attempts > self.max_reconnect_attempts {
            RecoveryAction::StayPolling
        } else {
            let exponent = self.reconnect_attempts.saturating_sub(1).min(16);
            let delay = self
                .initial_delay
                .saturating_mul(2u32.saturating_pow(exponent))
                .min(self.max_delay);
            RecoveryAction::RetryAfter(delay)
        }
    }

    /// Whether the subscription has gone quiet for longer than `window`.
    ///
    /// Only meaningful while connected; poll ticks cover the other phases.
    pub(crate) fn stale(&self, now: Instant, window: Duration) -> bool {
        self.phase == ConnectionPhase::Connected
            && self
                .last_confirmed
                .is_none_or(|at| now.duration_since(at) >= window)
    }
}

/// Background task owning the push subscription and its fallbacks.
///
/// Every push message, poll tick, and safety tick funnels into the refresh
/// coordinator as an untyped dirty signal; a recompute already in flight is
/// folded into the active debounce window rather than restarted. Aborting
/// the task tears down all timers, and the dropped subscription receiver
/// makes late callbacks unobservable.
pub(crate) struct TransportManager {
    channel: Arc<dyn PushChannel>,
    game_ids: Vec<Uuid>,
    config: EngineConfig,
    dirty: DirtyHandle,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl TransportManager {
    pub(crate) fn new(
        channel: Arc<dyn PushChannel>,
        game_ids: Vec<Uuid>,
        config: EngineConfig,
        dirty: DirtyHandle,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        Self {
            channel,
            game_ids,
            config,
            dirty,
            status_tx,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut machine = ConnectionStateMachine::new(
            self.config.max_reconnect_attempts,
            self.config.reconnect_initial_delay,
            self.config.reconnect_max_delay,
        );
        let mut subscription: Option<PushSubscription> = None;
        let mut reconnect_at: Option<Instant> = None;

        let mut poll_tick = time::interval_at(
            Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut safety_tick = time::interval_at(
            Instant::now() + self.config.safety_interval,
            self.config.safety_interval,
        );
        safety_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        machine.begin_connect();
        self.publish(&machine);
        match self.channel.subscribe(&self.game_ids).await {
            Ok(live) => {
                info!("push subscription established");
                machine.established(Instant::now());
                subscription = Some(live);
            }
            Err(err) => {
                warn!(error = %err, "initial push subscription failed");
                machine.connection_lost();
                self.publish(&machine);
                reconnect_at = self.apply_recovery(&mut machine);
            }
        }
        self.publish(&machine);
        // The initial load flows through the same refresh path as updates.
        self.dirty.mark_dirty();

        loop {
            tokio::select! {
                signal = Self::next_signal(&mut subscription) => match signal {
                    Some(signal) => {
                        debug!(game_id = ?signal.game_id, "push notification received");
                        machine.confirm_liveness(Instant::now());
                        self.dirty.mark_dirty();
                    }
                    None => {
                        warn!("push subscription closed; engaging polling fallback");
                        subscription = None;
                        machine.connection_lost();
                        self.publish(&machine);
                        reconnect_at = self.apply_recovery(&mut machine);
                        self.publish(&machine);
                        self.dirty.mark_dirty();
                    }
                },
                _ = poll_tick.tick(), if subscription.is_none() => {
                    self.dirty.mark_dirty();
                }
                _ = safety_tick.tick() => {
                    if machine.stale(Instant::now(), self.config.safety_interval) {
                        debug!("no recent push confirmation; safety-net refresh");
                        self.dirty.mark_dirty();
                    }
                }
                _ = Self::sleep_opt(reconnect_at) => {
                    reconnect_at = None;
                    match self.channel.subscribe(&self.game_ids).await {
                        Ok(live) => {
                            info!("push subscription re-established");
                            machine.established(Instant::now());
                            subscription = Some(live);
                            self.publish(&machine);
                            self.dirty.mark_dirty();
                        }
                        Err(err) => {
                            warn!(error = %err, "push reconnect attempt failed");
                            reconnect_at = self.apply_recovery(&mut machine);
                            self.publish(&machine);
                        }
                    }
                }
            }
        }
    }

    async fn next_signal(subscription: &mut Option<PushSubscription>) -> Option<PushSignal> {
        match subscription {
            Some(live) => live.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn sleep_opt(deadline: Option<Instant>) {
        match deadline {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }

    /// Engage polling and schedule the next background reconnect, if any.
    fn apply_recovery(&self, machine: &mut ConnectionStateMachine) -> Option<Instant> {
        match machine.schedule_recovery() {
            RecoveryAction::RetryAfter(delay) => {
                // Jitter spreads reconnect storms when many engines lose the
                // same backend at once.
                let jitter =
                    Duration::from_millis(rand::rng().random_range(0..RECONNECT_JITTER_MS));
                Some(Instant::now() + delay + jitter)
            }
            RecoveryAction::StayPolling => {
                info!("reconnect budget exhausted; settling into interval polling");
                None
            }
        }
    }

    fn publish(&self, machine: &ConnectionStateMachine) {
        let status = machine.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
