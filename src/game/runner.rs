//! Authoritative game loop - serializes intents and ticks on one task

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::{tick_interval, SharedClock};
use crate::ws::protocol::ServerMsg;

use super::arena::Arena;
use super::geometry::{Rect, Vec2};
use super::movement::Direction;
use super::state::GameState;
use super::SessionId;

/// Pending intents before senders start waiting
const INTENT_QUEUE_CAPACITY: usize = 1024;
/// Outbound messages buffered per subscriber
const OUTBOUND_CAPACITY: usize = 256;

/// What a client asked for
#[derive(Debug, Clone, PartialEq)]
pub enum IntentKind {
    Join { username: String, color: String },
    Move(Direction),
    Shoot(Vec2),
    Leave,
}

/// Client intent tagged with its session
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub session_id: SessionId,
    pub kind: IntentKind,
}

/// Who receives an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Only(SessionId),
    AllExcept(SessionId),
}

impl Audience {
    pub fn includes(&self, session_id: &SessionId) -> bool {
        match self {
            Audience::All => true,
            Audience::Only(id) => id == session_id,
            Audience::AllExcept(id) => id != session_id,
        }
    }
}

/// Message for the transport layer to deliver
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub msg: ServerMsg,
}

/// The game loop stopped and no longer accepts intents
#[derive(Debug, thiserror::Error)]
#[error("Game loop is not running")]
pub struct GameClosed;

/// Cloneable handle used by sessions to talk to the game loop
#[derive(Clone)]
pub struct GameHandle {
    intent_tx: mpsc::Sender<Intent>,
    outbound_tx: broadcast::Sender<Outbound>,
    arena: Arc<Arena>,
    player_count: Arc<AtomicUsize>,
}

impl GameHandle {
    pub async fn send(&self, intent: Intent) -> Result<(), GameClosed> {
        self.intent_tx.send(intent).await.map_err(|_| GameClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound_tx.subscribe()
    }

    pub fn walls(&self) -> &[Rect] {
        self.arena.walls()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Owns the game state; the only writer
pub struct GameRunner {
    state: GameState,
    clock: SharedClock,
    tick_rate: u32,
    intent_rx: mpsc::Receiver<Intent>,
    outbound_tx: broadcast::Sender<Outbound>,
    player_count: Arc<AtomicUsize>,
    shots_were_live: bool,
}

impl GameRunner {
    pub fn new(state: GameState, clock: SharedClock, tick_rate: u32) -> (Self, GameHandle) {
        let (intent_tx, intent_rx) = mpsc::channel(INTENT_QUEUE_CAPACITY);
        let (outbound_tx, _) = broadcast::channel(OUTBOUND_CAPACITY);
        let player_count = Arc::new(AtomicUsize::new(state.player_count()));

        let handle = GameHandle {
            intent_tx,
            outbound_tx: outbound_tx.clone(),
            arena: state.shared_arena(),
            player_count: player_count.clone(),
        };

        let runner = Self {
            state,
            clock,
            tick_rate,
            intent_rx,
            outbound_tx,
            player_count,
            shots_were_live: false,
        };

        (runner, handle)
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!(tick_rate = self.tick_rate, "Game loop started");

        let mut ticker = interval(tick_interval(self.tick_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = self.clock.now();

        loop {
            tokio::select! {
                maybe_intent = self.intent_rx.recv() => match maybe_intent {
                    Some(intent) => self.handle_intent(intent),
                    None => {
                        info!("All game handles dropped, stopping game loop");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    let elapsed = now.saturating_sub(last_tick);
                    last_tick = now;
                    self.run_tick(elapsed);
                }
            }
        }
    }

    /// Apply one intent and publish what it changed
    pub fn handle_intent(&mut self, intent: Intent) {
        let Intent { session_id, kind } = intent;
        match kind {
            IntentKind::Join { username, color } => self.handle_join(session_id, username, color),
            IntentKind::Move(direction) => {
                if let Some(moved) = self.state.move_player(&session_id, direction) {
                    self.publish(Audience::All, ServerMsg::PlayerMoved(moved));
                }
            }
            IntentKind::Shoot(aim) => {
                if let Some(shot_id) = self.state.shoot(&session_id, aim) {
                    debug!(session_id = %session_id, shot_id = %shot_id, "Shot fired");
                }
            }
            IntentKind::Leave => {
                if self.state.leave(&session_id) {
                    self.sync_player_count();
                    self.publish(
                        Audience::AllExcept(session_id),
                        ServerMsg::PlayerDisconnected(session_id),
                    );
                }
            }
        }
    }

    fn handle_join(&mut self, session_id: SessionId, username: String, color: String) {
        match self.state.join(session_id, username, color) {
            Ok(players) => {
                self.sync_player_count();
                let joined = players
                    .iter()
                    .find(|p| p.id == session_id)
                    .cloned()
                    .map(ServerMsg::NewPlayer);

                self.publish(Audience::Only(session_id), ServerMsg::CurrentPlayers(players));
                if let Some(msg) = joined {
                    self.publish(Audience::AllExcept(session_id), msg);
                }
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Join rejected");
                self.publish(
                    Audience::Only(session_id),
                    ServerMsg::Error {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    /// Advance the simulation and publish hits and shots
    pub fn run_tick(&mut self, elapsed: Duration) {
        let report = self.state.tick(elapsed);

        if !report.removed_player_ids.is_empty() {
            self.sync_player_count();
        }
        for hit in report.hits {
            self.publish(Audience::All, ServerMsg::PlayerHit(hit));
        }

        let shots_live = !report.shots.is_empty();
        if shots_live || self.shots_were_live {
            self.publish(Audience::All, ServerMsg::ShotsUpdated(report.shots));
        }
        self.shots_were_live = shots_live;
    }

    fn publish(&self, audience: Audience, msg: ServerMsg) {
        // No subscribers is fine: nobody is connected
        let _ = self.outbound_tx.send(Outbound { audience, msg });
    }

    fn sync_player_count(&self) {
        self.player_count
            .store(self.state.player_count(), Ordering::Relaxed);
    }
}
