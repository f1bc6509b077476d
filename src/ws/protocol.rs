//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::game::geometry::Rect;
use crate::game::snapshot::{HitRecord, PlayerMoved, PlayerSnapshot, ShotSnapshot};
use crate::game::SessionId;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Enter the arena (also used to respawn after being hit)
    RegisterPlayer { username: String, color: String },

    /// One movement step; `direction` is up/down/left/right
    PlayerMovement { direction: String },

    /// Fire along an aim vector (not an absolute board position)
    Shoot { x: f64, y: f64 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Every active player, sent to a player that just joined
    CurrentPlayers(Vec<PlayerSnapshot>),

    /// Player joined the arena
    NewPlayer(PlayerSnapshot),

    /// Accepted movement step
    PlayerMoved(PlayerMoved),

    /// Session left while it had an active player
    PlayerDisconnected(SessionId),

    /// Player struck by a shot and removed
    PlayerHit(HitRecord),

    /// Live shots after a tick
    ShotsUpdated(Vec<ShotSnapshot>),

    /// Static wall layout, sent once on connect
    Walls(Vec<Rect>),

    /// Request that could not be honoured
    Error { code: String, message: String },
}
