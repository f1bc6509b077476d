//! Read-only views of the simulation handed to the transport layer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::projectile::Shot;
use super::state::Player;
use super::SessionId;

/// Player as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: SessionId,
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            x: p.position.x,
            y: p.position.y,
            color: p.color.clone(),
        }
    }
}

/// Position broadcast after an accepted move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub id: SessionId,
    pub x: f64,
    pub y: f64,
}

/// Shot as seen by clients; `id` is the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotSnapshot {
    pub uuid: Uuid,
    pub x: f64,
    pub y: f64,
    pub id: SessionId,
}

impl From<&Shot> for ShotSnapshot {
    fn from(s: &Shot) -> Self {
        Self {
            uuid: s.id,
            x: s.position.x,
            y: s.position.y,
            id: s.owner_id,
        }
    }
}

/// One player struck by one shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRecord {
    pub hit_id: SessionId,
    pub shooter_id: SessionId,
    pub shot_id: Uuid,
}

/// Everything a tick changed
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub removed_player_ids: Vec<SessionId>,
    pub hits: Vec<HitRecord>,
    pub shots: Vec<ShotSnapshot>,
}
