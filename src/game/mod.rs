//! Game simulation modules

pub mod arena;
pub mod geometry;
pub mod movement;
pub mod projectile;
pub mod runner;
pub mod snapshot;
pub mod spawn;
pub mod state;

pub use runner::{GameHandle, GameRunner, Intent, IntentKind, Outbound};
pub use state::GameState;

use uuid::Uuid;

/// Connection identity, assigned by the transport layer
pub type SessionId = Uuid;
