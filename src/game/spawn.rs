//! Spawn placement by rejection sampling on the board grid

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::arena::Arena;
use super::geometry::Vec2;
use super::movement::MovementSystem;
use super::state::Player;
use super::SessionId;

/// Spawn positions are snapped to this grid
pub const SPAWN_CELL_SIZE: f64 = 20.0;
/// Random draws before falling back to a full grid scan
pub const MAX_SPAWN_ATTEMPTS: usize = 100;

/// Finds free cells for joining players
pub struct SpawnLocator {
    rng: ChaCha8Rng,
}

impl SpawnLocator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// First free position found.
    ///
    /// Draws up to `MAX_SPAWN_ATTEMPTS` random cells, then scans the grid in
    /// row-major order. Errors only when no cell on the board is free.
    pub fn find_spawn(
        &mut self,
        players: &HashMap<SessionId, Player>,
        arena: &Arena,
    ) -> Result<Vec2, SpawnError> {
        let (columns, rows) = grid_size(arena);
        if columns == 0 || rows == 0 {
            return Err(SpawnError::NoFreeCell);
        }

        let is_free = |candidate: Vec2| MovementSystem::position_is_clear(candidate, None, players, arena);

        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let candidate = cell_origin(self.rng.gen_range(0..columns), self.rng.gen_range(0..rows));
            if is_free(candidate) {
                return Ok(candidate);
            }
        }

        (0..rows)
            .flat_map(|row| (0..columns).map(move |column| cell_origin(column, row)))
            .find(|candidate| is_free(*candidate))
            .ok_or(SpawnError::NoFreeCell)
    }
}

fn grid_size(arena: &Arena) -> (u32, u32) {
    let columns = (arena.width() / SPAWN_CELL_SIZE).floor() as u32;
    let rows = (arena.height() / SPAWN_CELL_SIZE).floor() as u32;
    (columns, rows)
}

fn cell_origin(column: u32, row: u32) -> Vec2 {
    Vec2::new(
        f64::from(column) * SPAWN_CELL_SIZE,
        f64::from(row) * SPAWN_CELL_SIZE,
    )
}

/// Spawn search failure
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("No free spawn cell left on the board")]
    NoFreeCell,
}
