//! Player movement: fixed-step proposals, validation, input cooldown

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::geometry::{circles_overlap, square_rect_overlap, Vec2};
use super::state::Player;
use super::SessionId;

/// Displacement applied by one accepted move
pub const MOVE_STEP: f64 = 5.0;
/// Minimum distance between two players
pub const COLLISION_RADIUS: f64 = 20.0;
/// Side of the square footprint a player occupies, anchored at its position
pub const PLAYER_SIZE: f64 = 20.0;
/// Minimum spacing between two accepted moves of the same player
pub const INPUT_COOLDOWN: Duration = Duration::from_millis(100);

/// Movement heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit step on the board (y grows downwards)
    pub fn offset(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -MOVE_STEP),
            Direction::Down => Vec2::new(0.0, MOVE_STEP),
            Direction::Left => Vec2::new(-MOVE_STEP, 0.0),
            Direction::Right => Vec2::new(MOVE_STEP, 0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

/// Direction string that is not one of up/down/left/right
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown direction: {0:?}")]
pub struct UnknownDirection(pub String);

/// Current heading and speed of a player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementData {
    pub direction: Direction,
    pub speed: f64,
}

impl Default for MovementData {
    fn default() -> Self {
        Self {
            direction: Direction::Right,
            speed: 0.0,
        }
    }
}

/// Movement rule applied by the game state
pub struct MovementSystem;

impl MovementSystem {
    /// Candidate position one step from the player's current position
    pub fn propose_move(player: &Player, direction: Direction) -> Vec2 {
        player.position + direction.offset()
    }

    /// Check a candidate position for the moving player
    pub fn validate_move(
        candidate: Vec2,
        mover: &SessionId,
        players: &HashMap<SessionId, Player>,
        arena: &Arena,
    ) -> bool {
        Self::position_is_clear(candidate, Some(mover), players, arena)
    }

    /// True if a player could stand at `candidate`.
    ///
    /// The footprint must be on the board, outside every wall, and at least
    /// `COLLISION_RADIUS` away from every player other than `ignore`.
    pub fn position_is_clear(
        candidate: Vec2,
        ignore: Option<&SessionId>,
        players: &HashMap<SessionId, Player>,
        arena: &Arena,
    ) -> bool {
        if !candidate.is_finite() || !arena.contains_square(candidate, PLAYER_SIZE) {
            return false;
        }

        let blocked_by_player = players
            .iter()
            .filter(|(id, _)| Some(*id) != ignore)
            .any(|(_, other)| circles_overlap(candidate, other.position, COLLISION_RADIUS));
        if blocked_by_player {
            return false;
        }

        !arena
            .walls()
            .iter()
            .any(|wall| square_rect_overlap(candidate, PLAYER_SIZE, wall))
    }

    /// True if enough time passed since the last accepted move
    pub fn cooldown_elapsed(last_accepted: Option<Duration>, now: Duration) -> bool {
        match last_accepted {
            Some(last) => now.saturating_sub(last) >= INPUT_COOLDOWN,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Rect;
    use uuid::Uuid;

    fn player_at(x: f64, y: f64) -> Player {
        Player::new(Uuid::new_v4(), "p".into(), "#fff".into(), Vec2::new(x, y))
    }

    fn roster(players: &[&Player]) -> HashMap<SessionId, Player> {
        players.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    #[test]
    fn proposals_move_one_step_on_one_axis() {
        let p = player_at(100.0, 100.0);
        assert_eq!(MovementSystem::propose_move(&p, Direction::Up), Vec2::new(100.0, 95.0));
        assert_eq!(MovementSystem::propose_move(&p, Direction::Down), Vec2::new(100.0, 105.0));
        assert_eq!(MovementSystem::propose_move(&p, Direction::Left), Vec2::new(95.0, 100.0));
        assert_eq!(MovementSystem::propose_move(&p, Direction::Right), Vec2::new(105.0, 100.0));
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert_eq!(
            "diagonal".parse::<Direction>(),
            Err(UnknownDirection("diagonal".to_string()))
        );
        assert!("Up".parse::<Direction>().is_err());
        assert_eq!(Direction::Down.to_string(), "down");
    }

    #[test]
    fn rejects_candidate_near_other_player() {
        let mover = player_at(100.0, 100.0);
        let other = player_at(130.0, 100.0);
        let players = roster(&[&mover, &other]);
        let arena = Arena::open(1100.0, 700.0).unwrap();

        // 25 units away is fine, 15 is not
        assert!(MovementSystem::validate_move(Vec2::new(105.0, 100.0), &mover.id, &players, &arena));
        assert!(!MovementSystem::validate_move(Vec2::new(115.0, 100.0), &mover.id, &players, &arena));
    }

    #[test]
    fn mover_does_not_block_itself() {
        let mover = player_at(100.0, 100.0);
        let players = roster(&[&mover]);
        let arena = Arena::open(1100.0, 700.0).unwrap();
        assert!(MovementSystem::validate_move(Vec2::new(100.0, 95.0), &mover.id, &players, &arena));
        assert!(!MovementSystem::position_is_clear(Vec2::new(100.0, 95.0), None, &players, &arena));
    }

    #[test]
    fn rejects_candidate_inside_wall_footprint() {
        let mover = player_at(75.0, 50.0);
        let players = roster(&[&mover]);
        let arena = Arena::new(200.0, 200.0, vec![Rect::new(100.0, 40.0, 20.0, 40.0)]).unwrap();

        // Right edge of the footprint would sit at 100, touching but not overlapping
        assert!(MovementSystem::validate_move(Vec2::new(80.0, 50.0), &mover.id, &players, &arena));
        assert!(!MovementSystem::validate_move(Vec2::new(85.0, 50.0), &mover.id, &players, &arena));
    }

    #[test]
    fn rejects_candidate_off_board() {
        let mover = player_at(0.0, 0.0);
        let players = roster(&[&mover]);
        let arena = Arena::open(100.0, 100.0).unwrap();
        assert!(!MovementSystem::validate_move(Vec2::new(-5.0, 0.0), &mover.id, &players, &arena));
        assert!(!MovementSystem::validate_move(Vec2::new(0.0, -5.0), &mover.id, &players, &arena));
        assert!(!MovementSystem::validate_move(Vec2::new(85.0, 0.0), &mover.id, &players, &arena));
        assert!(MovementSystem::validate_move(Vec2::new(80.0, 80.0), &mover.id, &players, &arena));
    }

    #[test]
    fn cooldown_window() {
        assert!(MovementSystem::cooldown_elapsed(None, Duration::ZERO));
        let last = Some(Duration::from_millis(1_000));
        assert!(!MovementSystem::cooldown_elapsed(last, Duration::from_millis(1_099)));
        assert!(MovementSystem::cooldown_elapsed(last, Duration::from_millis(1_100)));
    }
}
