//! Static arena: board bounds plus a fixed wall layout

use super::geometry::{Rect, Vec2};

/// Board width in units
pub const BOARD_WIDTH: f64 = 1100.0;
/// Board height in units
pub const BOARD_HEIGHT: f64 = 700.0;

/// The wall layout shipped with the server
pub const STANDARD_WALLS: [Rect; 6] = [
    Rect::new(200.0, 100.0, 200.0, 20.0),
    Rect::new(500.0, 100.0, 300.0, 20.0),
    Rect::new(800.0, 100.0, 20.0, 200.0),
    Rect::new(200.0, 200.0, 200.0, 300.0),
    Rect::new(500.0, 200.0, 200.0, 300.0),
    Rect::new(400.0, 600.0, 200.0, 20.0),
];

/// Immutable playfield. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Arena {
    width: f64,
    height: f64,
    walls: Vec<Rect>,
}

impl Arena {
    pub fn new(width: f64, height: f64, walls: Vec<Rect>) -> Result<Self, ArenaError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ArenaError::InvalidBounds { width, height });
        }

        for (index, wall) in walls.iter().enumerate() {
            let finite = wall.x.is_finite()
                && wall.y.is_finite()
                && wall.width.is_finite()
                && wall.height.is_finite();
            if !finite || wall.width <= 0.0 || wall.height <= 0.0 {
                return Err(ArenaError::DegenerateWall { index });
            }
            if wall.x < 0.0 || wall.y < 0.0 || wall.right() > width || wall.bottom() > height {
                return Err(ArenaError::WallOutOfBounds { index });
            }
        }

        Ok(Self {
            width,
            height,
            walls,
        })
    }

    /// 1100x700 board with the standard wall layout
    pub fn standard() -> Result<Self, ArenaError> {
        Self::new(BOARD_WIDTH, BOARD_HEIGHT, STANDARD_WALLS.to_vec())
    }

    /// Board without walls
    pub fn open(width: f64, height: f64) -> Result<Self, ArenaError> {
        Self::new(width, height, Vec::new())
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn walls(&self) -> &[Rect] {
        &self.walls
    }

    /// True if a `size` square anchored at `origin` lies fully on the board
    pub fn contains_square(&self, origin: Vec2, size: f64) -> bool {
        origin.x >= 0.0
            && origin.y >= 0.0
            && origin.x + size <= self.width
            && origin.y + size <= self.height
    }
}

/// Invalid arena layout
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArenaError {
    #[error("Board bounds must be positive and finite, got {width}x{height}")]
    InvalidBounds { width: f64, height: f64 },

    #[error("Wall #{index} has a non-positive or non-finite size")]
    DegenerateWall { index: usize },

    #[error("Wall #{index} extends past the board")]
    WallOutOfBounds { index: usize },
}
