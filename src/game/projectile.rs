//! Projectile simulation - integration, border/wall bounces, hit detection

use uuid::Uuid;

use super::arena::Arena;
use super::geometry::{reflect, sweep_circle_rect, Axis, Contact, Vec2};
use super::state::Player;
use super::SessionId;

/// Shot speed in units per millisecond
pub const SHOT_SPEED: f64 = 1.15;
/// Reflections a shot may take; the next one removes it
pub const MAX_BOUNCES: u32 = 3;
/// Shot radius used against walls
pub const BULLET_RADIUS: f64 = 5.0;
/// Distance from a player's centre at which a shot strikes
pub const HIT_RADIUS: f64 = 20.0;

/// Active projectile
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub id: Uuid,
    pub owner_id: SessionId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub bounces: u32,
}

/// Result of moving a shot against the static arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Continue,
    Bounced,
    /// Bounce budget exhausted
    Removed,
}

/// Full per-tick outcome for one shot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    Continue,
    Bounced,
    Removed,
    Hit(SessionId),
}

impl ShotOutcome {
    pub fn is_live(&self) -> bool {
        matches!(self, ShotOutcome::Continue | ShotOutcome::Bounced)
    }
}

impl Shot {
    /// Fire from `origin` along `aim`. Returns `None` for a degenerate aim.
    pub fn fire(owner_id: SessionId, origin: Vec2, aim: Vec2) -> Option<Self> {
        let direction = aim.normalize()?;
        Some(Self {
            id: Uuid::new_v4(),
            owner_id,
            position: origin,
            velocity: direction * SHOT_SPEED,
            bounces: 0,
        })
    }

    pub fn has_bounce_budget(&self) -> bool {
        self.bounces < MAX_BOUNCES
    }

    /// The owner is immune until the shot has bounced at least once
    pub fn can_strike(&self, player_id: &SessionId) -> bool {
        *player_id != self.owner_id || self.bounces > 0
    }

    fn bounce(&mut self, axes: &[Axis]) {
        for axis in axes {
            self.velocity = reflect(*axis, self.velocity);
        }
        self.bounces += 1;
    }

    fn bounce_off_border(&mut self, arena: &Arena) -> Motion {
        let mut motion = Motion::Continue;

        let crossed_x = (self.position.x <= 0.0 && self.velocity.x < 0.0)
            || (self.position.x >= arena.width() && self.velocity.x > 0.0);
        if crossed_x {
            if !self.has_bounce_budget() {
                return Motion::Removed;
            }
            self.bounce(&[Axis::X]);
            self.position.x = self.position.x.clamp(0.0, arena.width());
            motion = Motion::Bounced;
        }

        let crossed_y = (self.position.y <= 0.0 && self.velocity.y < 0.0)
            || (self.position.y >= arena.height() && self.velocity.y > 0.0);
        if crossed_y {
            if !self.has_bounce_budget() {
                return Motion::Removed;
            }
            self.bounce(&[Axis::Y]);
            self.position.y = self.position.y.clamp(0.0, arena.height());
            motion = Motion::Bounced;
        }

        motion
    }

    /// Earliest wall contact along this tick's travel
    fn first_wall_contact(start: Vec2, travel: Vec2, arena: &Arena) -> Option<Contact> {
        arena
            .walls()
            .iter()
            .filter_map(|wall| sweep_circle_rect(start, travel, BULLET_RADIUS, wall))
            .min_by(|a, b| a.time.total_cmp(&b.time))
    }

    /// Integrate, stopping at the first wall face crossed, then resolve the border
    pub fn advance(&mut self, elapsed_ms: f64, arena: &Arena) -> Motion {
        let start = self.position;
        let travel = self.velocity * elapsed_ms;

        let mut motion = Motion::Continue;
        match Self::first_wall_contact(start, travel, arena) {
            Some(contact) => {
                if !self.has_bounce_budget() {
                    return Motion::Removed;
                }
                // The rest of the step is dropped at the face
                self.position = start + travel * contact.time;
                match (contact.reflect_x, contact.reflect_y) {
                    (true, true) => self.bounce(&[Axis::X, Axis::Y]),
                    (true, false) => self.bounce(&[Axis::X]),
                    (false, true) => self.bounce(&[Axis::Y]),
                    (false, false) => self.bounce(&[]),
                }
                motion = Motion::Bounced;
            }
            None => self.position = start + travel,
        }

        match self.bounce_off_border(arena) {
            Motion::Continue => motion,
            other => other,
        }
    }
}

/// Projectile simulator used by the game state each tick
pub struct ProjectileSystem;

impl ProjectileSystem {
    /// Nearest player the shot strikes, if any
    pub fn find_hit<'a, I>(shot: &Shot, candidates: I) -> Option<SessionId>
    where
        I: IntoIterator<Item = &'a Player>,
    {
        candidates
            .into_iter()
            .filter(|player| shot.can_strike(&player.id))
            .map(|player| (player.id, shot.position.distance(player.center())))
            .filter(|(_, distance)| *distance < HIT_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Advance one shot by `elapsed_ms` and check it against `candidates`.
    ///
    /// Border and wall bounces are resolved first; a shot that exhausts its
    /// budget is removed without scoring.
    pub fn simulate<'a, I>(shot: &mut Shot, elapsed_ms: f64, arena: &Arena, candidates: I) -> ShotOutcome
    where
        I: IntoIterator<Item = &'a Player>,
    {
        let motion = shot.advance(elapsed_ms, arena);
        if motion == Motion::Removed {
            return ShotOutcome::Removed;
        }

        if let Some(target) = Self::find_hit(shot, candidates) {
            return ShotOutcome::Hit(target);
        }

        match motion {
            Motion::Bounced => ShotOutcome::Bounced,
            _ => ShotOutcome::Continue,
        }
    }
}
