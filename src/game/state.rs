//! Authoritative game state - players, shots and the operations that mutate them

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::{as_sim_millis, SharedClock};

use super::arena::Arena;
use super::geometry::Vec2;
use super::movement::{Direction, MovementData, MovementSystem, MOVE_STEP, PLAYER_SIZE};
use super::projectile::{ProjectileSystem, Shot, ShotOutcome};
use super::snapshot::{HitRecord, PlayerMoved, PlayerSnapshot, ShotSnapshot, TickReport};
use super::spawn::{SpawnError, SpawnLocator};
use super::SessionId;

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: SessionId,
    pub username: String,
    pub color: String,
    /// Top-left corner of the player's footprint
    pub position: Vec2,
    pub movement: MovementData,
    /// Clock reading of the last accepted move
    pub last_move_at: Option<Duration>,
}

impl Player {
    pub fn new(id: SessionId, username: String, color: String, position: Vec2) -> Self {
        Self {
            id,
            username,
            color,
            position,
            movement: MovementData::default(),
            last_move_at: None,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.position + Vec2::new(PLAYER_SIZE / 2.0, PLAYER_SIZE / 2.0)
    }
}

/// Game state errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Session {0} already has an active player")]
    AlreadyActive(SessionId),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

impl GameError {
    /// Short machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::AlreadyActive(_) => "already_active",
            GameError::Spawn(_) => "no_spawn",
        }
    }
}

/// Owns every player and shot. Only mutated through its methods, from a
/// single task.
pub struct GameState {
    arena: Arc<Arena>,
    players: HashMap<SessionId, Player>,
    shots: Vec<Shot>,
    spawner: SpawnLocator,
    clock: SharedClock,
}

impl GameState {
    pub fn new(arena: Arc<Arena>, spawner: SpawnLocator, clock: SharedClock) -> Self {
        Self {
            arena,
            players: HashMap::new(),
            shots: Vec::new(),
            spawner,
            clock,
        }
    }

    pub fn shared_arena(&self) -> Arc<Arena> {
        self.arena.clone()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn players_snapshot(&self) -> Vec<PlayerSnapshot> {
        self.players.values().map(PlayerSnapshot::from).collect()
    }

    pub fn shots_snapshot(&self) -> Vec<ShotSnapshot> {
        self.shots.iter().map(ShotSnapshot::from).collect()
    }

    /// Place a new player and return every player for redistribution
    pub fn join(
        &mut self,
        id: SessionId,
        username: String,
        color: String,
    ) -> Result<Vec<PlayerSnapshot>, GameError> {
        if self.players.contains_key(&id) {
            return Err(GameError::AlreadyActive(id));
        }

        let position = self.spawner.find_spawn(&self.players, &self.arena)?;
        info!(
            session_id = %id,
            username = %username,
            x = position.x,
            y = position.y,
            "Player joined"
        );
        self.players
            .insert(id, Player::new(id, username, color, position));

        Ok(self.players_snapshot())
    }

    /// Remove a player. Returns false if there was none.
    pub fn leave(&mut self, id: &SessionId) -> bool {
        let removed = self.players.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Player left");
        }
        removed
    }

    /// Apply one movement step if the cooldown allows it and the target is free
    pub fn move_player(&mut self, id: &SessionId, direction: Direction) -> Option<PlayerMoved> {
        let now = self.clock.now();
        let player = self.players.get(id)?;

        if !MovementSystem::cooldown_elapsed(player.last_move_at, now) {
            debug!(session_id = %id, "Move dropped by cooldown");
            return None;
        }

        let candidate = MovementSystem::propose_move(player, direction);
        if !MovementSystem::validate_move(candidate, id, &self.players, &self.arena) {
            debug!(session_id = %id, %direction, "Move blocked");
            return None;
        }

        let player = self.players.get_mut(id)?;
        player.position = candidate;
        player.movement = MovementData {
            direction,
            speed: MOVE_STEP,
        };
        player.last_move_at = Some(now);

        Some(PlayerMoved {
            id: *id,
            x: candidate.x,
            y: candidate.y,
        })
    }

    /// Fire a shot from the player's footprint centre along `aim`
    pub fn shoot(&mut self, id: &SessionId, aim: Vec2) -> Option<Uuid> {
        let player = self.players.get(id)?;
        let Some(shot) = Shot::fire(*id, player.center(), aim) else {
            debug!(session_id = %id, "Shot with degenerate aim ignored");
            return None;
        };

        let shot_id = shot.id;
        self.shots.push(shot);
        Some(shot_id)
    }

    /// Advance every shot by `elapsed` and remove struck players
    pub fn tick(&mut self, elapsed: Duration) -> TickReport {
        let elapsed_ms = as_sim_millis(elapsed);
        let mut hits: Vec<HitRecord> = Vec::new();

        let players = &self.players;
        let arena = &self.arena;
        self.shots.retain_mut(|shot| {
            // A player struck earlier this tick is already out
            let candidates = players
                .values()
                .filter(|p| !hits.iter().any(|hit| hit.hit_id == p.id));

            match ProjectileSystem::simulate(shot, elapsed_ms, arena, candidates) {
                ShotOutcome::Hit(target) => {
                    hits.push(HitRecord {
                        hit_id: target,
                        shooter_id: shot.owner_id,
                        shot_id: shot.id,
                    });
                    false
                }
                outcome => outcome.is_live(),
            }
        });

        let mut removed_player_ids = Vec::with_capacity(hits.len());
        for hit in &hits {
            if self.players.remove(&hit.hit_id).is_some() {
                info!(
                    session_id = %hit.hit_id,
                    shooter_id = %hit.shooter_id,
                    shot_id = %hit.shot_id,
                    "Player hit"
                );
                removed_player_ids.push(hit.hit_id);
            }
        }

        TickReport {
            removed_player_ids,
            hits,
            shots: self.shots_snapshot(),
        }
    }

    #[cfg(test)]
    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    #[cfg(test)]
    pub(crate) fn player(&self, id: &SessionId) -> Option<&Player> {
        self.players.get(id)
    }

    #[cfg(test)]
    pub(crate) fn shots(&self) -> &[Shot] {
        &self.shots
    }

    #[cfg(test)]
    pub(crate) fn place_player(&mut self, id: SessionId, position: Vec2) {
        self.players
            .insert(id, Player::new(id, "test".into(), "green".into(), position));
    }

    #[cfg(test)]
    pub(crate) fn push_shot(&mut self, shot: Shot) {
        self.shots.push(shot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::circles_overlap;
    use crate::game::movement::COLLISION_RADIUS;
    use crate::game::projectile::{MAX_BOUNCES, SHOT_SPEED};
    use crate::util::time::ManualClock;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const EPSILON: f64 = 1e-9;

    fn game_with(arena: Arena) -> (GameState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let game = GameState::new(Arc::new(arena), SpawnLocator::new(11), clock.clone());
        (game, clock)
    }

    fn open_game() -> (GameState, Arc<ManualClock>) {
        game_with(Arena::open(1100.0, 700.0).unwrap())
    }

    #[test]
    fn join_returns_everyone_and_rejects_duplicates() {
        let (mut game, _) = game_with(Arena::standard().unwrap());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let roster = game.join(a, "alice".into(), "#f00".into()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, "alice");

        let roster = game.join(b, "bob".into(), "#00f".into()).unwrap();
        assert_eq!(roster.len(), 2);

        assert_eq!(
            game.join(a, "again".into(), "#f00".into()),
            Err(GameError::AlreadyActive(a))
        );
        assert_eq!(game.player_count(), 2);
    }

    #[test]
    fn join_fails_cleanly_on_a_full_board() {
        let (mut game, _) = game_with(Arena::open(20.0, 20.0).unwrap());
        game.join(Uuid::new_v4(), "first".into(), "red".into()).unwrap();
        let err = game
            .join(Uuid::new_v4(), "second".into(), "red".into())
            .unwrap_err();
        assert_eq!(err, GameError::Spawn(SpawnError::NoFreeCell));
        assert_eq!(err.code(), "no_spawn");
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn joined_players_never_overlap() {
        let (mut game, _) = game_with(Arena::standard().unwrap());
        for _ in 0..40 {
            game.join(Uuid::new_v4(), "p".into(), "c".into()).unwrap();
        }
        let snapshot = game.players_snapshot();
        for a in &snapshot {
            for b in &snapshot {
                if a.id != b.id {
                    assert!(!circles_overlap(
                        Vec2::new(a.x, a.y),
                        Vec2::new(b.x, b.y),
                        COLLISION_RADIUS
                    ));
                }
            }
        }
    }

    #[test]
    fn leave_is_idempotent() {
        let (mut game, _) = open_game();
        let id = Uuid::new_v4();
        game.place_player(id, Vec2::new(100.0, 100.0));
        assert!(game.leave(&id));
        assert!(!game.leave(&id));
        assert!(game.player(&id).is_none());
    }

    #[test]
    fn joined_player_moves_up() {
        let (mut game, clock) = open_game();
        let id = Uuid::new_v4();
        game.join(id, "p".into(), "c".into()).unwrap();

        if game.player(&id).unwrap().position.y < MOVE_STEP {
            game.move_player(&id, Direction::Down).unwrap();
            clock.advance_millis(100);
        }

        let before = game.player(&id).unwrap().position;
        let moved = game.move_player(&id, Direction::Up).unwrap();
        assert_eq!(moved.x, before.x);
        assert_eq!(moved.y, before.y - 5.0);
        let player = game.player(&id).unwrap();
        assert_eq!(player.position, Vec2::new(before.x, before.y - 5.0));
        assert_eq!(player.movement.direction, Direction::Up);
        assert_eq!(player.movement.speed, MOVE_STEP);
    }

    #[test]
    fn moves_are_rate_limited() {
        let (mut game, clock) = open_game();
        let id = Uuid::new_v4();
        game.place_player(id, Vec2::new(100.0, 100.0));

        assert!(game.move_player(&id, Direction::Right).is_some());
        clock.advance_millis(50);
        assert!(game.move_player(&id, Direction::Right).is_none());
        clock.advance_millis(49);
        assert!(game.move_player(&id, Direction::Right).is_none());
        clock.advance_millis(1);
        assert!(game.move_player(&id, Direction::Right).is_some());

        assert_eq!(game.player(&id).unwrap().position, Vec2::new(110.0, 100.0));
    }

    #[test]
    fn blocked_move_does_not_start_cooldown() {
        let (mut game, _) = open_game();
        let mover = Uuid::new_v4();
        game.place_player(mover, Vec2::new(100.0, 100.0));
        game.place_player(Uuid::new_v4(), Vec2::new(120.0, 100.0));

        assert!(game.move_player(&mover, Direction::Right).is_none());
        assert!(game.move_player(&mover, Direction::Left).is_some());
    }

    #[test]
    fn move_for_unknown_session_is_ignored() {
        let (mut game, _) = open_game();
        assert!(game.move_player(&Uuid::new_v4(), Direction::Up).is_none());
    }

    #[test]
    fn random_walk_keeps_invariants() {
        let (mut game, clock) = game_with(Arena::standard().unwrap());
        let ids: Vec<SessionId> = (0..12).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            game.join(*id, "walker".into(), "c".into()).unwrap();
        }

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let directions = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
        for _ in 0..2_000 {
            let id = ids[rng.gen_range(0..ids.len())];
            let before = game.player(&id).unwrap().position;
            if let Some(moved) = game.move_player(&id, directions[rng.gen_range(0..4)]) {
                let step = (moved.x - before.x).abs() + (moved.y - before.y).abs();
                assert!((step - MOVE_STEP).abs() < EPSILON);
                assert!(moved.x == before.x || moved.y == before.y);
            }
            clock.advance_millis(rng.gen_range(0..60));
        }

        let arena = game.arena().clone();
        let players: Vec<Player> = ids.iter().map(|id| game.player(id).unwrap().clone()).collect();
        for p in &players {
            assert!(arena.contains_square(p.position, PLAYER_SIZE));
            assert!(MovementSystem::validate_move(p.position, &p.id, &game.players, &arena));
        }
    }

    #[test]
    fn shot_travels_along_aim() {
        let (mut game, _) = open_game();
        let id = Uuid::new_v4();
        game.place_player(id, Vec2::new(100.0, 100.0));

        let shot_id = game.shoot(&id, Vec2::new(1.0, 0.0)).unwrap();
        let shot = game.shots()[0].clone();
        assert_eq!(shot.id, shot_id);
        assert_eq!(shot.velocity, Vec2::new(SHOT_SPEED, 0.0));
        assert_eq!(shot.position, Vec2::new(110.0, 110.0));

        let report = game.tick(Duration::from_millis(10));
        assert!(report.hits.is_empty());
        assert_eq!(report.shots.len(), 1);
        assert!((report.shots[0].x - (110.0 + SHOT_SPEED * 10.0)).abs() < EPSILON);
        assert_eq!(report.shots[0].y, 110.0);
    }

    #[test]
    fn shoot_without_player_or_aim_is_ignored() {
        let (mut game, _) = open_game();
        assert!(game.shoot(&Uuid::new_v4(), Vec2::new(1.0, 0.0)).is_none());

        let id = Uuid::new_v4();
        game.place_player(id, Vec2::new(100.0, 100.0));
        assert!(game.shoot(&id, Vec2::default()).is_none());
        assert!(game.shoot(&id, Vec2::new(f64::NAN, 1.0)).is_none());
        assert!(game.shots().is_empty());
    }

    #[test]
    fn exhausted_shot_is_removed_without_hit() {
        let (mut game, _) = open_game();
        let bystander = Uuid::new_v4();
        game.place_player(bystander, Vec2::new(0.0, 290.0));
        game.push_shot(Shot {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            position: Vec2::new(1.0, 300.0),
            velocity: Vec2::new(-SHOT_SPEED, 0.0),
            bounces: MAX_BOUNCES,
        });

        let report = game.tick(Duration::from_millis(5));
        assert!(report.shots.is_empty());
        assert!(report.hits.is_empty());
        assert!(report.removed_player_ids.is_empty());
        assert!(game.player(&bystander).is_some());
    }

    #[test]
    fn hit_removes_target_and_records_once() {
        let (mut game, _) = open_game();
        let shooter = Uuid::new_v4();
        let target = Uuid::new_v4();
        game.place_player(shooter, Vec2::new(100.0, 100.0));
        game.place_player(target, Vec2::new(140.0, 100.0));

        game.shoot(&shooter, Vec2::new(1.0, 0.0)).unwrap();
        let report = game.tick(Duration::from_millis(20));

        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].hit_id, target);
        assert_eq!(report.hits[0].shooter_id, shooter);
        assert_eq!(report.removed_player_ids, vec![target]);
        assert!(report.shots.is_empty());
        assert_eq!(game.player_count(), 1);
        assert!(game.player(&target).is_none());
        assert!(game.player(&shooter).is_some());
    }

    #[test]
    fn owner_is_not_hit_by_fresh_shot() {
        let (mut game, _) = open_game();
        let id = Uuid::new_v4();
        game.place_player(id, Vec2::new(100.0, 100.0));
        game.shoot(&id, Vec2::new(0.0, 1.0)).unwrap();

        let report = game.tick(Duration::from_millis(1));
        assert!(report.hits.is_empty());
        assert_eq!(report.shots.len(), 1);
    }

    #[test]
    fn two_shots_one_target_scores_once() {
        let (mut game, _) = open_game();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let target = Uuid::new_v4();
        game.place_player(a, Vec2::new(100.0, 100.0));
        game.place_player(b, Vec2::new(180.0, 100.0));
        game.place_player(target, Vec2::new(140.0, 100.0));

        game.shoot(&a, Vec2::new(1.0, 0.0)).unwrap();
        game.shoot(&b, Vec2::new(-1.0, 0.0)).unwrap();
        let report = game.tick(Duration::from_millis(20));

        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.removed_player_ids, vec![target]);
        // The second shot flies on
        assert_eq!(report.shots.len(), 1);
    }

    #[test]
    fn shots_outlive_their_owner() {
        let (mut game, _) = open_game();
        let shooter = Uuid::new_v4();
        let target = Uuid::new_v4();
        game.place_player(shooter, Vec2::new(100.0, 100.0));
        game.place_player(target, Vec2::new(200.0, 100.0));

        game.shoot(&shooter, Vec2::new(1.0, 0.0)).unwrap();
        assert!(game.leave(&shooter));

        let mut hit = None;
        for _ in 0..20 {
            let report = game.tick(Duration::from_millis(10));
            if let Some(record) = report.hits.first() {
                hit = Some(*record);
                break;
            }
        }
        let hit = hit.unwrap();
        assert_eq!(hit.hit_id, target);
        assert_eq!(hit.shooter_id, shooter);
    }
}
