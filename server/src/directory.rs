//! Game directory and matchmaking: owns every live game, hands out unique
//! ids, finds open seats for random joins, and retires games once both
//! players have left.

use crate::game::Game;
use crate::registry::GameId;
use log::info;
use rand::Rng;
use std::collections::HashMap;

/// Random ids are drawn below this bound. The directory stays tiny in
/// practice, so collisions are rare and the retry loop is cheap.
const ID_SPACE: GameId = 10_000;
const MAX_ID_ATTEMPTS: usize = 16;

/// Owns all live games, keyed by id. Every key equals `game.id()`.
pub struct GameDirectory {
    games: HashMap<GameId, Game>,
    next_fallback_id: GameId,
}

impl Default for GameDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl GameDirectory {
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
            next_fallback_id: 0,
        }
    }

    /// Creates and stores a new game under a fresh random id. If the random
    /// draw keeps colliding, falls back to a monotonic scan so creation
    /// always terminates even under dense occupancy.
    pub fn create_game(&mut self, is_rematch: bool) -> GameId {
        let id = self.unused_id();
        self.games.insert(id, Game::new(id, is_rematch));
        info!("Created game {} (total games: {})", id, self.games.len());
        id
    }

    fn unused_id(&mut self) -> GameId {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = rng.gen_range(0..ID_SPACE);
            if !self.games.contains_key(&id) {
                return id;
            }
        }
        loop {
            let id = self.next_fallback_id;
            self.next_fallback_id = self.next_fallback_id.wrapping_add(1);
            if !self.games.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn get(&self, id: GameId) -> Option<&Game> {
        self.games.get(&id)
    }

    pub fn get_mut(&mut self, id: GameId) -> Option<&mut Game> {
        self.games.get_mut(&id)
    }

    /// First game with an open seat, in unspecified map order.
    pub fn find_random_open_game(&self) -> Option<GameId> {
        self.games
            .values()
            .find(|game| game.is_accepting())
            .map(Game::id)
    }

    /// Drops the game iff both seats are empty. Invoked after every player
    /// departure.
    pub fn retire_if_empty(&mut self, id: GameId) -> bool {
        let empty = self.games.get(&id).is_some_and(Game::is_empty);
        if empty {
            self.games.remove(&id);
            info!("Retired game {} (total games: {})", id, self.games.len());
        }
        empty
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_matching_key() {
        let mut directory = GameDirectory::new();
        let id = directory.create_game(false);
        assert_eq!(directory.get(id).unwrap().id(), id);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_created_ids_are_unique() {
        let mut directory = GameDirectory::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let id = directory.create_game(false);
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }

    #[test]
    fn test_creation_survives_dense_occupancy() {
        let mut directory = GameDirectory::new();
        // Push occupancy high enough that random draws collide frequently;
        // the fallback scan must keep ids unique anyway.
        for _ in 0..ID_SPACE / 2 {
            directory.create_game(false);
        }
        assert_eq!(directory.len() as GameId, ID_SPACE / 2);
    }

    #[test]
    fn test_find_random_open_game() {
        let mut directory = GameDirectory::new();
        assert_eq!(directory.find_random_open_game(), None);

        let id = directory.create_game(false);
        assert_eq!(directory.find_random_open_game(), Some(id));

        // Fill the game: no longer open
        directory.get_mut(id).unwrap().add_player(1);
        directory.get_mut(id).unwrap().add_player(2);
        assert_eq!(directory.find_random_open_game(), None);
    }

    #[test]
    fn test_retire_only_when_empty() {
        let mut directory = GameDirectory::new();
        let id = directory.create_game(false);
        directory.get_mut(id).unwrap().add_player(1);

        assert!(!directory.retire_if_empty(id));
        assert!(directory.get(id).is_some());

        directory.get_mut(id).unwrap().remove_user(1);
        assert!(directory.retire_if_empty(id));
        assert!(directory.get(id).is_none());
    }

    #[test]
    fn test_retire_unknown_id_is_noop() {
        let mut directory = GameDirectory::new();
        assert!(!directory.retire_if_empty(42));
    }

    #[test]
    fn test_rematch_flag_carried() {
        let mut directory = GameDirectory::new();
        let id = directory.create_game(true);
        assert!(directory.get(id).unwrap().is_rematch());
    }
}
