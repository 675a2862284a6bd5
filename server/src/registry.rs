//! Session registry mapping live connections to user identities
//!
//! This module handles the server-side bookkeeping for connected players:
//! - Registration and renaming with username sanitation
//! - Random username generation for clients that arrive without one
//! - The weak back-reference from a user to their current game
//! - Cleanup on disconnect
//!
//! The registry knows nothing about boards or matchmaking; it only answers
//! "who is this connection" and "which game are they in".

use log::info;
use rand::seq::SliceRandom;
use shared::MAX_USERNAME_LEN;
use std::collections::HashMap;
use thiserror::Error;

/// Stable identity of one client connection for its lifetime.
pub type ConnectionId = u64;

/// Directory key of a game instance.
pub type GameId = u32;

/// Why a requested username was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    #[error("username must contain letters or numbers")]
    Empty,
}

/// A registered player bound to one connection
///
/// `current_game` is a plain identifier, never a reference: dropping the
/// user must not keep a game alive, and a missing id simply fails lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: ConnectionId,
    pub username: String,
    pub current_game: Option<GameId>,
}

/// Tracks every registered connection and its user identity
pub struct SessionRegistry {
    users: HashMap<ConnectionId, User>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Registers a connection under the requested username, or a generated
    /// one when the request is absent or sanitizes to nothing.
    ///
    /// Registering an already-registered connection renames it in place and
    /// keeps its current game binding, so a client re-sending its register
    /// request cannot orphan a game seat.
    pub fn register(&mut self, conn_id: ConnectionId, requested: Option<&str>) -> &User {
        let username = match requested.map(sanitize_username) {
            Some(name) if !name.is_empty() => name,
            _ => random_username(),
        };

        let user = self.users.entry(conn_id).or_insert_with(|| User {
            id: conn_id,
            username: String::new(),
            current_game: None,
        });
        user.username = username;
        info!("Registered user \"{}\" on connection {}", user.username, conn_id);
        user
    }

    /// Renames an existing user. A name that sanitizes to nothing is
    /// rejected without mutation.
    pub fn rename(&mut self, conn_id: ConnectionId, requested: &str) -> Result<&User, NameError> {
        let username = sanitize_username(requested);
        if username.is_empty() {
            return Err(NameError::Empty);
        }
        let user = self.users.get_mut(&conn_id).ok_or(NameError::Empty)?;
        user.username = username;
        Ok(user)
    }

    pub fn get(&self, conn_id: ConnectionId) -> Option<&User> {
        self.users.get(&conn_id)
    }

    pub fn get_mut(&mut self, conn_id: ConnectionId) -> Option<&mut User> {
        self.users.get_mut(&conn_id)
    }

    /// Removes the user for a closed connection. Returns the removed entry
    /// so the caller can unwind any game membership.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Option<User> {
        let user = self.users.remove(&conn_id);
        if let Some(user) = &user {
            info!("Unregistered user \"{}\"", user.username);
        }
        user
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Collapses whitespace runs to single spaces, strips everything that is
/// not alphanumeric or a space, trims, and caps the length.
pub fn sanitize_username(raw: &str) -> String {
    let mut out = String::new();
    let mut last_was_space = true;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if ch.is_whitespace() && !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    let mut out: String = out.chars().take(MAX_USERNAME_LEN).collect();
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

// Entries are capped so any adjective + noun pair fits MAX_USERNAME_LEN.
const ADJECTIVES: &[&str] = &[
    "Artless", "Craven", "Dankish", "Errant", "Fawning", "Frothy", "Goatish", "Jarring",
    "Mangled", "Puny", "Saucy", "Spongey", "Vain", "Warped", "Wayward", "Weedy", "Yeasty",
];
const NOUNS: &[&str] = &[
    "Baggage", "Barnacle", "Bum", "Dewberry", "Dink", "Giglet", "Haggard", "Harpy",
    "Lewdster", "Lout", "Measle", "Minnow", "Nut",
];

/// Generates a Shakespearean-insult style username like "Wayward Minnow".
pub fn random_username() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).unwrap_or(&"Errant");
    let noun = NOUNS.choose(&mut rng).unwrap_or(&"Minnow");
    format!("{} {}", adjective, noun)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_with_name() {
        let mut registry = SessionRegistry::new();
        let user = registry.register(1, Some("Alice"));
        assert_eq!(user.username, "Alice");
        assert_eq!(user.id, 1);
        assert_eq!(user.current_game, None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_without_name_generates_one() {
        let mut registry = SessionRegistry::new();
        let username = registry.register(1, None).username.clone();
        assert!(!username.is_empty());
        assert!(username.len() <= MAX_USERNAME_LEN);
        // Generated names must survive their own sanitation
        assert_eq!(sanitize_username(&username), username);
    }

    #[test]
    fn test_register_with_unusable_name_generates_one() {
        let mut registry = SessionRegistry::new();
        let username = registry.register(1, Some("!!! ###")).username.clone();
        assert!(!username.is_empty());
    }

    #[test]
    fn test_reregister_renames_and_keeps_game() {
        let mut registry = SessionRegistry::new();
        registry.register(1, Some("Alice"));
        registry.get_mut(1).unwrap().current_game = Some(7);

        let user = registry.register(1, Some("Bob"));
        assert_eq!(user.username, "Bob");
        assert_eq!(user.current_game, Some(7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rename_rejects_empty() {
        let mut registry = SessionRegistry::new();
        registry.register(1, Some("Alice"));
        assert_eq!(registry.rename(1, "@#$"), Err(NameError::Empty));
        assert_eq!(registry.get(1).unwrap().username, "Alice");
    }

    #[test]
    fn test_rename_unknown_connection_fails() {
        let mut registry = SessionRegistry::new();
        assert!(registry.rename(99, "Bob").is_err());
    }

    #[test]
    fn test_unregister() {
        let mut registry = SessionRegistry::new();
        registry.register(1, Some("Alice"));
        let removed = registry.unregister(1).unwrap();
        assert_eq!(removed.username, "Alice");
        assert!(registry.is_empty());
        assert!(registry.unregister(1).is_none());
    }

    #[test]
    fn test_sanitize_strips_symbols() {
        assert_eq!(sanitize_username("he<l>lo!"), "hello");
        assert_eq!(sanitize_username("a_b"), "ab");
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize_username("  a   b\t c  "), "a b c");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(50);
        assert_eq!(sanitize_username(&long).len(), MAX_USERNAME_LEN);
    }

    #[test]
    fn test_sanitize_no_trailing_space_after_cap() {
        let tricky = format!("{} {}", "x".repeat(MAX_USERNAME_LEN - 1), "y".repeat(10));
        let out = sanitize_username(&tricky);
        assert!(!out.ends_with(' '));
    }

    #[test]
    fn test_random_username_fits_cap() {
        for _ in 0..50 {
            assert!(random_username().len() <= MAX_USERNAME_LEN);
        }
    }
}
