//! # Connect-Four Game Server Library
//!
//! This library provides the authoritative server for a real-time
//! two-player Connect-Four game played over WebSockets. The server owns
//! board state, turn order, win detection, and the whole game lifecycle;
//! browser clients only render what they are told and submit requests.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! Every board mutation happens here. Clients send typed requests
//! (register, enter a game, play a column, rematch, leave) and receive
//! typed notifications; an invalid or out-of-turn request is rejected
//! without mutating anything.
//!
//! ### Matchmaking
//! The game directory creates games under unique random ids, pairs random
//! joiners with open games, links finished games to their rematch
//! successors, and retires games once both players have left.
//!
//! ### Session Management
//! Each connection is bound to a user identity (a sanitized or generated
//! username plus an optional current-game id). Disconnects cascade: the
//! user leaves their game, a mid-game opponent is notified, the empty game
//! is retired, and the identity is dropped.
//!
//! ## Architecture
//!
//! ### Single Coordinator Task
//! All mutable state (registry, directory, games) is owned by one task
//! that drains one inbound channel. Each message is processed to
//! completion before the next, so turns, joins, and disconnects against
//! the same game never interleave and no per-game locks are needed.
//!
//! ### WebSocket Gateway
//! The transport layer accepts sockets, parses JSON text frames into
//! [`shared::ClientEvent`] values, and forwards them to the coordinator.
//! Outbound [`shared::ServerEvent`] values travel a per-connection channel
//! to a writer task; sending never waits on a peer.
//!
//! ## Module Organization
//!
//! - [`board`]: pure grid engine for chip placement, win and draw detection
//! - [`game`]: one match: seating, turn arbitration, notification batches
//! - [`registry`]: connection-to-user mapping and username handling
//! - [`directory`]: game storage, id assignment, matchmaking, retirement
//! - [`session`]: the serialized coordinator and protocol handlers
//! - [`network`]: the WebSocket accept loop and per-socket tasks

pub mod board;
pub mod directory;
pub mod game;
pub mod network;
pub mod registry;
pub mod session;
