//! Session coordinator: the single serialization point for all game state.
//!
//! One task owns the registry, the directory, and every connection's
//! outbound sender, and drains one inbound channel. Each message is handled
//! start to finish before the next is dequeued, so no two operations on the
//! same game ever interleave and a disconnect can never race an in-flight
//! turn. Outbound delivery is a non-blocking channel send; the coordinator
//! never waits on a peer.

use crate::directory::GameDirectory;
use crate::game::{Notice, Phase};
use crate::registry::{ConnectionId, GameId, SessionRegistry};
use log::{debug, info, warn};
use shared::{ClientEvent, ServerEvent, CREATE_GAME, JOIN_RANDOM};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Messages from the transport gateway to the coordinator task.
#[derive(Debug)]
pub enum Inbound {
    Connected {
        conn_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    },
    Event {
        conn_id: ConnectionId,
        event: ClientEvent,
    },
    Disconnected {
        conn_id: ConnectionId,
    },
}

/// Owns all mutable server state and processes inbound messages one at a
/// time.
pub struct Coordinator {
    registry: SessionRegistry,
    directory: GameDirectory,
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
}

impl Coordinator {
    pub fn new(inbound_rx: mpsc::UnboundedReceiver<Inbound>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            directory: GameDirectory::new(),
            senders: HashMap::new(),
            inbound_rx,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &GameDirectory {
        &self.directory
    }

    /// Drains the inbound channel until every gateway sender is dropped.
    pub async fn run(mut self) {
        info!("Session coordinator running");
        while let Some(message) = self.inbound_rx.recv().await {
            self.handle(message);
        }
        info!("Session coordinator stopped");
    }

    /// Handles one inbound message to completion. Public so tests can
    /// drive the coordinator without sockets.
    pub fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Connected { conn_id, sender } => {
                self.senders.insert(conn_id, sender);
                info!("Connection {} established", conn_id);
            }
            Inbound::Event { conn_id, event } => self.handle_event(conn_id, event),
            Inbound::Disconnected { conn_id } => self.handle_disconnect(conn_id),
        }
    }

    fn handle_event(&mut self, conn_id: ConnectionId, event: ClientEvent) {
        // Anything but registration requires a registered user.
        if !matches!(event, ClientEvent::RegisterRequest { .. })
            && self.registry.get(conn_id).is_none()
        {
            warn!(
                "Dropping event from unregistered connection {}: {:?}",
                conn_id, event
            );
            return;
        }

        match event {
            ClientEvent::RegisterRequest { username } => {
                let username = self
                    .registry
                    .register(conn_id, username.as_deref())
                    .username
                    .clone();
                self.send(conn_id, ServerEvent::RegisterResponse { username });
            }
            ClientEvent::UsernameUpdate {
                username,
                game_to_join_id,
            } => match self.registry.rename(conn_id, &username) {
                Ok(user) => {
                    let username = user.username.clone();
                    self.send(
                        conn_id,
                        ServerEvent::UsernameUpdateResponse {
                            username,
                            game_to_join_id,
                        },
                    );
                }
                Err(e) => self.game_error(conn_id, &e.to_string(), false),
            },
            ClientEvent::EnterGame(id) => self.handle_enter_game(conn_id, id),
            ClientEvent::PlayTurn(column) => self.handle_play_turn(conn_id, column),
            ClientEvent::RematchRequest => self.handle_rematch(conn_id),
            ClientEvent::LeaveGame => self.handle_leave(conn_id),
        }
    }

    fn handle_enter_game(&mut self, conn_id: ConnectionId, id: i64) {
        if self
            .registry
            .get(conn_id)
            .and_then(|user| user.current_game)
            .is_some()
        {
            self.game_error(conn_id, "You are already in a game!", false);
            return;
        }

        let game_id = match id {
            CREATE_GAME => self.directory.create_game(false),
            // A random join with nothing open creates the game instead of
            // bouncing the player back to the menu.
            JOIN_RANDOM => match self.directory.find_random_open_game() {
                Some(open) => open,
                None => self.directory.create_game(false),
            },
            id if id >= 0 => {
                let game_id = match GameId::try_from(id) {
                    Ok(game_id) => game_id,
                    Err(_) => {
                        self.game_error(conn_id, "Game with that id doesn't exist!", false);
                        return;
                    }
                };
                match self.directory.get(game_id) {
                    None => {
                        self.game_error(conn_id, "Game with that id doesn't exist!", false);
                        return;
                    }
                    Some(game) if !game.is_accepting() => {
                        self.game_error(conn_id, "Game is full!", false);
                        return;
                    }
                    Some(_) => game_id,
                }
            }
            _ => {
                self.game_error(conn_id, "Game with that id doesn't exist!", false);
                return;
            }
        };
        self.seat_user(conn_id, game_id);
    }

    /// Seats a player, replies `gameJoined`, and fires the start sequence
    /// (`gameStarted` to both, then the first `turnNotify`) when the seat
    /// filled the game.
    fn seat_user(&mut self, conn_id: ConnectionId, game_id: GameId) {
        let seated = match self.directory.get_mut(game_id) {
            Some(game) => game.add_player(conn_id).map(|team| {
                (
                    game.descriptor(team),
                    game.phase() == Phase::WaitingToStart,
                    game.players().collect::<Vec<_>>(),
                )
            }),
            None => {
                self.game_error(conn_id, "Game with that id doesn't exist!", false);
                return;
            }
        };
        let Some((descriptor, now_full, players)) = seated else {
            self.game_error(conn_id, "Game is full!", false);
            return;
        };

        if let Some(user) = self.registry.get_mut(conn_id) {
            user.current_game = Some(game_id);
        }
        self.send(conn_id, ServerEvent::GameJoined(descriptor));

        if now_full {
            let usernames: Vec<String> = players
                .iter()
                .map(|&player| {
                    self.registry
                        .get(player)
                        .map(|user| user.username.clone())
                        .unwrap_or_default()
                })
                .collect();
            for &player in &players {
                self.send(player, ServerEvent::GameStarted(usernames.clone()));
            }
            let notices = match self.directory.get_mut(game_id) {
                Some(game) => game.start(),
                None => Vec::new(),
            };
            self.dispatch(notices);
        }
    }

    fn handle_play_turn(&mut self, conn_id: ConnectionId, column: i64) {
        let Some(game_id) = self
            .registry
            .get(conn_id)
            .and_then(|user| user.current_game)
        else {
            self.game_error(conn_id, "You are not in a game!", false);
            return;
        };

        let played = self
            .directory
            .get_mut(game_id)
            .map(|game| game.play_turn(conn_id, column));
        match played {
            Some(Ok(notices)) => self.dispatch(notices),
            Some(Err(e)) => {
                debug!("Rejected turn from connection {}: {}", conn_id, e);
                self.game_error(conn_id, &e.to_string(), false);
            }
            None => {
                // Dangling binding; the game is gone, fix the user up.
                if let Some(user) = self.registry.get_mut(conn_id) {
                    user.current_game = None;
                }
                self.game_error(conn_id, "You are not in a game!", false);
            }
        }
    }

    /// Rematch flow: the first requester of a finished game creates the
    /// successor and records the link on the old game; the second follows
    /// the link and fills the successor. A stale link (successor retired,
    /// or filled by a stranger via random join) is treated as absent and
    /// re-pointed at a fresh game.
    fn handle_rematch(&mut self, conn_id: ConnectionId) {
        let Some(game_id) = self
            .registry
            .get(conn_id)
            .and_then(|user| user.current_game)
        else {
            self.game_error(conn_id, "You are not in a game!", false);
            return;
        };

        let current = self
            .directory
            .get(game_id)
            .map(|game| (game.phase(), game.rematch_link()));
        let Some((phase, link)) = current else {
            if let Some(user) = self.registry.get_mut(conn_id) {
                user.current_game = None;
            }
            self.game_error(conn_id, "You are not in a game!", false);
            return;
        };
        if phase != Phase::Finished {
            self.game_error(conn_id, "The game is not over yet!", false);
            return;
        }

        let successor = link.filter(|&candidate| {
            self.directory
                .get(candidate)
                .is_some_and(|game| game.is_accepting())
        });
        let successor = match successor {
            Some(successor) => successor,
            None => {
                let successor = self.directory.create_game(true);
                if let Some(old) = self.directory.get_mut(game_id) {
                    old.set_rematch_link(successor);
                }
                successor
            }
        };

        // Leave the finished game first; it retires once both are gone.
        if let Some(old) = self.directory.get_mut(game_id) {
            old.remove_user(conn_id);
        }
        if let Some(user) = self.registry.get_mut(conn_id) {
            user.current_game = None;
        }
        self.directory.retire_if_empty(game_id);

        self.seat_user(conn_id, successor);
    }

    /// Removes the user from their current game, tells a mid-game opponent
    /// the game is gone, and retires the game once empty.
    fn handle_leave(&mut self, conn_id: ConnectionId) {
        let Some(game_id) = self
            .registry
            .get(conn_id)
            .and_then(|user| user.current_game)
        else {
            debug!("Connection {} left without being in a game", conn_id);
            return;
        };

        let mut abandoned_opponent = None;
        if let Some(game) = self.directory.get_mut(game_id) {
            let was_in_progress = game.phase() == Phase::InProgress;
            if game.remove_user(conn_id) && was_in_progress {
                abandoned_opponent = game.opponent_of(conn_id);
            }
        }
        if let Some(user) = self.registry.get_mut(conn_id) {
            user.current_game = None;
        }
        self.directory.retire_if_empty(game_id);

        if let Some(opponent) = abandoned_opponent {
            self.send(opponent, ServerEvent::GameClosed);
        }
    }

    /// Disconnect is an implicit leave followed by deregistration.
    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        self.handle_leave(conn_id);
        self.registry.unregister(conn_id);
        self.senders.remove(&conn_id);
        info!("Connection {} closed", conn_id);
    }

    fn send(&self, to: ConnectionId, event: ServerEvent) {
        match self.senders.get(&to) {
            Some(sender) => {
                if sender.send(event).is_err() {
                    debug!("Connection {} hung up before delivery", to);
                }
            }
            None => warn!("No outbound channel for connection {}", to),
        }
    }

    fn dispatch(&self, notices: Vec<Notice>) {
        for notice in notices {
            self.send(notice.to, notice.event);
        }
    }

    fn game_error(&self, to: ConnectionId, message: &str, go_home: bool) {
        self.send(
            to,
            ServerEvent::GameError {
                message: message.to_string(),
                go_home,
            },
        );
    }
}
