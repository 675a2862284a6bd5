//! Game instance: couples a board to up to two seated players and owns the
//! turn order, lifecycle phase, and the notification sequence produced by
//! each state change. Delivery is left to the session coordinator; game
//! methods return addressed notices instead of touching sockets.

use crate::board::{Board, PlaceError, Win};
use crate::registry::{ConnectionId, GameId};
use log::info;
use shared::{GameDescriptor, ServerEvent, Slot, BOARD_COLUMNS, BOARD_ROWS, WIN_LENGTH};
use thiserror::Error;

/// Lifecycle phase. Acceptance closes the instant the second player is
/// seated and never reopens; an emptied game is retired, not reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AcceptingPlayers,
    WaitingToStart,
    InProgress,
    Finished,
}

/// Why a submitted turn was rejected. No variant mutates any state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    #[error("The game has not started yet!")]
    NotStarted,
    #[error("The game is already over!")]
    GameOver,
    #[error("You are not part of this game!")]
    NotAPlayer,
    #[error("It is not your turn!")]
    NotYourTurn,
    #[error("That column does not exist!")]
    InvalidColumn,
    #[error("That column is full!")]
    ColumnFull,
}

/// An outbound event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

/// One match between two players. Seat index is the team id; a vacated
/// seat is never re-indexed, so the remaining player keeps their team.
pub struct Game {
    id: GameId,
    board: Board,
    players: [Option<ConnectionId>; 2],
    phase: Phase,
    current_turn_team: u8,
    rematch_link: Option<GameId>,
    is_rematch: bool,
}

impl Game {
    pub fn new(id: GameId, is_rematch: bool) -> Self {
        Self {
            id,
            board: Board::new(BOARD_COLUMNS, BOARD_ROWS, WIN_LENGTH),
            players: [None, None],
            phase: Phase::AcceptingPlayers,
            current_turn_team: 0,
            rematch_link: None,
            is_rematch,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_rematch(&self) -> bool {
        self.is_rematch
    }

    pub fn rematch_link(&self) -> Option<GameId> {
        self.rematch_link
    }

    /// Records the successor game created for this pair's next match.
    pub fn set_rematch_link(&mut self, successor: GameId) {
        self.rematch_link = Some(successor);
    }

    pub fn is_accepting(&self) -> bool {
        self.phase == Phase::AcceptingPlayers
    }

    pub fn is_empty(&self) -> bool {
        self.players.iter().all(Option::is_none)
    }

    pub fn player_count(&self) -> usize {
        self.players.iter().flatten().count()
    }

    /// Seated players in team order.
    pub fn players(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().flatten().copied()
    }

    pub fn team_of(&self, conn_id: ConnectionId) -> Option<u8> {
        self.players
            .iter()
            .position(|seat| *seat == Some(conn_id))
            .map(|team| team as u8)
    }

    pub fn opponent_of(&self, conn_id: ConnectionId) -> Option<ConnectionId> {
        self.players().find(|&other| other != conn_id)
    }

    /// Seats a player while the game is accepting. Returns the assigned
    /// team id, or `None` if the game is full or closed (callers check
    /// `is_accepting` first; a late join is silently refused).
    pub fn add_player(&mut self, conn_id: ConnectionId) -> Option<u8> {
        if self.phase != Phase::AcceptingPlayers {
            return None;
        }
        let seat = self.players.iter().position(Option::is_none)?;
        self.players[seat] = Some(conn_id);
        if self.player_count() == 2 {
            self.phase = Phase::WaitingToStart;
        }
        Some(seat as u8)
    }

    /// Begins play: team 0 moves first and is the only player notified.
    pub fn start(&mut self) -> Vec<Notice> {
        if self.phase != Phase::WaitingToStart {
            return Vec::new();
        }
        self.phase = Phase::InProgress;
        self.current_turn_team = 0;
        info!("Game {} started", self.id);

        match self.players[0] {
            Some(first) => vec![Notice {
                to: first,
                event: ServerEvent::TurnNotify,
            }],
            None => Vec::new(),
        }
    }

    /// Plays one turn for the submitting connection.
    ///
    /// On acceptance the board mutates and the returned notices carry, in
    /// order: the board update to both players, then either the finish
    /// event (win or draw) or the wait/turn pair that flips the turn.
    /// Rejection leaves board and turn state untouched and produces no
    /// broadcast.
    pub fn play_turn(
        &mut self,
        conn_id: ConnectionId,
        column: i64,
    ) -> Result<Vec<Notice>, TurnError> {
        match self.phase {
            Phase::AcceptingPlayers | Phase::WaitingToStart => return Err(TurnError::NotStarted),
            Phase::Finished => return Err(TurnError::GameOver),
            Phase::InProgress => {}
        }
        let team = self.team_of(conn_id).ok_or(TurnError::NotAPlayer)?;
        if team != self.current_turn_team {
            return Err(TurnError::NotYourTurn);
        }

        let slot = self.board.add_chip(team, column).map_err(|e| match e {
            PlaceError::InvalidInput => TurnError::InvalidColumn,
            PlaceError::ColumnFull => TurnError::ColumnFull,
        })?;
        info!(
            "Game {}: team {} played col {} row {}",
            self.id, team, slot.col, slot.row
        );

        let mut notices = self.broadcast(ServerEvent::BoardUpdate {
            board: self.board.snapshot(),
            slot,
            team,
        });

        if let Some(Win { team, slots }) = self.board.winner() {
            self.phase = Phase::Finished;
            info!("Game {} finished, team {} won", self.id, team);
            notices.extend(self.broadcast(finish_event(team as i8, slots)));
        } else if self.board.is_draw() {
            self.phase = Phase::Finished;
            info!("Game {} finished in a draw", self.id);
            notices.extend(self.broadcast(finish_event(-1, Vec::new())));
        } else {
            notices.push(Notice {
                to: conn_id,
                event: ServerEvent::WaitForTurn,
            });
            self.current_turn_team ^= 1;
            if let Some(next) = self.players[self.current_turn_team as usize] {
                notices.push(Notice {
                    to: next,
                    event: ServerEvent::TurnNotify,
                });
            }
        }
        Ok(notices)
    }

    /// Vacates the player's seat if present. The other seat keeps its
    /// index and therefore its team id.
    pub fn remove_user(&mut self, conn_id: ConnectionId) -> bool {
        for seat in &mut self.players {
            if *seat == Some(conn_id) {
                *seat = None;
                info!("Removed a player from game {}", self.id);
                return true;
            }
        }
        false
    }

    /// The `gameJoined` payload for the player seated as `you_are_player`.
    pub fn descriptor(&self, you_are_player: u8) -> GameDescriptor {
        GameDescriptor {
            columns: self.board.columns(),
            rows: self.board.rows(),
            win_amount: self.board.win_length(),
            id: self.id,
            you_are_player,
            is_rematch: self.is_rematch,
        }
    }

    #[cfg(test)]
    pub fn board(&self) -> &Board {
        &self.board
    }

    fn broadcast(&self, event: ServerEvent) -> Vec<Notice> {
        self.players()
            .map(|to| Notice {
                to,
                event: event.clone(),
            })
            .collect()
    }
}

fn finish_event(winning_team: i8, winning_slots: Vec<Slot>) -> ServerEvent {
    ServerEvent::GameFinished {
        winning_team,
        winning_slots,
    }
}
