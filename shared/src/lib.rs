use serde::{Deserialize, Serialize};

pub const BOARD_COLUMNS: usize = 7;
pub const BOARD_ROWS: usize = 6;
pub const WIN_LENGTH: usize = 4;
pub const MAX_USERNAME_LEN: usize = 20;

/// `enterGame` id meaning "join any open game".
pub const JOIN_RANDOM: i64 = -1;
/// `enterGame` id meaning "create a fresh game".
pub const CREATE_GAME: i64 = -2;

/// A (column, row) coordinate on the board. Row 0 is the bottom row.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub col: usize,
    pub row: usize,
}

/// The `gameJoined` payload: everything a client needs to set up its board.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameDescriptor {
    pub columns: usize,
    pub rows: usize,
    pub win_amount: usize,
    pub id: u32,
    pub you_are_player: u8,
    pub is_rematch: bool,
}

/// Requests sent by clients, as JSON text frames `{"event": ..., "data": ...}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    RegisterRequest {
        #[serde(default)]
        username: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UsernameUpdate {
        username: String,
        #[serde(default)]
        game_to_join_id: Option<i64>,
    },
    /// -1 joins a random open game, -2 creates a game, >= 0 joins that id.
    EnterGame(i64),
    PlayTurn(i64),
    RematchRequest,
    LeaveGame,
}

/// Notifications sent by the server, same envelope as [`ClientEvent`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    RegisterResponse { username: String },
    #[serde(rename_all = "camelCase")]
    UsernameUpdateResponse {
        username: String,
        game_to_join_id: Option<i64>,
    },
    GameJoined(GameDescriptor),
    /// Full board snapshot plus the chip just placed. Cells are -1 for
    /// empty, otherwise the owning team.
    #[serde(rename_all = "camelCase")]
    BoardUpdate {
        board: Vec<Vec<i8>>,
        slot: Slot,
        team: u8,
    },
    TurnNotify,
    WaitForTurn,
    /// Usernames in team order (index = team id).
    GameStarted(Vec<String>),
    /// `winning_team` is -1 and `winning_slots` empty on a draw.
    #[serde(rename_all = "camelCase")]
    GameFinished {
        winning_team: i8,
        winning_slots: Vec<Slot>,
    },
    #[serde(rename_all = "camelCase")]
    GameError { message: String, go_home: bool },
    GameClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_envelope_shape() {
        let event = ClientEvent::RegisterRequest {
            username: Some("Errant Minnow".to_string()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "registerRequest", "data": {"username": "Errant Minnow"}})
        );

        let event = ClientEvent::EnterGame(JOIN_RANDOM);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "enterGame", "data": -1}));

        let event = ClientEvent::RematchRequest;
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "rematchRequest"}));
    }

    #[test]
    fn test_server_event_envelope_shape() {
        let event = ServerEvent::GameError {
            message: "Game is full!".to_string(),
            go_home: false,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "gameError", "data": {"message": "Game is full!", "goHome": false}})
        );

        let event = ServerEvent::TurnNotify;
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "turnNotify"}));
    }

    #[test]
    fn test_game_descriptor_field_names() {
        let descriptor = GameDescriptor {
            columns: BOARD_COLUMNS,
            rows: BOARD_ROWS,
            win_amount: WIN_LENGTH,
            id: 42,
            you_are_player: 1,
            is_rematch: true,
        };
        let value = serde_json::to_value(ServerEvent::GameJoined(descriptor)).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "gameJoined",
                "data": {
                    "columns": 7,
                    "rows": 6,
                    "winAmount": 4,
                    "id": 42,
                    "youArePlayer": 1,
                    "isRematch": true
                }
            })
        );
    }

    #[test]
    fn test_register_request_username_optional() {
        let parsed: ClientEvent = serde_json::from_str(r#"{"event":"registerRequest","data":{}}"#)
            .expect("missing username should parse");
        assert_eq!(parsed, ClientEvent::RegisterRequest { username: None });

        let parsed: ClientEvent =
            serde_json::from_str(r#"{"event":"registerRequest","data":{"username":null}}"#)
                .expect("null username should parse");
        assert_eq!(parsed, ClientEvent::RegisterRequest { username: None });
    }

    #[test]
    fn test_game_finished_draw_payload() {
        let event = ServerEvent::GameFinished {
            winning_team: -1,
            winning_slots: vec![],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "gameFinished", "data": {"winningTeam": -1, "winningSlots": []}})
        );
    }

    #[test]
    fn test_board_update_roundtrip() {
        let event = ServerEvent::BoardUpdate {
            board: vec![vec![-1, 0, 1]; 2],
            slot: Slot { col: 1, row: 2 },
            team: 0,
        };
        let text = serde_json::to_string(&event).unwrap();
        let parsed: ServerEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"speedHack","data":true}"#);
        assert!(result.is_err());
    }
}
