//! Headless protocol exerciser: connects to a running server, registers,
//! enters a game, and plays a scripted column whenever it is told it is
//! its turn. Run two of these against one server to watch a full match.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use shared::{ClientEvent, ServerEvent};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,
    /// Username to register with
    #[clap(short, long, default_value = "TestClient")]
    name: String,
    /// Game id to enter: -1 joins a random game, -2 creates one
    #[clap(short, long, default_value = "-1")]
    game: i64,
    /// Column to drop chips into whenever it is our turn
    #[clap(short, long, default_value = "0")]
    column: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (ws_stream, _) = connect_async(&args.url).await?;
    let (mut sink, mut source) = ws_stream.split();

    let send = |event: ClientEvent| serde_json::to_string(&event);

    println!("Registering as \"{}\"", args.name);
    sink.send(Message::Text(send(ClientEvent::RegisterRequest {
        username: Some(args.name.clone()),
    })?))
    .await?;

    sink.send(Message::Text(send(ClientEvent::EnterGame(args.game))?))
        .await?;

    while let Some(message) = source.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => {
                println!("Server closed the connection");
                break;
            }
            _ => continue,
        };
        let event: ServerEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                println!("Unparseable frame: {} ({})", text, e);
                continue;
            }
        };

        match event {
            ServerEvent::RegisterResponse { username } => {
                println!("Registered as \"{}\"", username);
            }
            ServerEvent::GameJoined(descriptor) => {
                println!(
                    "Joined game {} as player {} ({}x{} board, {} to win{})",
                    descriptor.id,
                    descriptor.you_are_player,
                    descriptor.columns,
                    descriptor.rows,
                    descriptor.win_amount,
                    if descriptor.is_rematch { ", rematch" } else { "" },
                );
            }
            ServerEvent::GameStarted(players) => {
                println!("Game started: {:?}", players);
            }
            ServerEvent::TurnNotify => {
                println!("Our turn, playing column {}", args.column);
                sink.send(Message::Text(send(ClientEvent::PlayTurn(args.column))?))
                    .await?;
            }
            ServerEvent::WaitForTurn => {
                println!("Waiting for the opponent...");
            }
            ServerEvent::BoardUpdate { slot, team, .. } => {
                println!("Team {} played col {} row {}", team, slot.col, slot.row);
            }
            ServerEvent::GameFinished {
                winning_team,
                winning_slots,
            } => {
                if winning_team < 0 {
                    println!("Game finished in a draw");
                } else {
                    println!("Team {} won: {:?}", winning_team, winning_slots);
                }
                sink.send(Message::Text(send(ClientEvent::LeaveGame)?)).await?;
                break;
            }
            ServerEvent::GameError { message, go_home } => {
                println!("Server error: {} (goHome: {})", message, go_home);
            }
            ServerEvent::GameClosed => {
                println!("Opponent left, game closed");
                break;
            }
            other => {
                println!("Unhandled event: {:?}", other);
            }
        }
    }

    println!("Test client finished");
    Ok(())
}
