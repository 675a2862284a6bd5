use clap::Parser;
use log::info;
use server::network::run_gateway;
use server::session::{Coordinator, Inbound};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Main-method of the application.
/// Parses command-line arguments, then spawns the session coordinator and
/// the WebSocket gateway.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "3000")]
        port: u16,
    }

    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {}", address);

    // One channel from the gateway into the single coordinator task
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Inbound>();

    let coordinator_handle = tokio::spawn(Coordinator::new(inbound_rx).run());
    let gateway_handle = tokio::spawn(run_gateway(listener, inbound_tx));

    // Handle shutdown gracefully
    tokio::select! {
        result = coordinator_handle => {
            if let Err(e) = result {
                eprintln!("Coordinator task panicked: {}", e);
            }
        }
        result = gateway_handle => {
            if let Err(e) = result {
                eprintln!("Gateway task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
