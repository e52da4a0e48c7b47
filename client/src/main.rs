use clap::Parser;
use log::info;
use shared::ProtocolVersion;
use std::path::PathBuf;

use client::network::{Client, LoginRequest};
use client::replay::ReplaySession;
use client::storage::Store;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Protocol generation: 1 = JSON text, 2 = binary
    #[arg(short = 'p', long, default_value = "2")]
    proto: u8,

    /// Account name to sign in with
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Password for --username
    #[arg(long)]
    password: Option<String>,

    /// Create the account instead of signing in
    #[arg(long, default_value = "false")]
    register: bool,

    /// Remember the credentials for future sessions
    #[arg(long, default_value = "false")]
    remember: bool,

    /// Play back a recorded session instead of joining a live game
    #[arg(short = 'r', long)]
    replay: Option<String>,

    /// Start with sound off
    #[arg(short = 'm', long, default_value = "false")]
    muted: bool,

    /// Local store file for best score and remembered credentials
    #[arg(long, default_value = "snake_arcade_store.json")]
    store: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if let Some(file) = args.replay {
        info!("Playing back recording {} from {}", file, args.server);
        info!("Controls: Space/P pause, Q quit");
        let mut playback = ReplaySession::connect(&args.server, &file, args.muted).await?;
        return playback.run().await;
    }

    info!("Connecting to: {}", args.server);
    info!("Controls: arrows/WASD move, F fire, Space pause, R restart");
    info!("          1/2/3 difficulty, Z/X/C mode, B berserker, M mute");

    let login = match (args.username, args.password) {
        (Some(username), Some(password)) => Some(LoginRequest {
            username,
            password,
            register: args.register,
            remember: args.remember,
        }),
        (Some(_), None) | (None, Some(_)) => {
            return Err("both --username and --password are required to sign in".into());
        }
        (None, None) => None,
    };

    let store = Store::open(args.store);
    let mut client = Client::new(
        args.server,
        ProtocolVersion::from_flag(args.proto),
        store,
        args.muted,
        login,
    );
    client.run().await
}
