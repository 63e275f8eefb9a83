//! Subprocess launched once per call to run the post-quantum authenticated
//! key exchange over a TCP connection, print its outcome for the launching
//! UI to scrape, and hand the derived SRTP master key off on stdout.
//!
//! The calling app's launcher process starts this as `responder` on the
//! callee side and `initiator` on the caller side, each pointed at the same
//! TCP port; both sides are expected to exit after one session.

use ake_core::protocol::{initiator, responder};
use ake_core::{HandshakeTimeouts, KeyStore, Registry, Username};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::{TcpListener, TcpStream};

#[derive(Parser)]
#[command(name = "ake-endpoint", about = "Post-quantum authenticated key exchange endpoint")]
struct Cli {
    #[command(subcommand)]
    role: Role,

    /// Directory holding client_keys.json and client_dilithium_keys.bin.
    #[arg(long, default_value = ".", global = true)]
    state_dir: PathBuf,

    /// Per-frame read/write deadline, in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    frame_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Role {
    /// Host a session: bind and wait for exactly one initiator.
    Responder {
        #[arg(long, default_value_t = 9000)]
        port: u16,
    },
    /// Join a session already hosted by a responder.
    Initiator {
        #[arg(long)]
        peer_ip: String,
        #[arg(long, default_value_t = 9000)]
        port: u16,
        #[arg(long)]
        username: String,
    },
    /// Inspect the responder-side identity registry without running a session.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List every username pinned by a prior TOFU exchange.
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> ake_core::Result<()> {
    let cli = Cli::parse();
    let timeouts = HandshakeTimeouts {
        connect: std::time::Duration::from_secs(cli.frame_timeout_secs),
        frame: std::time::Duration::from_secs(cli.frame_timeout_secs),
    };

    match cli.role {
        Role::Registry { action: RegistryAction::List } => {
            let registry = Registry::load(cli.state_dir.join("client_keys.json"))?;
            for (username, public_key) in registry.iter() {
                println!("{username}\t{}", hex::encode(public_key));
            }
            Ok(())
        }
        Role::Responder { port } => run_responder(&cli.state_dir, port, timeouts).await,
        Role::Initiator { peer_ip, port, username } => {
            run_initiator(&cli.state_dir, &peer_ip, port, &username, timeouts).await
        }
    }
}

async fn run_responder(state_dir: &std::path::Path, port: u16, timeouts: HandshakeTimeouts) -> ake_core::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    println!("Waiting for peer...");
    tracing::info!(port, "responder listening");

    let (mut stream, peer_addr) = listener.accept().await?;
    println!("Connected");
    tracing::info!(%peer_addr, "accepted connection");

    let mut registry = Registry::load(state_dir.join("client_keys.json"))?;
    let (username, session_key) = responder::run(&mut stream, &mut registry, timeouts).await?;

    println!("Key exchange successful");
    tracing::info!(username = username.as_str(), "handshake complete");
    emit_session_key(&session_key);
    Ok(())
}

async fn run_initiator(
    state_dir: &std::path::Path,
    peer_ip: &str,
    port: u16,
    username: &str,
    timeouts: HandshakeTimeouts,
) -> ake_core::Result<()> {
    let username = Username::parse(username)?;
    let keys = KeyStore::load_or_generate(state_dir.join("client_dilithium_keys.bin"))?;

    println!("Waiting for peer...");
    let mut stream = tokio::time::timeout(timeouts.connect, TcpStream::connect((peer_ip, port)))
        .await
        .map_err(|_| ake_core::AkeError::Timeout)??;
    println!("Connected");
    tracing::info!(peer_ip, port, "connected to responder");

    let session_key = initiator::run(&mut stream, &username, &keys, timeouts).await?;

    println!("Key exchange successful");
    tracing::info!(fingerprint = %keys.fingerprint(), "handshake complete");
    emit_session_key(&session_key);
    Ok(())
}

/// Hand the derived SRTP master key to the media pipeline via stdout, hex
/// encoded on its own line after the status strings above. The launching
/// process is expected to capture this line and discard the rest.
fn emit_session_key(key: &ake_core::SessionKey) {
    println!("{}", hex::encode(key.as_bytes()));
}
