//! Central fan-out server demo
//!
//! Run with: cargo run --example fanout_server [INGEST_ADDR] [LISTENER_ADDR]
//!
//! Examples:
//!   cargo run --example fanout_server                          # 0.0.0.0:8000 / 0.0.0.0:8001
//!   cargo run --example fanout_server 0.0.0.0:8000 0.0.0.0:8001
//!
//! Sensors (via their relay agents) connect to the ingest address and
//! send a JSON config line followed by Opus frames. Listeners connect
//! to the listener address, send a JSON join line naming a sensor,
//! and receive the sensor's config (rewritten to pcm_s16le) followed
//! by decoded PCM frames.

use std::net::SocketAddr;

use audio_relay::{FanoutServer, ServerConfig};

fn print_usage() {
    eprintln!("Usage: fanout_server [INGEST_ADDR] [LISTENER_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  INGEST_ADDR    Address sensors connect to (default: 0.0.0.0:8000)");
    eprintln!("  LISTENER_ADDR  Address listeners connect to (default: 0.0.0.0:8001)");
}

fn parse_addr(args: &[String], index: usize, default: &str) -> SocketAddr {
    match args.get(index) {
        Some(arg) => match arg.parse() {
            Ok(addr) => addr,
            Err(_) => {
                eprintln!("Error: invalid address '{}'", arg);
                print_usage();
                std::process::exit(1);
            }
        },
        None => default.parse().unwrap(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let ingest_addr = parse_addr(&args, 1, "0.0.0.0:8000");
    let listener_addr = parse_addr(&args, 2, "0.0.0.0:8001");

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("audio_relay=debug".parse()?)
                .add_directive("fanout_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig::default()
        .ingest_bind(ingest_addr)
        .listener_bind(listener_addr);

    println!("Starting fan-out server");
    println!("  sensors   -> {}", ingest_addr);
    println!("  listeners -> {}", listener_addr);
    println!();

    let server = FanoutServer::new(config);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}
