//! Edge relay agent demo
//!
//! Run with: cargo run --example relay_agent [BIND_ADDR] [UPLINK_ADDR] [SENSOR_ID]
//!
//! Examples:
//!   cargo run --example relay_agent                                  # 0.0.0.0:9000 -> 127.0.0.1:8000
//!   cargo run --example relay_agent 0.0.0.0:9000 central:8000 ANE1
//!
//! The agent listens for the capture engine's TCP frame stream and
//! relays it to the central ingest endpoint, riding out uplink outages
//! with a bounded drop-oldest queue and a fixed-delay reconnect loop.

use std::net::SocketAddr;

use audio_relay::protocol::SensorConfig;
use audio_relay::relay::{RelayConfig, RelayListener};

fn print_usage() {
    eprintln!("Usage: relay_agent [BIND_ADDR] [UPLINK_ADDR] [SENSOR_ID]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR     Address the capture engine connects to (default: 0.0.0.0:9000)");
    eprintln!("  UPLINK_ADDR   Central ingest endpoint (default: 127.0.0.1:8000)");
    eprintln!("  SENSOR_ID     Sensor identity for the handshake (default: ANE1)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr: SocketAddr = match args.get(1) {
        Some(arg) => match arg.parse() {
            Ok(addr) => addr,
            Err(_) => {
                eprintln!("Error: invalid bind address '{}'", arg);
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:9000".parse()?,
    };
    let uplink_addr = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "127.0.0.1:8000".to_string());
    let sensor_id = args.get(3).cloned().unwrap_or_else(|| "ANE1".to_string());

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("audio_relay=debug".parse()?)
                .add_directive("relay_agent=debug".parse()?),
        )
        .init();

    let config = RelayConfig::default()
        .bind(bind_addr)
        .uplink(uplink_addr.clone())
        .sensor(SensorConfig::opus(sensor_id.clone(), 48_000, 1));

    println!("Relay agent for sensor '{}'", sensor_id);
    println!("  capture engine -> {}", bind_addr);
    println!("  uplink         -> {}", uplink_addr);
    println!();

    let (agent, mut events) = RelayListener::with_events(config);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("Event: {:?}", event);
        }
    });

    tokio::select! {
        result = agent.run() => {
            if let Err(e) = result {
                eprintln!("Relay error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}
