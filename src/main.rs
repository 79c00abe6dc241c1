use std::process;
use std::sync::{Arc, Mutex};

use linesub::broker::Broker;
use linesub::config::load_config;
use linesub::transport::tcp::run_tcp_server;
use linesub::utils::logging;

#[tokio::main]
async fn main() {
    logging::init("info");

    let port = match parse_port(std::env::args().skip(1)) {
        Ok(port) => port,
        Err(message) => {
            eprintln!("{message}");
            process::exit(1);
        }
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "failed to load configuration");
            process::exit(1);
        }
    };

    let addr = format!("{}:{}", config.server.host, port);
    let broker = Arc::new(Mutex::new(Broker::new()));

    if let Err(err) = run_tcp_server(&addr, broker).await {
        tracing::error!(%err, "server terminated");
        process::exit(1);
    }
}

/// Validates the single `<PORT>` argument: an integer in [1024, 65535].
fn parse_port<I>(mut args: I) -> Result<u16, String>
where
    I: Iterator<Item = String>,
{
    let raw = match (args.next(), args.next()) {
        (Some(raw), None) => raw,
        _ => return Err("Usage: linesub <PORT>".to_string()),
    };

    let port: u32 = raw
        .parse()
        .map_err(|_| format!("Error: '{raw}' is not a valid port number"))?;
    if !(1024..=65535).contains(&port) {
        return Err("Port must be between 1024 - 65535".to_string());
    }
    Ok(port as u16)
}
