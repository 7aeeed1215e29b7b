mod core_cli;

use crate::core_cli::Cli;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use env_logger::{Builder, Env};
use lanftpd::core_auth::helper::hash_password;
use lanftpd::{Config, FtpServer, ServerEvent};
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let timestamp = buf.timestamp().to_string();
            let level = match record.level() {
                log::Level::Error => record.level().to_string().red(),
                log::Level::Warn => record.level().to_string().yellow(),
                log::Level::Info => record.level().to_string().green(),
                log::Level::Debug => record.level().to_string().blue(),
                log::Level::Trace => record.level().to_string().white(),
            };
            writeln!(buf, "[{}] [{}] {}", timestamp, level, record.args())
        })
        .init();

    if let Some(password) = args.hash_password.as_deref() {
        let hashed = hash_password(password).context("Failed to hash password")?;
        println!("{}", hashed);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.server.listen_port = port;
    }
    if let Some(root) = args.root {
        config.server.root_path = root;
    }
    if args.read_only {
        config.server.read_only = true;
    }
    if args.anonymous {
        config.server.anonymous = true;
    }

    let server = FtpServer::new(config.server);
    let mut events = server.subscribe();
    let local_addr = server.start().await.context("Failed to start FTP server")?;

    match FtpServer::lan_address() {
        Some(lan) => println!("Listening at {}:{}", lan, local_addr.port()),
        None => println!("Listening at {}", local_addr),
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ServerEvent::PeerConnected(peer)) => println!("Peer connected: {}", peer),
                Ok(ServerEvent::PeerRejected(peer)) => println!("Peer rejected: {}", peer),
                Ok(ServerEvent::PeerDisconnected(peer)) => println!("Peer disconnected: {}", peer),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    server.stop().await;
    Ok(())
}
