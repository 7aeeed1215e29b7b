use crate::config::ServerConfig;
use crate::constants::{ACCEPT_ERROR_BACKOFF, BANNER, SHUTDOWN_GRACE};
use crate::core_auth::AuthPolicy;
use crate::core_error::FtpError;
use crate::core_fs::PathSandbox;
use crate::core_ftpcommand::ftpcommand::parse_command_line;
use crate::core_ftpcommand::handlers::{dispatch, CommandContext};
use crate::core_network::control::ControlChannel;
use crate::core_network::data_channel::DataChannelNegotiator;
use crate::core_network::peer_registry::PeerRegistry;
use crate::session::Session;
use log::{debug, error, info, warn};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Everything a session needs from its server, built once at start.
#[derive(Debug)]
pub struct ServerContext {
    pub config: Arc<ServerConfig>,
    pub sandbox: PathSandbox,
    pub auth: AuthPolicy,
    pub negotiator: DataChannelNegotiator,
    pub registry: Arc<PeerRegistry>,
}

/// Resolves when shutdown is requested or the server handle is gone.
pub async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Accepts control connections until shutdown, then closes the listening
/// socket and gives running sessions `SHUTDOWN_GRACE` to finish.
pub async fn accept_loop(
    listener: TcpListener,
    server: Arc<ServerContext>,
    mut shutdown: watch::Receiver<bool>,
    listening: Arc<AtomicBool>,
) {
    let mut sessions = JoinSet::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    info!("New connection from {}", peer);
                    let guard = match server.registry.try_admit(peer) {
                        Ok(guard) => guard,
                        Err(e) => {
                            tokio::spawn(reject_connection(socket, e));
                            continue;
                        }
                    };

                    let id = next_id;
                    next_id += 1;
                    let server = Arc::clone(&server);
                    let shutdown = shutdown.clone();
                    sessions.spawn(async move {
                        let _guard = guard;
                        if let Err(e) = handle_connection(socket, id, server, shutdown).await {
                            warn!("Connection error for {}: {}", peer, e);
                        }
                        info!("Connection closed for {}", peer);
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },
            Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = finished {
                    if e.is_panic() {
                        error!("Session task panicked: {}", e);
                    }
                }
            }
            _ = shutdown_signalled(&mut shutdown) => break,
        }
    }

    drop(listener);
    listening.store(false, Ordering::SeqCst);
    info!("Listener closed, waiting for {} session(s)", sessions.len());

    let drained = timeout(SHUTDOWN_GRACE, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("Aborting {} session(s) still running", sessions.len());
        sessions.shutdown().await;
    }
}

async fn reject_connection(mut socket: TcpStream, reason: FtpError) {
    let reply = format!("{}\r\n", reason.to_ftp_response());
    if let Err(e) = socket.write_all(reply.as_bytes()).await {
        debug!("Failed to send rejection: {}", e);
    }
    let _ = socket.shutdown().await;
}

/// Runs one session: greeting, then commands in order until QUIT, a
/// terminal error, idle timeout, or server shutdown.
pub async fn handle_connection(
    socket: TcpStream,
    id: u64,
    server: Arc<ServerContext>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), FtpError> {
    let mut control = ControlChannel::new(socket)?;
    let mut session = Session::new(id, control.peer_addr());
    let idle_timeout = server.config.idle_timeout();

    control.reply(220, BANNER).await?;

    while !session.is_closed() {
        let line = tokio::select! {
            read = timeout(idle_timeout, control.read_command()) => match read {
                Ok(line) => line,
                Err(_) => {
                    info!("[{}] Idle timeout", session.peer);
                    let _ = control.reply(421, "Timeout, closing control connection.").await;
                    break;
                }
            },
            _ = shutdown_signalled(&mut shutdown) => {
                let _ = control.send_line(&FtpError::Shutdown.to_ftp_response()).await;
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("[{}] Client disconnected", session.peer);
                break;
            }
            Err(e) if e.is_session_terminal() => {
                session.close();
                return Err(e);
            }
            Err(e) => {
                control.send_line(&e.to_ftp_response()).await?;
                continue;
            }
        };

        let (command, arg) = parse_command_line(&line);
        let mut ctx = CommandContext {
            control: &mut control,
            session: &mut session,
            server: &server,
            shutdown: &mut shutdown,
        };

        match dispatch(&mut ctx, &command, &arg).await {
            Ok(()) => {}
            Err(e) if e.is_session_terminal() => {
                if !matches!(e, FtpError::ControlClosed(_)) {
                    let _ = control.send_line(&e.to_ftp_response()).await;
                }
                session.close();
                return Err(e);
            }
            Err(e) => {
                debug!("[{}] {} rejected: {}", session.peer, command, e);
                control.send_line(&e.to_ftp_response()).await?;
            }
        }
    }

    session.close();
    Ok(())
}

/// Best-effort LAN address of this host, for display. Connecting a UDP
/// socket sends nothing but makes the OS pick the outbound interface.
pub fn lan_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    for probe in ["8.8.8.8:80", "1.1.1.1:80"] {
        if socket.connect(probe).is_err() {
            continue;
        }
        if let Ok(SocketAddr::V4(local)) = socket.local_addr() {
            if !local.ip().is_loopback() && !local.ip().is_unspecified() {
                return Some(IpAddr::V4(*local.ip()));
            }
        }
    }
    None
}
