use crate::config::ServerConfig;
use crate::core_auth::AuthPolicy;
use crate::core_error::FtpError;
use crate::core_fs::PathSandbox;
use crate::core_network::data_channel::DataChannelNegotiator;
use crate::core_network::network::{accept_loop, lan_address, ServerContext};
use crate::core_network::peer_registry::PeerRegistry;
use log::{error, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Status notifications for whoever embeds the server. Receivers that fall
/// behind lose the oldest events; nothing in the engine depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Listening(SocketAddr),
    ListenFailed(String),
    PeerConnected(SocketAddr),
    PeerRejected(SocketAddr),
    PeerDisconnected(SocketAddr),
    Stopped,
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// An embeddable FTP server. One instance serves one configuration; to
/// change settings, stop it and build a new one.
pub struct FtpServer {
    config: Arc<ServerConfig>,
    registry: Arc<PeerRegistry>,
    events: broadcast::Sender<ServerEvent>,
    listening: Arc<AtomicBool>,
    running: Mutex<Option<RunningServer>>,
}

impl FtpServer {
    pub fn new(config: ServerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let registry = Arc::new(PeerRegistry::new(config.one_ip_only, events.clone()));
        Self {
            config: Arc::new(config),
            registry,
            events,
            listening: Arc::new(AtomicBool::new(false)),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Best-effort address of this host on the local network, for display.
    pub fn lan_address() -> Option<IpAddr> {
        lan_address()
    }

    /// Binds the configured address and starts accepting connections.
    /// Returns the bound address, which tells the real port when the
    /// configuration asked for port 0. Calling it on a running server
    /// returns the current address.
    pub async fn start(&self) -> Result<SocketAddr, FtpError> {
        let mut running = self.running.lock().await;
        if let Some(existing) = running.as_ref() {
            warn!("Server already listening on {}", existing.local_addr);
            return Ok(existing.local_addr);
        }

        if let Err(e) = self.config.validate() {
            self.notify(ServerEvent::ListenFailed(e.to_string()));
            return Err(e.into());
        }
        self.config.log();

        let sandbox = PathSandbox::new(&self.config.root_path).map_err(|e| {
            self.notify(ServerEvent::ListenFailed(e.to_string()));
            FtpError::Filesystem(e)
        })?;

        let addr = self.config.bind_address();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!("Failed to bind {}: {}", addr, source);
                self.notify(ServerEvent::ListenFailed(source.to_string()));
                return Err(FtpError::BindFailed { addr, source });
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|source| FtpError::BindFailed { addr, source })?;

        let context = Arc::new(ServerContext {
            config: Arc::clone(&self.config),
            sandbox,
            auth: AuthPolicy::from_config(&self.config),
            negotiator: DataChannelNegotiator::from_config(&self.config),
            registry: Arc::clone(&self.registry),
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        self.listening.store(true, Ordering::SeqCst);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            context,
            shutdown_rx,
            Arc::clone(&self.listening),
        ));

        info!("FTP server listening on {}", local_addr);
        self.notify(ServerEvent::Listening(local_addr));
        *running = Some(RunningServer {
            local_addr,
            shutdown,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Stops accepting, tells every session to close, and returns once the
    /// listening socket is closed and sessions are done or aborted.
    /// Stopping a server that is not running does nothing.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        info!("Stopping FTP server on {}", running.local_addr);
        let _ = running.shutdown.send(true);
        if let Err(e) = running.accept_task.await {
            error!("Accept loop ended abnormally: {}", e);
        }
        self.listening.store(false, Ordering::SeqCst);
        self.notify(ServerEvent::Stopped);
    }

    fn notify(&self, event: ServerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
