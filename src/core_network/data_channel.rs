use crate::config::ServerConfig;
use crate::core_error::FtpError;
use log::{debug, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Instant};

/// How the next transfer gets its data connection.
#[derive(Debug, Default)]
pub enum DataMode {
    #[default]
    None,
    /// PASV/EPSV: we listen, the client connects.
    Passive(PassiveListener),
    /// PORT: we connect out to the client when the transfer starts.
    Active(SocketAddr),
}

impl DataMode {
    pub fn is_pending(&self) -> bool {
        !matches!(self, DataMode::None)
    }
}

/// An ephemeral listener waiting for the client's data connection. Dropping
/// it closes the port.
#[derive(Debug)]
pub struct PassiveListener {
    listener: TcpListener,
    endpoint: SocketAddr,
}

impl PassiveListener {
    /// Address to hand to the client (the advertised IP, our bound port).
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Waits for the client to connect. Connections from any address other
    /// than `expected_peer` are dropped, so a third party can't grab the
    /// transfer by racing to the port.
    pub async fn accept(self, expected_peer: IpAddr, wait: Duration) -> Result<TcpStream, FtpError> {
        let deadline = Instant::now() + wait;
        loop {
            let accepted = tokio::time::timeout_at(deadline, self.listener.accept())
                .await
                .map_err(|_| FtpError::DataTimeout)?;

            match accepted {
                Ok((stream, addr)) if same_host(addr.ip(), expected_peer) => {
                    debug!("Accepted data connection from: {}", addr);
                    return Ok(stream);
                }
                Ok((_, addr)) => {
                    warn!(
                        "Dropped data connection from {}: expected {}",
                        addr, expected_peer
                    );
                }
                Err(e) => {
                    return Err(FtpError::ConnectFailed {
                        addr: self.endpoint,
                        source: e,
                    })
                }
            }
        }
    }
}

/// Opens data connections for one server; shared by every session.
#[derive(Debug, Clone)]
pub struct DataChannelNegotiator {
    pasv_address: Option<IpAddr>,
    allow_active: bool,
    timeout: Duration,
}

impl DataChannelNegotiator {
    pub fn new(pasv_address: Option<IpAddr>, allow_active: bool, timeout: Duration) -> Self {
        Self {
            pasv_address,
            allow_active,
            timeout,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.pasv_address,
            config.allow_active_mode,
            config.data_timeout(),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn active_mode_allowed(&self) -> bool {
        self.allow_active
    }

    /// Binds an ephemeral port on the interface the client reached us on.
    pub async fn open_passive(&self, local_ip: IpAddr) -> Result<PassiveListener, FtpError> {
        let local_ip = unmap(local_ip);
        let listener = TcpListener::bind((local_ip, 0)).await?;
        let port = listener.local_addr()?.port();
        let endpoint = SocketAddr::new(self.pasv_address.unwrap_or(local_ip), port);
        debug!("PASV listener set up on {}:{}, advertising {}", local_ip, port, endpoint);
        Ok(PassiveListener { listener, endpoint })
    }

    /// Validates a PORT target. Only the client's own address is accepted,
    /// which rules out using the server to bounce connections elsewhere.
    pub fn check_active_target(&self, target: SocketAddr, peer: IpAddr) -> Result<(), FtpError> {
        if !self.allow_active {
            return Err(FtpError::NotImplemented("active mode is disabled".to_string()));
        }
        if !same_host(target.ip(), peer) {
            warn!("Refused PORT to {}: client is {}", target, peer);
            return Err(FtpError::PermissionDenied(format!(
                "active mode target {} is not the client address",
                target
            )));
        }
        if target.port() == 0 {
            return Err(FtpError::InvalidArgument("port 0".to_string()));
        }
        Ok(())
    }

    pub async fn open_active(&self, target: SocketAddr) -> Result<TcpStream, FtpError> {
        match timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(stream)) => {
                info!("Active data connection established with {}", target);
                Ok(stream)
            }
            Ok(Err(e)) => Err(FtpError::ConnectFailed {
                addr: target,
                source: e,
            }),
            Err(_) => Err(FtpError::DataTimeout),
        }
    }

    /// Turns the pending mode into a connected stream, consuming it.
    pub async fn establish(&self, mode: DataMode, peer: IpAddr) -> Result<TcpStream, FtpError> {
        match mode {
            DataMode::None => Err(FtpError::BadSequence("Use PORT or PASV first.".to_string())),
            DataMode::Passive(listener) => listener.accept(peer, self.timeout).await,
            DataMode::Active(target) => self.open_active(target).await,
        }
    }
}

fn unmap(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

fn same_host(a: IpAddr, b: IpAddr) -> bool {
    unmap(a) == unmap(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn negotiator(allow_active: bool) -> DataChannelNegotiator {
        DataChannelNegotiator::new(None, allow_active, Duration::from_millis(300))
    }

    #[tokio::test]
    async fn test_passive_accepts_client() {
        let listener = negotiator(true).open_passive(LOCALHOST).await.unwrap();
        let endpoint = listener.endpoint();
        assert_eq!(endpoint.ip(), LOCALHOST);
        assert_ne!(endpoint.port(), 0);

        let client = tokio::spawn(async move { TcpStream::connect(endpoint).await });
        let stream = listener.accept(LOCALHOST, Duration::from_secs(2)).await;
        assert!(stream.is_ok());
        assert!(client.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_passive_times_out() {
        let negotiator = negotiator(true);
        let listener = negotiator.open_passive(LOCALHOST).await.unwrap();
        let result = negotiator
            .establish(DataMode::Passive(listener), LOCALHOST)
            .await;
        assert!(matches!(result, Err(FtpError::DataTimeout)));
    }

    #[tokio::test]
    async fn test_passive_advertises_configured_address() {
        let public: IpAddr = "203.0.113.7".parse().unwrap();
        let negotiator = DataChannelNegotiator::new(Some(public), true, Duration::from_secs(1));
        let listener = negotiator.open_passive(LOCALHOST).await.unwrap();
        assert_eq!(listener.endpoint().ip(), public);
    }

    #[tokio::test]
    async fn test_active_connects_to_client() {
        let client = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let target = client.local_addr().unwrap();

        let negotiator = negotiator(true);
        negotiator.check_active_target(target, LOCALHOST).unwrap();
        let stream = negotiator
            .establish(DataMode::Active(target), LOCALHOST)
            .await;
        assert!(stream.is_ok());
        assert!(client.accept().await.is_ok());
    }

    #[tokio::test]
    async fn test_active_connect_failure_is_reported() {
        // Bind then drop to get a port nobody listens on.
        let target = {
            let l = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
            l.local_addr().unwrap()
        };
        let result = negotiator(true).open_active(target).await;
        assert!(matches!(
            result,
            Err(FtpError::ConnectFailed { .. }) | Err(FtpError::DataTimeout)
        ));
    }

    #[test]
    fn test_active_target_policy() {
        let target: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let elsewhere: SocketAddr = "10.1.2.3:40000".parse().unwrap();

        assert!(negotiator(true).check_active_target(target, LOCALHOST).is_ok());
        assert!(matches!(
            negotiator(true).check_active_target(elsewhere, LOCALHOST),
            Err(FtpError::PermissionDenied(_))
        ));
        assert!(matches!(
            negotiator(false).check_active_target(target, LOCALHOST),
            Err(FtpError::NotImplemented(_))
        ));
    }

    #[tokio::test]
    async fn test_establish_without_mode_is_bad_sequence() {
        let result = negotiator(true).establish(DataMode::None, LOCALHOST).await;
        assert!(matches!(result, Err(FtpError::BadSequence(_))));
    }

    #[test]
    fn test_mapped_addresses_compare_equal() {
        let mapped: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        assert!(same_host(mapped, LOCALHOST));
        assert_eq!(unmap(mapped), LOCALHOST);
    }
}
