use crate::core_error::FtpError;
use crate::server::ServerEvent;
use log::{info, warn};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Counts live sessions per client IP and enforces the one-connection-per-IP
/// policy. The map is the only state shared between sessions; the lock is
/// never held across an await.
#[derive(Debug)]
pub struct PeerRegistry {
    one_ip_only: bool,
    peers: Mutex<HashMap<IpAddr, usize>>,
    events: broadcast::Sender<ServerEvent>,
}

/// Proof of admission. Dropping it releases the slot, so every way out of a
/// session (QUIT, I/O error, cancellation, panic) releases exactly once.
#[derive(Debug)]
pub struct PeerGuard {
    registry: Arc<PeerRegistry>,
    peer: SocketAddr,
}

impl PeerGuard {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.registry.release(self.peer);
    }
}

impl PeerRegistry {
    pub fn new(one_ip_only: bool, events: broadcast::Sender<ServerEvent>) -> Self {
        Self {
            one_ip_only,
            peers: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, usize>> {
        self.peers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn try_admit(self: &Arc<Self>, peer: SocketAddr) -> Result<PeerGuard, FtpError> {
        {
            let mut peers = self.lock();
            let count = peers.entry(peer.ip()).or_insert(0);
            if self.one_ip_only && *count > 0 {
                warn!("Rejected {}: peer already has an active session", peer);
                let _ = self.events.send(ServerEvent::PeerRejected(peer));
                return Err(FtpError::AlreadyConnected(peer.ip()));
            }
            *count += 1;
        }

        info!("Admitted peer {}", peer);
        let _ = self.events.send(ServerEvent::PeerConnected(peer));
        Ok(PeerGuard {
            registry: Arc::clone(self),
            peer,
        })
    }

    fn release(&self, peer: SocketAddr) {
        {
            let mut peers = self.lock();
            match peers.get_mut(&peer.ip()) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    peers.remove(&peer.ip());
                }
                None => {
                    warn!("Release for unknown peer {}", peer);
                    return;
                }
            }
        }

        info!("Released peer {}", peer);
        let _ = self.events.send(ServerEvent::PeerDisconnected(peer));
    }

    pub fn session_count(&self, ip: IpAddr) -> usize {
        self.lock().get(&ip).copied().unwrap_or(0)
    }

    pub fn total_sessions(&self) -> usize {
        self.lock().values().sum()
    }

    pub fn active_peers(&self) -> Vec<IpAddr> {
        self.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(one_ip_only: bool) -> (Arc<PeerRegistry>, broadcast::Receiver<ServerEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (Arc::new(PeerRegistry::new(one_ip_only, tx)), rx)
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_one_ip_only_rejects_second_session() {
        let (registry, _rx) = registry(true);

        let first = registry.try_admit(addr("10.0.0.5:40000")).unwrap();
        assert!(matches!(
            registry.try_admit(addr("10.0.0.5:40001")),
            Err(FtpError::AlreadyConnected(_))
        ));
        assert_eq!(registry.session_count("10.0.0.5".parse().unwrap()), 1);

        // Other addresses are unaffected.
        let other = registry.try_admit(addr("10.0.0.6:40000")).unwrap();
        assert_eq!(registry.total_sessions(), 2);

        drop(first);
        assert_eq!(registry.session_count("10.0.0.5".parse().unwrap()), 0);
        let again = registry.try_admit(addr("10.0.0.5:40002"));
        assert!(again.is_ok());

        drop(other);
        drop(again);
        assert_eq!(registry.total_sessions(), 0);
        assert!(registry.active_peers().is_empty());
    }

    #[test]
    fn test_unrestricted_registry_counts_sessions() {
        let (registry, _rx) = registry(false);

        let guards: Vec<_> = (0..3)
            .map(|i| {
                registry
                    .try_admit(addr(&format!("10.0.0.5:{}", 40000 + i)))
                    .unwrap()
            })
            .collect();
        assert_eq!(registry.session_count("10.0.0.5".parse().unwrap()), 3);

        drop(guards);
        assert_eq!(registry.session_count("10.0.0.5".parse().unwrap()), 0);
    }

    #[test]
    fn test_events_are_emitted() {
        let (registry, mut rx) = registry(true);
        let peer = addr("192.168.1.20:5000");

        let guard = registry.try_admit(peer).unwrap();
        assert!(registry.try_admit(peer).is_err());
        drop(guard);

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::PeerConnected(peer));
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::PeerRejected(peer));
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::PeerDisconnected(peer));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rejection_leaves_no_entry_behind() {
        let (registry, _rx) = registry(true);
        let guard = registry.try_admit(addr("10.0.0.9:1")).unwrap();
        let _ = registry.try_admit(addr("10.0.0.9:2"));
        drop(guard);
        assert!(registry.active_peers().is_empty());
    }
}
