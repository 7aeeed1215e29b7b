use crate::core_fs::ResolvedPath;
use crate::core_network::data_channel::DataMode;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    AwaitingDataConnection,
    Transferring,
    Closed,
}

/// Representation type set with TYPE. ASCII translates line endings on the
/// wire, binary (image) moves bytes untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    #[default]
    Ascii,
    Binary,
}

/// Per-connection state. Owned by the task serving the control connection,
/// never shared.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    pub peer: SocketAddr,
    pub state: SessionState,
    pub username: Option<String>,
    pub pending_user: Option<String>,
    pub failed_logins: u32,
    pub current_dir: String,
    pub data_mode: DataMode,
    pub transfer_type: TransferType,
    pub rename_from: Option<ResolvedPath>,
}

impl Session {
    pub fn new(id: u64, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            state: SessionState::Unauthenticated,
            username: None,
            pending_user: None,
            failed_logins: 0,
            current_dir: String::from("/"),
            data_mode: DataMode::None,
            transfer_type: TransferType::default(),
            rename_from: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated
                | SessionState::AwaitingDataConnection
                | SessionState::Transferring
        )
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// USER starts a fresh login, dropping any previous one.
    pub fn begin_login(&mut self, username: &str) {
        self.state = SessionState::Unauthenticated;
        self.username = None;
        self.pending_user = Some(username.to_string());
    }

    pub fn login_succeeded(&mut self) {
        self.username = self.pending_user.take();
        self.failed_logins = 0;
        self.state = SessionState::Authenticated;
    }

    /// Records a rejected PASS and returns the number of consecutive failures.
    pub fn login_failed(&mut self) -> u32 {
        self.pending_user = None;
        self.failed_logins += 1;
        self.failed_logins
    }

    /// Marks the end of a data transfer, success or not.
    pub fn transfer_finished(&mut self) {
        if self.is_authenticated() {
            self.state = SessionState::Authenticated;
        }
        self.data_mode = DataMode::None;
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.data_mode = DataMode::None;
        self.rename_from = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(1, "127.0.0.1:50000".parse().unwrap())
    }

    #[test]
    fn test_new_session_is_unauthenticated_at_root() {
        let session = session();
        assert_eq!(session.state, SessionState::Unauthenticated);
        assert!(!session.is_authenticated());
        assert_eq!(session.current_dir, "/");
        assert_eq!(session.transfer_type, TransferType::Ascii);
        assert!(!session.data_mode.is_pending());
    }

    #[test]
    fn test_login_flow() {
        let mut session = session();
        session.begin_login("bob");
        assert_eq!(session.login_failed(), 1);
        assert!(session.pending_user.is_none());
        assert!(!session.is_authenticated());

        session.begin_login("bob");
        session.login_succeeded();
        assert!(session.is_authenticated());
        assert_eq!(session.username.as_deref(), Some("bob"));
        assert_eq!(session.failed_logins, 0);

        // A new USER drops the existing login.
        session.begin_login("eve");
        assert!(!session.is_authenticated());
        assert!(session.username.is_none());
    }

    #[test]
    fn test_transfer_states_count_as_authenticated() {
        let mut session = session();
        session.begin_login("bob");
        session.login_succeeded();

        session.state = SessionState::AwaitingDataConnection;
        assert!(session.is_authenticated());
        session.state = SessionState::Transferring;
        assert!(session.is_authenticated());

        session.transfer_finished();
        assert_eq!(session.state, SessionState::Authenticated);
    }

    #[test]
    fn test_close_is_terminal() {
        let mut session = session();
        session.data_mode = DataMode::Active("127.0.0.1:2000".parse().unwrap());
        session.close();
        assert!(session.is_closed());
        assert!(!session.is_authenticated());
        assert!(!session.data_mode.is_pending());
    }
}
