// Error taxonomy for the FTP engine
use crate::config::ConfigError;
use std::io::{self, ErrorKind};
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FtpError {
    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Path escapes the server root: {0}")]
    PathEscape(String),

    #[error("Authentication denied for user {0}")]
    AuthDenied(String),

    #[error("Too many failed login attempts")]
    TooManyLoginFailures,

    #[error("Peer {0} already has an active session")]
    AlreadyConnected(IpAddr),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Timed out waiting for the data connection")]
    DataTimeout,

    #[error("Transfer aborted: {0}")]
    TransferAborted(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Syntax error in parameters or arguments: {0}")]
    InvalidArgument(String),

    #[error("Bad sequence of commands: {0}")]
    BadSequence(String),

    #[error("Command not implemented: {0}")]
    NotImplemented(String),

    #[error("Command not implemented for that parameter: {0}")]
    ParameterNotImplemented(String),

    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] io::Error),

    #[error("Control connection lost: {0}")]
    ControlClosed(#[source] io::Error),

    #[error("Server is shutting down")]
    Shutdown,
}

impl FtpError {
    /// Errors after which the control connection must be closed. Everything
    /// else rejects the single command and leaves the session usable.
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            FtpError::ControlClosed(_) | FtpError::TooManyLoginFailures | FtpError::Shutdown
        )
    }

    pub fn to_ftp_response(&self) -> String {
        match self {
            FtpError::BindFailed { .. } | FtpError::InvalidConfig(_) => {
                "451 Requested action aborted. Local error in processing.".to_string()
            }
            FtpError::PathEscape(_) => "550 Path is outside of the allowed area.".to_string(),
            FtpError::AuthDenied(_) => "530 Login incorrect.".to_string(),
            FtpError::TooManyLoginFailures => {
                "421 Too many failed login attempts, closing control connection.".to_string()
            }
            FtpError::AlreadyConnected(_) => {
                "421 Only one connection per IP address is allowed.".to_string()
            }
            FtpError::PermissionDenied(_) => "550 Permission denied.".to_string(),
            FtpError::NotLoggedIn => "530 Please login with USER and PASS.".to_string(),
            FtpError::ConnectFailed { .. } | FtpError::DataTimeout => {
                "425 Can't open data connection.".to_string()
            }
            FtpError::TransferAborted(_) => "426 Connection closed; transfer aborted.".to_string(),
            FtpError::ProtocolError(_) => "500 Syntax error, command unrecognized.".to_string(),
            FtpError::InvalidArgument(_) => {
                "501 Syntax error in parameters or arguments.".to_string()
            }
            FtpError::BadSequence(msg) => format!("503 {}", msg),
            FtpError::NotImplemented(_) => "502 Command not implemented.".to_string(),
            FtpError::ParameterNotImplemented(_) => {
                "504 Command not implemented for that parameter.".to_string()
            }
            FtpError::NotFound(_) => "550 No such file or directory.".to_string(),
            FtpError::Filesystem(e) => match e.kind() {
                ErrorKind::NotFound => "550 No such file or directory.".to_string(),
                ErrorKind::PermissionDenied => "550 Permission denied.".to_string(),
                ErrorKind::AlreadyExists => "550 File exists.".to_string(),
                _ => "451 Requested action aborted. Local error in processing.".to_string(),
            },
            FtpError::ControlClosed(_) => {
                "421 Service not available, closing control connection.".to_string()
            }
            FtpError::Shutdown => "421 Server shutting down.".to_string(),
        }
    }

    /// The numeric reply code carried by `to_ftp_response`.
    pub fn reply_code(&self) -> u16 {
        self.to_ftp_response()
            .get(..3)
            .and_then(|code| code.parse().ok())
            .unwrap_or(451)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_codes_by_class() {
        assert_eq!(FtpError::PathEscape("/..".into()).reply_code(), 550);
        assert_eq!(FtpError::AuthDenied("bob".into()).reply_code(), 530);
        assert_eq!(FtpError::NotLoggedIn.reply_code(), 530);
        assert_eq!(FtpError::PermissionDenied("STOR".into()).reply_code(), 550);
        assert_eq!(FtpError::DataTimeout.reply_code(), 425);
        assert_eq!(FtpError::TransferAborted("reset".into()).reply_code(), 426);
        assert_eq!(FtpError::ProtocolError("".into()).reply_code(), 500);
        assert_eq!(FtpError::BadSequence("Login with USER first.".into()).reply_code(), 503);
        assert_eq!(
            FtpError::AlreadyConnected("127.0.0.1".parse().unwrap()).reply_code(),
            421
        );
    }

    #[test]
    fn test_filesystem_errors_map_by_kind() {
        let not_found = FtpError::from(io::Error::new(ErrorKind::NotFound, "gone"));
        assert_eq!(not_found.reply_code(), 550);

        let other = FtpError::from(io::Error::new(ErrorKind::Other, "disk on fire"));
        assert_eq!(other.reply_code(), 451);
    }

    #[test]
    fn test_only_connection_level_errors_are_terminal() {
        assert!(FtpError::Shutdown.is_session_terminal());
        assert!(FtpError::TooManyLoginFailures.is_session_terminal());
        assert!(
            FtpError::ControlClosed(io::Error::new(ErrorKind::BrokenPipe, "closed"))
                .is_session_terminal()
        );

        assert!(!FtpError::PathEscape("..".into()).is_session_terminal());
        assert!(!FtpError::DataTimeout.is_session_terminal());
        assert!(!FtpError::AuthDenied("x".into()).is_session_terminal());
        assert!(!FtpError::PermissionDenied("x".into()).is_session_terminal());
    }
}
