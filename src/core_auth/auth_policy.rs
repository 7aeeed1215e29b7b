use crate::config::ServerConfig;
use crate::core_auth::helper::{is_bcrypt_hash, verify_password};
use log::{info, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted,
    Denied,
}

/// Decides whether a USER/PASS pair may log in.
#[derive(Clone)]
pub struct AuthPolicy {
    anonymous: bool,
    username: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPolicy")
            .field("anonymous", &self.anonymous)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthPolicy {
    pub fn new(anonymous: bool, username: Option<String>, password: Option<String>) -> Self {
        Self {
            anonymous,
            username,
            password,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.anonymous,
            config.username.clone(),
            config.password.clone(),
        )
    }

    pub fn anonymous_allowed(&self) -> bool {
        self.anonymous
    }

    /// With anonymous access every username is accepted and the password is
    /// not looked at. Otherwise both must match the configured pair.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        if self.anonymous {
            info!("Anonymous login granted for {:?}", username);
            return AuthOutcome::Granted;
        }

        let (Some(expected_user), Some(expected_pass)) = (&self.username, &self.password) else {
            warn!("Login refused for {:?}: no credentials configured", username);
            return AuthOutcome::Denied;
        };

        let password_ok = if is_bcrypt_hash(expected_pass) {
            verify_password(password, expected_pass)
        } else {
            password == expected_pass
        };

        if username == expected_user && password_ok {
            info!("User {} logged in", username);
            AuthOutcome::Granted
        } else {
            warn!("Login incorrect for user {:?}", username);
            AuthOutcome::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_accepts_anything() {
        let policy = AuthPolicy::new(true, None, None);
        assert_eq!(policy.authenticate("anonymous", ""), AuthOutcome::Granted);
        assert_eq!(policy.authenticate("whoever", "wrong"), AuthOutcome::Granted);
    }

    #[test]
    fn test_credentials_must_match_exactly() {
        let policy = AuthPolicy::new(false, Some("admin".into()), Some("qt".into()));
        assert_eq!(policy.authenticate("admin", "qt"), AuthOutcome::Granted);
        assert_eq!(policy.authenticate("admin", "QT"), AuthOutcome::Denied);
        assert_eq!(policy.authenticate("Admin", "qt"), AuthOutcome::Denied);
        assert_eq!(policy.authenticate("anonymous", ""), AuthOutcome::Denied);
        assert_eq!(policy.authenticate("admin", ""), AuthOutcome::Denied);
    }

    #[test]
    fn test_no_configured_credentials_denies() {
        let policy = AuthPolicy::new(false, None, None);
        assert_eq!(policy.authenticate("", ""), AuthOutcome::Denied);
    }

    #[test]
    fn test_bcrypt_hashed_password() {
        let hashed = bcrypt::hash("s3cret", 4).unwrap();
        let policy = AuthPolicy::new(false, Some("alice".into()), Some(hashed.clone()));
        assert_eq!(policy.authenticate("alice", "s3cret"), AuthOutcome::Granted);
        assert_eq!(policy.authenticate("alice", "nope"), AuthOutcome::Denied);
        assert_eq!(policy.authenticate("alice", &hashed), AuthOutcome::Denied);
    }
}
