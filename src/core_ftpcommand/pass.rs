use crate::core_auth::AuthOutcome;
use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use log::warn;

/// Handles the PASS FTP command.
///
/// Checks the pending USER name and this password against the auth policy.
/// A rejected login leaves the session unauthenticated; once
/// `max_login_attempts` consecutive failures pile up the connection is closed.
pub async fn handle_pass_command(ctx: &mut CommandContext<'_>, password: &str) -> Result<(), FtpError> {
    if ctx.session.is_authenticated() {
        return ctx.control.reply(230, "Already logged in.").await;
    }

    let Some(username) = ctx.session.pending_user.clone() else {
        return Err(FtpError::BadSequence("Login with USER first.".to_string()));
    };

    match ctx.server.auth.authenticate(&username, password) {
        AuthOutcome::Granted => {
            ctx.session.login_succeeded();
            ctx.control.reply(230, "User logged in, proceed.").await
        }
        AuthOutcome::Denied => {
            let failures = ctx.session.login_failed();
            warn!(
                "[{}] Login failed for {} ({} of {})",
                ctx.session.peer, username, failures, ctx.server.config.max_login_attempts
            );
            if failures >= ctx.server.config.max_login_attempts {
                Err(FtpError::TooManyLoginFailures)
            } else {
                Err(FtpError::AuthDenied(username))
            }
        }
    }
}
