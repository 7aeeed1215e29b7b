use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use log::info;

/// Handles the USER FTP command.
///
/// Starts a new login for `username`; any existing login on the session is
/// dropped. The reply asks for a password in both modes, anonymous logins just
/// accept whatever comes next.
pub async fn handle_user_command(ctx: &mut CommandContext<'_>, username: &str) -> Result<(), FtpError> {
    if username.trim().is_empty() {
        return Err(FtpError::InvalidArgument("USER needs a name".to_string()));
    }

    ctx.session.begin_login(username);

    if ctx.server.auth.anonymous_allowed() {
        info!("Anonymous login initiated for username: {}", username);
        ctx.control
            .reply(331, "Anonymous login okay, send your email address as password.")
            .await
    } else {
        info!("Username received: {}", username);
        ctx.control.reply(331, "User name okay, need password.").await
    }
}
