use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use log::info;

/// Handles the QUIT FTP command.
///
/// Says goodbye and marks the session closed; the connection loop then drops
/// the control connection, any pending data channel and the peer slot.
pub async fn handle_quit_command(ctx: &mut CommandContext<'_>, _arg: &str) -> Result<(), FtpError> {
    info!("Received QUIT command. Closing connection.");
    let reply = ctx.control.reply(221, "Service closing control connection.").await;
    ctx.session.close();
    reply
}
