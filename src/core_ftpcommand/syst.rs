use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use log::info;

/// Handles the SYST (System) FTP command.
///
/// Always answers with the UNIX type, which is what clients expect to parse
/// `ls -l` style listings.
pub async fn handle_syst_command(ctx: &mut CommandContext<'_>) -> Result<(), FtpError> {
    info!("Responding to SYST command with system type.");
    ctx.control.reply(215, "UNIX Type: L8").await
}
