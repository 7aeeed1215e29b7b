use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::{quote_path, resolve_argument};
use log::{info, warn};
use tokio::fs;

/// Handles the MKD (Make Directory) FTP command. The parent must already
/// exist; intermediate directories are not created.
pub async fn handle_mkd_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;

    if let Err(e) = fs::create_dir(&resolved.absolute).await {
        warn!("Failed to create directory {:?}: {}", resolved.absolute, e);
        return Err(e.into());
    }

    info!("Directory created: {:?}", resolved.absolute);
    let response = format!("{} created.", quote_path(&resolved.virtual_path));
    ctx.control.reply(257, &response).await
}
