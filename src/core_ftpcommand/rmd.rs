use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::resolve_argument;
use log::{info, warn};
use tokio::fs;

/// Handles the RMD (Remove Directory) FTP command. Only empty directories
/// are removed, and never the root itself.
pub async fn handle_rmd_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;
    if resolved.is_root() {
        return Err(FtpError::PermissionDenied("cannot remove the root".to_string()));
    }

    if let Err(e) = fs::remove_dir(&resolved.absolute).await {
        warn!("Failed to remove directory {:?}: {}", resolved.absolute, e);
        // Non-empty directories land here too; the client gets 550 either way.
        return Err(match e.kind() {
            std::io::ErrorKind::NotFound => FtpError::NotFound(resolved.virtual_path),
            _ => FtpError::PermissionDenied(format!("{}: {}", resolved.virtual_path, e)),
        });
    }

    info!("Directory removed: {:?}", resolved.absolute);
    ctx.control.reply(250, "Directory successfully removed.").await
}
