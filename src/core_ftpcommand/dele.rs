use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::resolve_argument;
use log::{info, warn};
use tokio::fs;

pub async fn handle_dele_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;

    let metadata = fs::metadata(&resolved.absolute)
        .await
        .map_err(|_| FtpError::NotFound(resolved.virtual_path.clone()))?;
    if metadata.is_dir() {
        return Err(FtpError::PermissionDenied(format!(
            "{} is a directory",
            resolved.virtual_path
        )));
    }

    if let Err(e) = fs::remove_file(&resolved.absolute).await {
        warn!("Failed to delete file {:?}: {}", resolved.absolute, e);
        return Err(e.into());
    }

    info!("File deleted: {:?}", resolved.absolute);
    ctx.control.reply(250, "File successfully deleted.").await
}
