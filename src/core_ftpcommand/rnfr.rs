use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::resolve_argument;
use log::info;

/// Handles RNFR. The source is remembered until the very next command,
/// which has to be RNTO.
pub async fn handle_rnfr_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;
    if resolved.is_root() {
        return Err(FtpError::PermissionDenied("cannot rename the root".to_string()));
    }
    if tokio::fs::symlink_metadata(&resolved.absolute).await.is_err() {
        return Err(FtpError::NotFound(resolved.virtual_path));
    }

    info!("[{}] Rename from {}", ctx.session.peer, resolved.virtual_path);
    ctx.session.rename_from = Some(resolved);
    ctx.control
        .reply(350, "Ready for RNTO.")
        .await
}
