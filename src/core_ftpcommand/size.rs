use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::resolve_argument;

pub async fn handle_size_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;
    let metadata = tokio::fs::metadata(&resolved.absolute)
        .await
        .map_err(|_| FtpError::NotFound(resolved.virtual_path.clone()))?;
    if !metadata.is_file() {
        return Err(FtpError::NotFound(resolved.virtual_path));
    }
    ctx.control.reply(213, &metadata.len().to_string()).await
}
