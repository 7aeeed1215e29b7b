use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use log::{info, warn};

pub async fn handle_cwd_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    if arg.trim().is_empty() {
        return Err(FtpError::InvalidArgument("CWD needs a directory".to_string()));
    }
    change_directory(ctx, arg).await
}

/// Moves the session into `target` once the sandbox has resolved it to an
/// existing directory. The stored path is the canonical one, so a symlinked
/// directory shows up under its real name in PWD.
pub async fn change_directory(ctx: &mut CommandContext<'_>, target: &str) -> Result<(), FtpError> {
    let resolved = ctx
        .server
        .sandbox
        .resolve(target, &ctx.session.current_dir)?;

    let is_dir = tokio::fs::metadata(&resolved.absolute)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        warn!("Failed to change directory to: {:?}", resolved.absolute);
        return Err(FtpError::NotFound(resolved.virtual_path));
    }

    ctx.session.current_dir = resolved.virtual_path;
    info!("Directory successfully changed to: {}", ctx.session.current_dir);
    ctx.control
        .reply(250, "Directory successfully changed.")
        .await
}
