use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::resolve_argument;
use log::{info, warn};

pub async fn handle_rnto_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let Some(from) = ctx.session.rename_from.take() else {
        return Err(FtpError::BadSequence("Use RNFR first.".to_string()));
    };
    let to = resolve_argument(ctx, arg)?;
    if to.is_root() {
        return Err(FtpError::PermissionDenied("cannot replace the root".to_string()));
    }

    if let Err(e) = tokio::fs::rename(&from.absolute, &to.absolute).await {
        warn!("Failed to rename {:?} to {:?}: {}", from.absolute, to.absolute, e);
        return Err(e.into());
    }

    info!("Renamed {} to {}", from.virtual_path, to.virtual_path);
    ctx.control.reply(250, "Rename successful.").await
}
