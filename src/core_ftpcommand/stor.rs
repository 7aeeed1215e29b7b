use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::transfer::{cancellable, open_data_stream, receive_stream};
use crate::core_ftpcommand::utils::resolve_argument;
use log::{info, warn};
use tokio::fs::{self, File};

/// Handles the STOR (Store) FTP command.
///
/// An existing file is overwritten. The target file is only created once
/// the data connection is up, so a failed PASV/PORT leaves nothing behind.
/// A transfer cut short keeps what was received.
pub async fn handle_stor_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;
    if resolved.is_root() {
        return Err(FtpError::PermissionDenied("cannot overwrite the root".to_string()));
    }

    if let Ok(metadata) = fs::metadata(&resolved.absolute).await {
        if metadata.is_dir() {
            return Err(FtpError::PermissionDenied(format!(
                "{} is a directory",
                resolved.virtual_path
            )));
        }
    }
    let parent_exists = match resolved.absolute.parent() {
        Some(parent) => fs::metadata(parent).await.map(|m| m.is_dir()).unwrap_or(false),
        None => false,
    };
    if !parent_exists {
        warn!("STOR into missing directory: {:?}", resolved.absolute);
        return Err(FtpError::NotFound(resolved.virtual_path));
    }

    let mut data = open_data_stream(ctx).await?;

    let file = File::create(&resolved.absolute).await?;
    info!("Receiving file: {:?}", resolved.absolute);

    let transfer_type = ctx.session.transfer_type;
    let buffer_size = ctx.server.config.upload_buffer_size;
    let io_timeout = ctx.server.negotiator.timeout();
    let received = cancellable(
        ctx.control,
        ctx.shutdown,
        receive_stream(&mut data, file, transfer_type, buffer_size, io_timeout),
    )
    .await?;
    drop(data);

    info!("Stored {} bytes to {}", received, resolved.virtual_path);
    ctx.control.reply(226, "Transfer complete.").await
}
