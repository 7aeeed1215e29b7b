use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::transfer::{cancellable, open_data_stream, send_stream};
use crate::core_ftpcommand::utils::resolve_argument;
use log::{info, warn};
use tokio::fs::{self, File};

/// Handles the RETR (Retrieve) FTP command.
///
/// The file is opened before the data connection so a missing or unreadable
/// file is refused with 550 without consuming the client's PASV/PORT. Once
/// the transfer has started, failures end it with 426 or 451 and the
/// session stays usable.
pub async fn handle_retr_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let resolved = resolve_argument(ctx, arg)?;

    let is_file = fs::metadata(&resolved.absolute)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        warn!("RETR of missing or non-regular file: {:?}", resolved.absolute);
        return Err(FtpError::NotFound(resolved.virtual_path));
    }
    let file = File::open(&resolved.absolute).await?;

    let mut data = open_data_stream(ctx).await?;
    info!("Sending file: {:?}", resolved.absolute);

    let transfer_type = ctx.session.transfer_type;
    let buffer_size = ctx.server.config.download_buffer_size;
    let io_timeout = ctx.server.negotiator.timeout();
    let sent = cancellable(
        ctx.control,
        ctx.shutdown,
        send_stream(file, &mut data, transfer_type, buffer_size, io_timeout),
    )
    .await?;
    drop(data);

    info!("Sent {} bytes of {}", sent, resolved.virtual_path);
    ctx.control.reply(226, "Transfer complete.").await
}
