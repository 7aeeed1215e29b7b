use crate::core_error::FtpError;
use crate::core_ftpcommand::cwd::change_directory;
use crate::core_ftpcommand::handlers::CommandContext;

/// CDUP is CWD to the parent; at the root it fails like any other escape.
pub async fn handle_cdup_command(ctx: &mut CommandContext<'_>, _arg: &str) -> Result<(), FtpError> {
    change_directory(ctx, "..").await
}
