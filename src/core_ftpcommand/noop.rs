use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;

pub async fn handle_noop_command(ctx: &mut CommandContext<'_>, _arg: &str) -> Result<(), FtpError> {
    ctx.control.reply(200, "OK, n00p n00p !").await
}
