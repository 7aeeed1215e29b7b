use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::utils::quote_path;

pub async fn handle_pwd_command(ctx: &mut CommandContext<'_>) -> Result<(), FtpError> {
    let response = format!("{} is the current directory.", quote_path(&ctx.session.current_dir));
    ctx.control.reply(257, &response).await
}
