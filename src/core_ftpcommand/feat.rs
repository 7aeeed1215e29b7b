use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;

const FEATURES: [&str; 3] = ["EPSV", "PASV", "SIZE"];

pub async fn handle_feat_command(ctx: &mut CommandContext<'_>) -> Result<(), FtpError> {
    ctx.control
        .reply_multiline(211, "Features:", &FEATURES, "End")
        .await
}
