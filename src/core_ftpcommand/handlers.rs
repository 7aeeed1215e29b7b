use crate::core_error::FtpError;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::{
    cdup, cwd, dele, feat, list, mkd, noop, pass, pwd, quit, retr, rmd, rnfr, rnto, size, stor,
    syst, type_, user,
};
use crate::core_network::control::ControlChannel;
use crate::core_network::network::ServerContext;
use crate::core_network::{pasv, port};
use crate::session::Session;
use log::info;
use tokio::sync::watch;

/// What a command handler gets to work with: the session it belongs to, the
/// control connection, and the server-wide policy objects.
pub struct CommandContext<'a> {
    pub control: &'a mut ControlChannel,
    pub session: &'a mut Session,
    pub server: &'a ServerContext,
    pub shutdown: &'a mut watch::Receiver<bool>,
}

/// Runs one command against the session. Errors that are not session
/// terminal are turned into a reply by the caller and the session goes on.
pub async fn dispatch(
    ctx: &mut CommandContext<'_>,
    command: &str,
    arg: &str,
) -> Result<(), FtpError> {
    if command.is_empty() {
        return Err(FtpError::ProtocolError("empty command line".to_string()));
    }
    let Some(cmd) = FtpCommand::from_str(command) else {
        info!("[{}] Unknown command: {}", ctx.session.peer, command);
        return Err(FtpError::NotImplemented(command.to_string()));
    };

    let shown_arg = if cmd == FtpCommand::PASS { "****" } else { arg };
    info!("[{}] Received command: {} {}", ctx.session.peer, command, shown_arg);

    let result = execute(ctx, cmd, arg).await;

    // A data mode belongs to exactly one transfer, whatever its outcome.
    if cmd.uses_data_channel() {
        ctx.session.transfer_finished();
    }
    result
}

async fn execute(ctx: &mut CommandContext<'_>, cmd: FtpCommand, arg: &str) -> Result<(), FtpError> {
    if cmd.requires_auth() && !ctx.session.is_authenticated() {
        return Err(FtpError::NotLoggedIn);
    }
    if cmd.is_write() && ctx.server.config.read_only {
        return Err(FtpError::PermissionDenied(format!(
            "{:?} refused, server is read-only",
            cmd
        )));
    }
    if cmd != FtpCommand::RNTO {
        ctx.session.rename_from = None;
    }

    match cmd {
        FtpCommand::USER => user::handle_user_command(ctx, arg).await,
        FtpCommand::PASS => pass::handle_pass_command(ctx, arg).await,
        FtpCommand::QUIT => quit::handle_quit_command(ctx, arg).await,
        FtpCommand::NOOP => noop::handle_noop_command(ctx, arg).await,
        FtpCommand::SYST => syst::handle_syst_command(ctx).await,
        FtpCommand::FEAT => feat::handle_feat_command(ctx).await,
        FtpCommand::PWD => pwd::handle_pwd_command(ctx).await,
        FtpCommand::CWD => cwd::handle_cwd_command(ctx, arg).await,
        FtpCommand::CDUP => cdup::handle_cdup_command(ctx, arg).await,
        FtpCommand::LIST => list::handle_list_command(ctx, arg).await,
        FtpCommand::NLST => list::handle_nlst_command(ctx, arg).await,
        FtpCommand::TYPE => type_::handle_type_command(ctx, arg).await,
        FtpCommand::PASV => pasv::handle_pasv_command(ctx, arg).await,
        FtpCommand::EPSV => pasv::handle_epsv_command(ctx, arg).await,
        FtpCommand::PORT => port::handle_port_command(ctx, arg).await,
        FtpCommand::RETR => retr::handle_retr_command(ctx, arg).await,
        FtpCommand::STOR => stor::handle_stor_command(ctx, arg).await,
        FtpCommand::SIZE => size::handle_size_command(ctx, arg).await,
        FtpCommand::MKD => mkd::handle_mkd_command(ctx, arg).await,
        FtpCommand::RMD => rmd::handle_rmd_command(ctx, arg).await,
        FtpCommand::DELE => dele::handle_dele_command(ctx, arg).await,
        FtpCommand::RNFR => rnfr::handle_rnfr_command(ctx, arg).await,
        FtpCommand::RNTO => rnto::handle_rnto_command(ctx, arg).await,
    }
}
