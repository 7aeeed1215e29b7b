use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::session::TransferType;

/// Handles the TYPE FTP command.
///
/// `A` (optionally with the `N` format) selects ASCII, `I` and `L 8` select
/// binary. EBCDIC and other byte sizes are not supported.
pub async fn handle_type_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    let transfer_type = parse_type_argument(arg)?;
    ctx.session.transfer_type = transfer_type;

    let response = match transfer_type {
        TransferType::Ascii => "Type set to A",
        TransferType::Binary => "Type set to I",
    };
    ctx.control.reply(200, response).await
}

pub fn parse_type_argument(arg: &str) -> Result<TransferType, FtpError> {
    let parts: Vec<String> = arg
        .split_whitespace()
        .map(|s| s.to_ascii_uppercase())
        .collect();
    let primary_type = parts.first().map(String::as_str).unwrap_or_default();
    let second_arg = parts.get(1).map(String::as_str);

    match (primary_type, second_arg) {
        ("", _) => Err(FtpError::InvalidArgument("TYPE needs a type".to_string())),
        ("A", None | Some("N")) => Ok(TransferType::Ascii),
        ("I", None) => Ok(TransferType::Binary),
        ("L", Some("8")) => Ok(TransferType::Binary),
        ("L", None) => Err(FtpError::InvalidArgument(
            "Byte size parameter required for TYPE L.".to_string(),
        )),
        _ => Err(FtpError::ParameterNotImplemented(arg.to_string())),
    }
}
