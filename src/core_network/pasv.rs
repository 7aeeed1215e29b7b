use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_network::data_channel::DataMode;
use log::info;
use std::net::{IpAddr, Ipv4Addr};

/// Handles PASV: opens a listener and tells the client where to connect.
/// Any previously pending data mode is closed first.
pub async fn handle_pasv_command(ctx: &mut CommandContext<'_>, _arg: &str) -> Result<(), FtpError> {
    ctx.session.data_mode = DataMode::None;

    let listener = ctx
        .server
        .negotiator
        .open_passive(ctx.control.local_addr().ip())
        .await?;
    let endpoint = listener.endpoint();
    let IpAddr::V4(ip) = endpoint.ip() else {
        return Err(FtpError::ParameterNotImplemented(
            "PASV needs an IPv4 address, use EPSV".to_string(),
        ));
    };

    ctx.session.data_mode = DataMode::Passive(listener);
    info!("[{}] Passive mode on {}", ctx.session.peer, endpoint);
    ctx.control
        .send_line(&format_pasv_reply(ip, endpoint.port()))
        .await
}

/// Handles EPSV, the address-family neutral variant of PASV (RFC 2428).
pub async fn handle_epsv_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    if arg.eq_ignore_ascii_case("ALL") {
        return ctx.control.reply(200, "EPSV ALL command successful.").await;
    }

    ctx.session.data_mode = DataMode::None;
    let listener = ctx
        .server
        .negotiator
        .open_passive(ctx.control.local_addr().ip())
        .await?;
    let port = listener.endpoint().port();

    ctx.session.data_mode = DataMode::Passive(listener);
    info!("[{}] Extended passive mode on port {}", ctx.session.peer, port);
    ctx.control
        .reply(229, &format!("Entering Extended Passive Mode (|||{}|).", port))
        .await
}

pub fn format_pasv_reply(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!(
        "227 Entering Passive Mode ({},{},{},{},{},{}).",
        a,
        b,
        c,
        d,
        port / 256,
        port % 256
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pasv_reply_format() {
        assert_eq!(
            format_pasv_reply(Ipv4Addr::new(192, 168, 1, 10), 50021),
            "227 Entering Passive Mode (192,168,1,10,195,101)."
        );
        assert_eq!(
            format_pasv_reply(Ipv4Addr::LOCALHOST, 255),
            "227 Entering Passive Mode (127,0,0,1,0,255)."
        );
    }
}
