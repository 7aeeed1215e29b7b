use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_network::data_channel::DataMode;
use log::info;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Parses `h1,h2,h3,h4,p1,p2` into an address.
pub fn parse_port_argument(arg: &str) -> Result<SocketAddr, FtpError> {
    let parts: Vec<&str> = arg.trim().split(',').collect();
    if parts.len() != 6 {
        return Err(FtpError::InvalidArgument(format!("malformed PORT argument {:?}", arg)));
    }

    let bytes: Vec<u8> = parts
        .iter()
        .map(|x| x.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| FtpError::InvalidArgument(format!("malformed PORT argument {:?}", arg)))?;

    let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = (bytes[4] as u16) << 8 | bytes[5] as u16;
    Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
}

/// Handles PORT: records where to connect for the next transfer. The
/// connection itself is made when that transfer starts.
pub async fn handle_port_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    ctx.session.data_mode = DataMode::None;

    let target = parse_port_argument(arg)?;
    ctx.server
        .negotiator
        .check_active_target(target, ctx.session.peer.ip())?;

    info!("[{}] Active mode, data target {}", ctx.session.peer, target);
    ctx.session.data_mode = DataMode::Active(target);
    ctx.control.reply(200, "PORT command successful.").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_port_argument() {
        let addr = parse_port_argument("127,0,0,1,195,101").unwrap();
        assert_eq!(addr, "127.0.0.1:50021".parse().unwrap());

        let spaced = parse_port_argument(" 10, 0, 0, 2, 4, 1 ").unwrap();
        assert_eq!(spaced, "10.0.0.2:1025".parse().unwrap());
    }

    #[test]
    fn test_parse_invalid_port_argument() {
        for arg in ["", "1,2,3,4,5", "1,2,3,4,5,6,7", "256,0,0,1,1,1", "a,b,c,d,e,f", "1,2,3,4,5,-1"] {
            assert!(
                matches!(parse_port_argument(arg), Err(FtpError::InvalidArgument(_))),
                "{:?} should be rejected",
                arg
            );
        }
    }
}
