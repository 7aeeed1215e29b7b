use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_network::control::ControlChannel;
use crate::core_network::network::shutdown_signalled;
use crate::session::{SessionState, TransferType};
use log::debug;
use std::borrow::Cow;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;

/// Converts local line endings (LF) to network ASCII (CRLF). Existing CRLF
/// pairs are left alone. `last_was_cr` carries state across chunk borders.
pub fn to_network_ascii(input: &[u8], last_was_cr: &mut bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 16);
    for &byte in input {
        if byte == b'\n' && !*last_was_cr {
            out.push(b'\r');
        }
        out.push(byte);
        *last_was_cr = byte == b'\r';
    }
    out
}

/// Converts network ASCII (CRLF) to local line endings (LF). A CR at the end
/// of a chunk is held back in `pending_cr` until the next byte is known; call
/// `finish_network_ascii` at end of stream to flush it.
pub fn from_network_ascii(input: &[u8], pending_cr: &mut bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        if *pending_cr {
            *pending_cr = false;
            if byte == b'\n' {
                out.push(b'\n');
                continue;
            }
            out.push(b'\r');
        }
        if byte == b'\r' {
            *pending_cr = true;
        } else {
            out.push(byte);
        }
    }
    out
}

pub fn finish_network_ascii(pending_cr: &mut bool) -> &'static [u8] {
    if std::mem::take(pending_cr) {
        b"\r"
    } else {
        b""
    }
}

/// Runs `work` until it finishes, the client drops the control connection,
/// or the server shuts down, whichever comes first. Losing the control
/// connection cancels the transfer and closes its data connection.
pub async fn cancellable<T>(
    control: &mut ControlChannel,
    shutdown: &mut watch::Receiver<bool>,
    work: impl Future<Output = Result<T, FtpError>>,
) -> Result<T, FtpError> {
    tokio::select! {
        result = work => result,
        _ = control.closed() => Err(FtpError::ControlClosed(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "control connection closed during transfer",
        ))),
        _ = shutdown_signalled(shutdown) => Err(FtpError::Shutdown),
    }
}

/// Sends the 150 preliminary reply and connects the pending data channel.
/// The data mode is consumed even on failure.
pub async fn open_data_stream(ctx: &mut CommandContext<'_>) -> Result<TcpStream, FtpError> {
    let mode = std::mem::take(&mut ctx.session.data_mode);
    if !mode.is_pending() {
        return Err(FtpError::BadSequence("Use PORT or PASV first.".to_string()));
    }

    let label = match ctx.session.transfer_type {
        TransferType::Ascii => "ASCII",
        TransferType::Binary => "BINARY",
    };
    ctx.control
        .reply(150, &format!("Opening {} mode data connection.", label))
        .await?;

    ctx.session.state = SessionState::AwaitingDataConnection;
    let server = ctx.server;
    let peer = ctx.session.peer.ip();
    let stream = cancellable(
        ctx.control,
        ctx.shutdown,
        server.negotiator.establish(mode, peer),
    )
    .await?;

    ctx.session.state = SessionState::Transferring;
    debug!("[{}] Data connection open", ctx.session.peer);
    Ok(stream)
}

/// Copies `source` to the data connection, then closes it. Returns the
/// number of bytes put on the wire.
pub async fn send_stream<R, W>(
    mut source: R,
    data: &mut W,
    transfer_type: TransferType,
    buffer_size: usize,
    io_timeout: Duration,
) -> Result<u64, FtpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0; buffer_size];
    let mut last_was_cr = false;
    let mut sent = 0u64;

    loop {
        let bytes_read = source.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }

        let chunk: Cow<[u8]> = match transfer_type {
            TransferType::Ascii => Cow::Owned(to_network_ascii(&buffer[..bytes_read], &mut last_was_cr)),
            TransferType::Binary => Cow::Borrowed(&buffer[..bytes_read]),
        };
        with_timeout(io_timeout, data.write_all(&chunk)).await?;
        sent += chunk.len() as u64;
    }

    with_timeout(io_timeout, data.shutdown()).await?;
    Ok(sent)
}

/// Copies the data connection into `sink` until the client closes it.
/// Returns the number of bytes written locally.
pub async fn receive_stream<R, W>(
    data: &mut R,
    mut sink: W,
    transfer_type: TransferType,
    buffer_size: usize,
    io_timeout: Duration,
) -> Result<u64, FtpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0; buffer_size];
    let mut pending_cr = false;
    let mut written = 0u64;

    loop {
        let bytes_read = with_timeout(io_timeout, data.read(&mut buffer)).await?;
        if bytes_read == 0 {
            break;
        }

        let chunk: Cow<[u8]> = match transfer_type {
            TransferType::Ascii => Cow::Owned(from_network_ascii(&buffer[..bytes_read], &mut pending_cr)),
            TransferType::Binary => Cow::Borrowed(&buffer[..bytes_read]),
        };
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    let tail = finish_network_ascii(&mut pending_cr);
    sink.write_all(tail).await?;
    written += tail.len() as u64;
    sink.flush().await?;
    Ok(written)
}

/// Bounds one data connection operation. Stalls and resets abort the
/// transfer with 426 rather than failing the session.
async fn with_timeout<T>(
    io_timeout: Duration,
    op: impl Future<Output = io::Result<T>>,
) -> Result<T, FtpError> {
    match timeout(io_timeout, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(FtpError::TransferAborted(e.to_string())),
        Err(_) => Err(FtpError::TransferAborted("data connection timed out".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_wire(chunks: &[&str]) -> Vec<u8> {
        let mut state = false;
        chunks
            .iter()
            .flat_map(|c| to_network_ascii(c.as_bytes(), &mut state))
            .collect()
    }

    fn from_wire(chunks: &[&str]) -> Vec<u8> {
        let mut state = false;
        let mut out: Vec<u8> = chunks
            .iter()
            .flat_map(|c| from_network_ascii(c.as_bytes(), &mut state))
            .collect();
        out.extend_from_slice(finish_network_ascii(&mut state));
        out
    }

    #[test]
    fn test_lf_becomes_crlf_on_the_wire() {
        assert_eq!(to_wire(&["one\ntwo\n"]), b"one\r\ntwo\r\n");
        assert_eq!(to_wire(&["dos\r\nline"]), b"dos\r\nline");
        assert_eq!(to_wire(&["split\r", "\nnext\n"]), b"split\r\nnext\r\n");
    }

    #[test]
    fn test_crlf_becomes_lf_locally() {
        assert_eq!(from_wire(&["one\r\ntwo\r\n"]), b"one\ntwo\n");
        assert_eq!(from_wire(&["split\r", "\nnext"]), b"split\nnext");
        assert_eq!(from_wire(&["lone\rcr"]), b"lone\rcr");
        assert_eq!(from_wire(&["trailing\r"]), b"trailing\r");
    }

    #[test]
    fn test_ascii_store_then_retrieve_is_stable() {
        let wire = "alpha\r\nbeta\r\n\r\ngamma";
        let stored = from_wire(&[&wire[..6], &wire[6..]]);
        assert_eq!(stored, b"alpha\nbeta\n\ngamma");

        let mut last_was_cr = false;
        assert_eq!(to_network_ascii(&stored, &mut last_was_cr), wire.as_bytes());
    }

    #[tokio::test]
    async fn test_send_and_receive_streams() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        let expected = payload.clone();
        let sender = tokio::spawn(async move {
            send_stream(
                &payload[..],
                &mut server,
                TransferType::Binary,
                1024,
                Duration::from_secs(5),
            )
            .await
        });

        let mut received = Vec::new();
        let written = receive_stream(
            &mut client,
            &mut received,
            TransferType::Binary,
            333,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(sender.await.unwrap().unwrap(), 10_000);
        assert_eq!(written, 10_000);
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_stalled_data_connection_aborts() {
        let (mut client, _server) = tokio::io::duplex(64);
        let mut sink = Vec::new();
        let result = receive_stream(
            &mut client,
            &mut sink,
            TransferType::Binary,
            64,
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(result, Err(FtpError::TransferAborted(_))));
    }
}
