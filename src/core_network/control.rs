use crate::constants::MAX_COMMAND_LENGTH;
use crate::core_error::FtpError;
use log::{debug, trace};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// The control connection of one session: CRLF-terminated commands in,
/// numbered replies out.
#[derive(Debug)]
pub struct ControlChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl ControlChannel {
    pub fn new(stream: TcpStream) -> Result<Self, FtpError> {
        let local_addr = stream.local_addr().map_err(FtpError::ControlClosed)?;
        let peer_addr = stream.peer_addr().map_err(FtpError::ControlClosed)?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            local_addr,
            peer_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub async fn reply(&mut self, code: u16, text: &str) -> Result<(), FtpError> {
        self.send_line(&format!("{} {}", code, text)).await
    }

    /// Sends a reply line that already carries its code, such as the output
    /// of `FtpError::to_ftp_response`.
    pub async fn send_line(&mut self, line: &str) -> Result<(), FtpError> {
        debug!("[{}] <- {}", self.peer_addr, line);
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .map_err(FtpError::ControlClosed)?;
        self.writer.flush().await.map_err(FtpError::ControlClosed)
    }

    /// `code-first`, indented middle lines, then `code last`.
    pub async fn reply_multiline(
        &mut self,
        code: u16,
        first: &str,
        lines: &[&str],
        last: &str,
    ) -> Result<(), FtpError> {
        let mut message = format!("{}-{}\r\n", code, first);
        for line in lines {
            message.push_str(&format!(" {}\r\n", line));
        }
        message.push_str(&format!("{} {}\r\n", code, last));

        debug!("[{}] <- {}", self.peer_addr, message.trim_end());
        self.writer
            .write_all(message.as_bytes())
            .await
            .map_err(FtpError::ControlClosed)?;
        self.writer.flush().await.map_err(FtpError::ControlClosed)
    }

    /// Reads one command line without its line ending. `Ok(None)` means the
    /// client closed the connection. Lines longer than `MAX_COMMAND_LENGTH`
    /// are drained and reported as a protocol error.
    pub async fn read_command(&mut self) -> Result<Option<String>, FtpError> {
        let mut line = Vec::new();
        let n = (&mut self.reader)
            .take(MAX_COMMAND_LENGTH as u64)
            .read_until(b'\n', &mut line)
            .await
            .map_err(FtpError::ControlClosed)?;

        if n == 0 {
            return Ok(None);
        }

        if !line.ends_with(b"\n") && n >= MAX_COMMAND_LENGTH {
            self.discard_line().await?;
            return Err(FtpError::ProtocolError("command line too long".to_string()));
        }

        let text = String::from_utf8_lossy(&line)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        trace!("[{}] -> {:?}", self.peer_addr, text);
        Ok(Some(text))
    }

    async fn discard_line(&mut self) -> Result<(), FtpError> {
        loop {
            let mut chunk = Vec::new();
            let n = (&mut self.reader)
                .take(MAX_COMMAND_LENGTH as u64)
                .read_until(b'\n', &mut chunk)
                .await
                .map_err(FtpError::ControlClosed)?;
            if n == 0 || chunk.ends_with(b"\n") {
                return Ok(());
            }
        }
    }

    /// Resolves once the client has closed the control connection. Pending
    /// input (a pipelined command) is left unread and keeps this pending.
    pub async fn closed(&mut self) {
        match self.reader.fill_buf().await {
            Ok(buf) if !buf.is_empty() => std::future::pending::<()>().await,
            _ => {}
        }
    }
}
