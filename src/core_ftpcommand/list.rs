use crate::core_error::FtpError;
use crate::core_ftpcommand::handlers::CommandContext;
use crate::core_ftpcommand::transfer::{cancellable, open_data_stream, send_stream};
use crate::session::TransferType;
use chrono::{DateTime, Duration as ChronoDuration, Local};
use log::{debug, info};
use std::fs::Metadata;
use tokio::fs;

pub async fn handle_list_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    send_listing(ctx, arg, true).await
}

pub async fn handle_nlst_command(ctx: &mut CommandContext<'_>, arg: &str) -> Result<(), FtpError> {
    send_listing(ctx, arg, false).await
}

/// Builds the listing first, so a bad path gets 550 before any data
/// connection is attempted, then streams it over the pending data channel.
async fn send_listing(ctx: &mut CommandContext<'_>, arg: &str, long: bool) -> Result<(), FtpError> {
    let target = strip_list_flags(arg);
    let target = if target.is_empty() { "." } else { target };
    let resolved = ctx
        .server
        .sandbox
        .resolve(target, &ctx.session.current_dir)?;

    let metadata = fs::metadata(&resolved.absolute)
        .await
        .map_err(|_| FtpError::NotFound(resolved.virtual_path.clone()))?;

    let now = Local::now();
    let mut lines = Vec::new();
    if metadata.is_dir() {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&resolved.absolute).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Entries can vanish between readdir and stat.
            match entry.metadata().await {
                Ok(meta) => entries.push((name, meta)),
                Err(e) => debug!("Skipping {:?} in listing: {}", name, e),
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, meta) in &entries {
            lines.push(listing_line(name, meta, long, now));
        }
    } else {
        let name = resolved
            .absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        lines.push(listing_line(&name, &metadata, long, now));
    }

    let mut body = String::new();
    for line in &lines {
        body.push_str(line);
        body.push_str("\r\n");
    }

    let mut data = open_data_stream(ctx).await?;
    let buffer_size = ctx.server.config.download_buffer_size;
    let io_timeout = ctx.server.negotiator.timeout();
    // Lines are already CRLF terminated, whatever TYPE says.
    cancellable(
        ctx.control,
        ctx.shutdown,
        send_stream(body.as_bytes(), &mut data, TransferType::Binary, buffer_size, io_timeout),
    )
    .await?;
    drop(data);

    info!("Listed {} entries of {}", lines.len(), resolved.virtual_path);
    ctx.control.reply(226, "Directory send OK.").await
}

/// Drops leading `ls` style options such as `-la`, which many clients send
/// with LIST.
fn strip_list_flags(arg: &str) -> &str {
    let mut rest = arg.trim();
    while rest.starts_with('-') {
        rest = match rest.split_once(' ') {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }
    rest
}

fn listing_line(name: &str, meta: &Metadata, long: bool, now: DateTime<Local>) -> String {
    if !long {
        return name.to_string();
    }
    let modified = meta
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or(now);
    format_list_line(name, meta.is_dir(), meta.len(), permission_bits(meta), modified, now)
}

#[cfg(unix)]
fn permission_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// One `ls -l` line. Entries older than six months show the year instead
/// of the time, like `ls` does.
pub fn format_list_line(
    name: &str,
    is_dir: bool,
    size: u64,
    mode: u32,
    modified: DateTime<Local>,
    now: DateTime<Local>,
) -> String {
    let mut perms = String::with_capacity(10);
    perms.push(if is_dir { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        perms.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        perms.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        perms.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }

    let recent = now.signed_duration_since(modified) < ChronoDuration::days(180)
        && modified <= now + ChronoDuration::hours(1);
    let date = if recent {
        modified.format("%b %e %H:%M")
    } else {
        modified.format("%b %e  %Y")
    };

    format!(
        "{} {:>3} {:<8} {:<8} {:>12} {} {}",
        perms,
        if is_dir { 2 } else { 1 },
        "ftp",
        "ftp",
        size,
        date,
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_strip_list_flags() {
        assert_eq!(strip_list_flags(""), "");
        assert_eq!(strip_list_flags("-la"), "");
        assert_eq!(strip_list_flags("-l -a music"), "music");
        assert_eq!(strip_list_flags("my files"), "my files");
    }

    #[test]
    fn test_format_list_line_recent_file() {
        let now = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let modified = Local.with_ymd_and_hms(2024, 6, 1, 9, 5, 0).unwrap();
        let line = format_list_line("song.mp3", false, 2134, 0o644, modified, now);
        assert!(line.starts_with("-rw-r--r--   1 ftp      ftp "));
        assert!(line.ends_with("2134 Jun  1 09:05 song.mp3"));
    }

    #[test]
    fn test_format_list_line_old_directory() {
        let now = Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let modified = Local.with_ymd_and_hms(2022, 12, 24, 18, 0, 0).unwrap();
        let line = format_list_line("backups", true, 4096, 0o755, modified, now);
        assert!(line.starts_with("drwxr-xr-x   2 ftp"));
        assert!(line.ends_with("Dec 24  2022 backups"));
    }
}
