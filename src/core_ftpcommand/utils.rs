use crate::core_error::FtpError;
use crate::core_fs::ResolvedPath;
use crate::core_ftpcommand::handlers::CommandContext;

/// Resolves a path argument against the session's current directory.
pub fn resolve_argument(ctx: &CommandContext<'_>, arg: &str) -> Result<ResolvedPath, FtpError> {
    if arg.trim().is_empty() {
        return Err(FtpError::InvalidArgument("missing path argument".to_string()));
    }
    ctx.server.sandbox.resolve(arg, &ctx.session.current_dir)
}

/// Quotes a path for a 257 reply. Embedded quotes are doubled (RFC 959).
pub fn quote_path(path: &str) -> String {
    format!("\"{}\"", path.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_path() {
        assert_eq!(quote_path("/"), "\"/\"");
        assert_eq!(quote_path("/a \"b\""), "\"/a \"\"b\"\"\"");
    }
}
