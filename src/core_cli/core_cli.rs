use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lanftpd", about = "Share a directory over FTP on the local network.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on, overrides the configuration file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to share, overrides the configuration file
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Refuse every command that modifies files
    #[arg(long)]
    pub read_only: bool,

    /// Accept any username without a password
    #[arg(long)]
    pub anonymous: bool,

    /// Print a bcrypt hash of the given password for the configuration file and exit
    #[arg(long, value_name = "PASSWORD")]
    pub hash_password: Option<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_parse() {
        let cli = Cli::parse_from(["lanftpd", "--port", "2222", "--root", "/srv", "--read-only"]);
        assert_eq!(cli.port, Some(2222));
        assert_eq!(cli.root, Some(PathBuf::from("/srv")));
        assert!(cli.read_only);
        assert!(!cli.anonymous);
        assert!(cli.config.is_none());
    }
}
