#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    QUIT,
    NOOP,
    SYST,
    FEAT,
    PWD,
    CWD,
    CDUP,
    LIST,
    NLST,
    TYPE,
    PASV,
    EPSV,
    PORT,
    RETR,
    STOR,
    SIZE,
    MKD,
    RMD,
    DELE,
    RNFR,
    RNTO,
}

impl FtpCommand {
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::USER),
            "PASS" => Some(FtpCommand::PASS),
            "QUIT" => Some(FtpCommand::QUIT),
            "NOOP" => Some(FtpCommand::NOOP),
            "SYST" => Some(FtpCommand::SYST),
            "FEAT" => Some(FtpCommand::FEAT),
            "PWD" | "XPWD" => Some(FtpCommand::PWD),
            "CWD" | "XCWD" => Some(FtpCommand::CWD),
            "CDUP" | "XCUP" => Some(FtpCommand::CDUP),
            "LIST" => Some(FtpCommand::LIST),
            "NLST" => Some(FtpCommand::NLST),
            "TYPE" => Some(FtpCommand::TYPE),
            "PASV" => Some(FtpCommand::PASV),
            "EPSV" => Some(FtpCommand::EPSV),
            "PORT" => Some(FtpCommand::PORT),
            "RETR" => Some(FtpCommand::RETR),
            "STOR" => Some(FtpCommand::STOR),
            "SIZE" => Some(FtpCommand::SIZE),
            "MKD" | "XMKD" => Some(FtpCommand::MKD),
            "RMD" | "XRMD" => Some(FtpCommand::RMD),
            "DELE" => Some(FtpCommand::DELE),
            "RNFR" => Some(FtpCommand::RNFR),
            "RNTO" => Some(FtpCommand::RNTO),
            _ => None,
        }
    }

    /// Commands allowed before login.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            FtpCommand::USER
                | FtpCommand::PASS
                | FtpCommand::QUIT
                | FtpCommand::NOOP
                | FtpCommand::SYST
                | FtpCommand::FEAT
        )
    }

    /// Commands that modify the tree and are refused in read-only mode.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            FtpCommand::STOR
                | FtpCommand::MKD
                | FtpCommand::RMD
                | FtpCommand::DELE
                | FtpCommand::RNFR
                | FtpCommand::RNTO
        )
    }

    /// Commands that consume the pending PASV/PORT data mode.
    pub fn uses_data_channel(&self) -> bool {
        matches!(
            self,
            FtpCommand::LIST | FtpCommand::NLST | FtpCommand::RETR | FtpCommand::STOR
        )
    }
}

/// Splits a control line into an upper-cased verb and the raw argument.
/// Everything after the first space is the argument, so file names keep
/// their inner spaces.
pub fn parse_command_line(line: &str) -> (String, String) {
    let line = line.trim_start();
    match line.split_once(' ') {
        Some((cmd, arg)) => (cmd.to_ascii_uppercase(), arg.trim_end().to_string()),
        None => (line.trim_end().to_ascii_uppercase(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(FtpCommand::from_str("user"), Some(FtpCommand::USER));
        assert_eq!(FtpCommand::from_str("Retr"), Some(FtpCommand::RETR));
        assert_eq!(FtpCommand::from_str("XPWD"), Some(FtpCommand::PWD));
        assert_eq!(FtpCommand::from_str("SITE"), None);
        assert_eq!(FtpCommand::from_str(""), None);
    }

    #[test]
    fn test_parse_command_line_keeps_spaces_in_argument() {
        assert_eq!(
            parse_command_line("stor my holiday photo.jpg"),
            ("STOR".to_string(), "my holiday photo.jpg".to_string())
        );
        assert_eq!(
            parse_command_line("PWD"),
            ("PWD".to_string(), String::new())
        );
        assert_eq!(
            parse_command_line("  TYPE I  "),
            ("TYPE".to_string(), "I".to_string())
        );
    }

    #[test]
    fn test_command_classes() {
        assert!(!FtpCommand::USER.requires_auth());
        assert!(!FtpCommand::QUIT.requires_auth());
        assert!(FtpCommand::LIST.requires_auth());
        assert!(FtpCommand::PASV.requires_auth());

        assert!(FtpCommand::STOR.is_write());
        assert!(FtpCommand::RNFR.is_write());
        assert!(!FtpCommand::RETR.is_write());

        assert!(FtpCommand::NLST.uses_data_channel());
        assert!(!FtpCommand::PASV.uses_data_channel());
    }
}
