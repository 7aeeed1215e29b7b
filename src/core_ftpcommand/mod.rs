// Command parsing and dispatch
pub mod ftpcommand;
pub mod handlers;

// One module per FTP command
pub mod cdup;
pub mod cwd;
pub mod dele;
pub mod feat;
pub mod list;
pub mod mkd;
pub mod noop;
pub mod pass;
pub mod pwd;
pub mod quit;
pub mod retr;
pub mod rmd;
pub mod rnfr;
pub mod rnto;
pub mod size;
pub mod stor;
pub mod syst;
pub mod type_;
pub mod user;

// Data transfer plumbing and shared helpers
pub mod transfer;
pub mod utils;
