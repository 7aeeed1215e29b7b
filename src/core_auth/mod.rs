pub mod auth_policy;
pub mod helper;

pub use auth_policy::{AuthOutcome, AuthPolicy};
