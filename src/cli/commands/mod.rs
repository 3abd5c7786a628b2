//! CLI command implementations.

mod check;
mod init;
mod status;

pub use check::{cmd_check, CheckOptions};
pub use init::cmd_init;
pub use status::cmd_status;
