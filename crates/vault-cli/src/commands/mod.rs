//! Command implementations for vault-cli

pub mod browse;
pub mod edit;
pub mod init;

pub use browse::{run_cat, run_history, run_info, run_ls};
pub use edit::{run_cp, run_mkdir, run_mv, run_put, run_rm};
pub use init::run_init;
