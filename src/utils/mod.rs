pub mod config;
pub mod fd_limit;
pub(crate) mod fsbulk_toml;
pub mod logger;
pub mod report;

pub use config::*;
pub use fd_limit::{FD_BATCH_DIVISOR, max_open_fds};
pub use logger::{Colors, setup_logging};
pub use report::report_error;
