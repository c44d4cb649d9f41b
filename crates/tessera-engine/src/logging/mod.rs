//! Logger initialization over the `log` facade, backed by `env_logger`.

mod init;

pub use init::{DEFAULT_FILTER, LoggingConfig, init_logging};
