//! Configuration, filesystem paths and logging for the kiosk clients.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_LOG_LEVEL, DEFAULT_RETRY_DELAY_MS, SUBMIT_COMBINATION_PATH,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::init_logging;
pub use paths::Paths;
