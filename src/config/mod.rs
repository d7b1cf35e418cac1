pub mod config;
pub mod logging;

pub use config::{load_config, print_schema, Config, ConfigV1, CookieConfig};
pub use logging::LoggingConfig;
