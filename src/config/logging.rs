use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Logging output configuration.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
    /// "console" for pretty output, "json" for structured lines.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: "console".to_string(),
        }
    }
}
