use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::media::MediaConfig;
use crate::store::StoreConfig;
use crate::tokens::TokenConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: bind address, store backend, token secrets,
/// media host, cookie policy and logging.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    pub store: StoreConfig,
    pub tokens: TokenConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport policy for the session cookies.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct CookieConfig {
    /// Set `false` only for plain-HTTP local development.
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig { secure: true }
    }
}

/// Load config from "./config.yaml", with `VIDEOTUBE_`-prefixed environment
/// variables merged on top (e.g. `VIDEOTUBE_TOKENS__ACCESS_SECRET`).
pub fn load_config() -> ConfigV1 {
    let figment = Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("VIDEOTUBE_").split("__"));

    let config = match figment.extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    match config {
        Config::ConfigV1(c) => c,
    }

    // handle configuration migration between versions here when necessary
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}
