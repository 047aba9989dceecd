//! Base configuration shared by every service in the workspace.

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Settings common to all services. Service-specific config structs
/// flatten this in alongside their own sections.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TCP port the HTTP server binds to.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load from an optional `configuration` file, overridden by `APP__`
    /// prefixed environment variables.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
