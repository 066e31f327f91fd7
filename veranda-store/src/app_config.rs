use serde::Deserialize;
use std::env;
use veranda_booking::BookingRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub booking: BookingRules,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub feeds: FeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_sync_tick_seconds")]
    pub sync_tick_seconds: u64,
    #[serde(default = "default_lifecycle_tick_seconds")]
    pub lifecycle_tick_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_sync_tick_seconds() -> u64 {
    300
}

fn default_lifecycle_tick_seconds() -> u64 {
    60
}

fn default_request_timeout_seconds() -> u64 {
    20
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sync_tick_seconds: default_sync_tick_seconds(),
            lifecycle_tick_seconds: default_lifecycle_tick_seconds(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default").required(false))
            // Add in the current environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `VERANDA__BOOKING__LOCK_TTL_MINUTES=15`
            .add_source(config::Environment::with_prefix("VERANDA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
