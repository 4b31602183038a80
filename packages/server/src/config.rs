use std::time::Duration;

use common::MqAppConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Postgres URL. Without one, terminal results live in process memory.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Credentials the judging engine presents when posting progress events over HTTP.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgeConfig {
    pub token: String,
    /// Seconds without events after which a submission's in-flight state is dropped.
    #[serde(default = "default_lane_idle_secs")]
    pub lane_idle_secs: u64,
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

fn default_lane_idle_secs() -> u64 {
    3600
}
fn default_reap_interval_secs() -> u64 {
    60
}

impl JudgeConfig {
    pub fn lane_idle(&self) -> Duration {
        Duration::from_secs(self.lane_idle_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    /// Delay between a terminal broadcast and dropping that submission's subscriptions.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Frames buffered per connection before new frames are dropped.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_grace_period_ms() -> u64 {
    5000
}
fn default_outbound_buffer() -> usize {
    64
}
fn default_max_connections() -> usize {
    10_000
}

impl RealtimeConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            outbound_buffer: default_outbound_buffer(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub judge: JudgeConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., RELAY__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
