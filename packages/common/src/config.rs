use serde::Deserialize;

/// Queue ingestion settings shared by the relay and the tooling that feeds it.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether the progress queue consumer runs. Default: false (HTTP ingestion only).
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue the judging engine publishes progress events to. Default: "judge_progress".
    #[serde(default = "default_mq_progress_queue_name")]
    pub progress_queue_name: String,
}

fn default_mq_enabled() -> bool {
    false
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_progress_queue_name() -> String {
    "judge_progress".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            progress_queue_name: default_mq_progress_queue_name(),
        }
    }
}
