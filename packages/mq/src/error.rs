use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Failed to connect to broker at {url}: {reason}")]
    Connection { url: String, reason: String },
}
