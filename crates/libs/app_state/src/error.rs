use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting '{0}'")]
    Missing(&'static str),

    #[error("Invalid setting '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}
