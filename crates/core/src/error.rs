/// Result alias that carries the custom [`ChoreoError`] type.
pub type Result<T> = std::result::Result<T, ChoreoError>;

/// Common error type for the core crate.
///
/// Only the loading surfaces (configuration files, scenario files) produce
/// errors. Motion and choreography operations never fail.
#[derive(Debug, thiserror::Error)]
pub enum ChoreoError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A configuration or scenario file could not be parsed.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// A configuration value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChoreoError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for ChoreoError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ChoreoError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
