use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while building an exception handler.
///
/// These only ever occur at startup; a handler that built successfully never
/// produces one at request time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid status code: {value}")]
    InvalidStatusCode { value: String },

    #[error("Invalid content type: {value}")]
    InvalidContentType { value: String },

    #[error("Rule for category '{category}' has no status code")]
    MissingStatusCode { category: String },

    #[error("Failure category name must not be empty")]
    EmptyCategory,

    #[error("Invalid environment value for {key}: {value}")]
    InvalidEnvironment { key: String, value: String },
}

impl ConfigError {
    pub fn invalid_status(value: impl Into<String>) -> Self {
        Self::InvalidStatusCode {
            value: value.into(),
        }
    }

    pub fn invalid_content_type(value: impl Into<String>) -> Self {
        Self::InvalidContentType {
            value: value.into(),
        }
    }

    pub fn missing_status(category: impl Into<String>) -> Self {
        Self::MissingStatusCode {
            category: category.into(),
        }
    }

    pub fn invalid_environment(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnvironment {
            key: key.into(),
            value: value.into(),
        }
    }
}
