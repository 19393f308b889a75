use dashmap::DashMap;
use std::env;
use std::sync::Arc;

/// Environment variable overriding the global content type
pub const CONTENT_TYPE_KEY: &str = "MESHESTRA_EXCEPTION_CONTENT_TYPE";

/// Environment variable overriding the status code sent when no rule matches
pub const STATUS_CODE_KEY: &str = "MESHESTRA_EXCEPTION_STATUS_CODE";

const PREFIX: &str = "MESHESTRA_EXCEPTION_";

/// Snapshot of the exception handling settings found in the environment
///
/// Read once at startup and handed to
/// [`ExceptionHandlerBuilder::with_config`](crate::ExceptionHandlerBuilder::with_config).
/// Only variables starting with `MESHESTRA_EXCEPTION_` are captured.
#[derive(Clone, Default, Debug)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::from_pairs(env::vars().filter(|(key, _)| key.starts_with(PREFIX)))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let service = Self::default();
        for (key, value) in pairs {
            service.config.insert(key.into(), value.into());
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.config.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }
}
