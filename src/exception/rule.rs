use crate::category::FailureCategory;
use crate::formatter::BodyFormatter;
use axum::http::{HeaderValue, StatusCode};

/// Response fields configured for one failure category.
///
/// The status code is mandatory. Content type and formatter are optional;
/// when absent the engine falls back to the global defaults.
#[derive(Debug, Clone)]
pub struct Rule {
    category: &'static FailureCategory,
    status: StatusCode,
    content_type: Option<HeaderValue>,
    formatter: Option<BodyFormatter>,
}

impl Rule {
    pub fn new(category: &'static FailureCategory, status: StatusCode) -> Self {
        Self {
            category,
            status,
            content_type: None,
            formatter: None,
        }
    }

    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_formatter(mut self, formatter: BodyFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn category(&self) -> &'static FailureCategory {
        self.category
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    pub fn formatter(&self) -> Option<&BodyFormatter> {
        self.formatter.as_ref()
    }
}
