use crate::formatter::{self, BodyFormatter, DEFAULT_CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};

/// Global response settings, used when no rule matches and to fill in the
/// fields a matching rule leaves unset.
///
/// Every field is optional; unset fields resolve to the built-in safe
/// fallbacks (500, `text/plain`, the generic message).
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicy {
    status: Option<StatusCode>,
    content_type: Option<HeaderValue>,
    formatter: Option<BodyFormatter>,
}

impl DefaultPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub(crate) fn set_content_type(&mut self, content_type: HeaderValue) {
        self.content_type = Some(content_type);
    }

    pub(crate) fn set_formatter(&mut self, formatter: BodyFormatter) {
        self.formatter = Some(formatter);
    }

    /// The configured global content type, if any.
    pub fn global_content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    /// The configured global formatter, if any.
    pub fn global_formatter(&self) -> Option<&BodyFormatter> {
        self.formatter.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn content_type(&self) -> HeaderValue {
        self.content_type.clone().unwrap_or_else(builtin_content_type)
    }

    pub fn formatter(&self) -> &BodyFormatter {
        self.formatter.as_ref().unwrap_or(formatter::generic())
    }

    /// Status, content type and formatter with fallbacks applied.
    pub fn resolve_default(&self) -> (StatusCode, HeaderValue, &BodyFormatter) {
        (self.status(), self.content_type(), self.formatter())
    }
}

pub(crate) fn builtin_content_type() -> HeaderValue {
    HeaderValue::from_static(DEFAULT_CONTENT_TYPE)
}
