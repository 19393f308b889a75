//! Response body formatters
//!
//! A [`BodyFormatter`] turns a [`FailureContext`] into the response body. The
//! engine treats formatters as untrusted: a returned error or a panic is
//! caught and replaced with the generic body.
//!
//! Besides wrapping your own closures, this module ships a few ready-made
//! formatters. Only [`raw_message`] exposes the failure's own text, everything
//! else produces bodies that are safe to send to any client.

use crate::failure::FailureContext;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// The body sent when nothing more specific is configured, or when a
/// formatter fails.
pub const GENERIC_MESSAGE: &str = "An error occurred whilst processing your request";

/// The content type sent when neither the rule nor the global defaults set one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

type FormatFn = dyn Fn(&FailureContext<'_>) -> anyhow::Result<String> + Send + Sync;

static GENERIC: LazyLock<BodyFormatter> = LazyLock::new(|| BodyFormatter::new(|_| GENERIC_MESSAGE));

/// A shareable body formatting function
#[derive(Clone)]
pub struct BodyFormatter {
    format: Arc<FormatFn>,
}

impl BodyFormatter {
    /// Wrap an infallible formatter.
    pub fn new<F, B>(format: F) -> Self
    where
        F: Fn(&FailureContext<'_>) -> B + Send + Sync + 'static,
        B: Into<String>,
    {
        Self {
            format: Arc::new(move |context: &FailureContext<'_>| -> anyhow::Result<String> {
                Ok(format(context).into())
            }),
        }
    }

    /// Wrap a formatter that may fail, e.g. because serialization can.
    pub fn fallible<F>(format: F) -> Self
    where
        F: Fn(&FailureContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            format: Arc::new(format),
        }
    }

    /// Run the formatter. Panics are not caught here; the engine does that.
    pub fn format(&self, context: &FailureContext<'_>) -> anyhow::Result<String> {
        (self.format)(context)
    }
}

impl fmt::Debug for BodyFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyFormatter")
    }
}

/// The built-in formatter, always producing [`GENERIC_MESSAGE`].
pub fn generic() -> &'static BodyFormatter {
    &GENERIC
}

/// A fixed plain-text body.
pub fn text(message: impl Into<String>) -> BodyFormatter {
    let message = message.into();
    BodyFormatter::new(move |_| message.clone())
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorMessage<'a>,
}

#[derive(Serialize)]
struct ErrorMessage<'a> {
    message: &'a str,
}

/// `{"error":{"message":"..."}}` with a fixed message.
pub fn json_error(message: impl Into<String>) -> BodyFormatter {
    let message = message.into();
    BodyFormatter::fallible(move |_| {
        let body = ErrorBody {
            error: ErrorMessage { message: &message },
        };
        Ok(serde_json::to_string(&body)?)
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    status_code: u16,
    category: &'a str,
    message: &'a str,
    timestamp: String,
}

/// A JSON envelope carrying the status code, the failure category, a fixed
/// message and the time of the failure:
///
/// ```json
/// {"statusCode":404,"category":"NotFound","message":"...","timestamp":"2024-01-01T00:00:00+00:00"}
/// ```
pub fn json_envelope(message: impl Into<String>) -> BodyFormatter {
    let message = message.into();
    BodyFormatter::fallible(move |context| {
        let envelope = Envelope {
            status_code: context.status().as_u16(),
            category: context.category().name(),
            message: &message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        Ok(serde_json::to_string(&envelope)?)
    })
}

/// The failure's `Display` output. Leaks internal detail, meant for
/// development setups.
pub fn raw_message() -> BodyFormatter {
    BodyFormatter::new(|context| context.message())
}
