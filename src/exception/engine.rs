use super::policy::builtin_content_type;
use super::{DefaultPolicy, ExceptionHandlerBuilder, RuleRegistry};
use crate::category::FailureCategory;
use crate::failure::{Classifiers, FailureContext, panic_message};
use crate::formatter::{BodyFormatter, GENERIC_MESSAGE};
use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub(crate) type ErrorObserver = Arc<dyn Fn(&FailureContext<'_>) + Send + Sync>;

/// The final status, content type and body for one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResponse {
    status: StatusCode,
    content_type: HeaderValue,
    body: String,
}

impl ResolvedResponse {
    /// The response used when formatting itself fails.
    pub fn generic() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: builtin_content_type(),
            body: GENERIC_MESSAGE.to_owned(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &HeaderValue {
        &self.content_type
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Overwrite status, content type and body of an existing response.
    ///
    /// Headers and extensions other than `Content-Type` and `Content-Length`
    /// are left alone.
    pub fn write_to(self, response: &mut Response) {
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::CONTENT_TYPE, self.content_type);
        *response.body_mut() = Body::from(self.body);
    }
}

impl IntoResponse for ResolvedResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

/// Resolves raised failures into responses.
///
/// Built once at startup through [`ExceptionHandler::builder`] and shared
/// read-only afterwards; resolution takes no locks and does no I/O, so one
/// handler can serve any number of concurrent requests.
///
/// Resolution of a failure:
///
/// 1. Classify the failure into its concrete category.
/// 2. Find the rule of the closest ancestor-or-self category.
/// 3. With a rule, take its status code. Content type and formatter come from
///    the rule if set, else the global defaults, else the built-ins.
/// 4. Without a rule, take everything from the global defaults.
/// 5. Run the formatter. If it errors or panics, answer with the generic
///    500 response instead.
/// 6. Notify the observer, if any, with the status actually sent.
pub struct ExceptionHandler {
    pub(crate) registry: RuleRegistry,
    pub(crate) defaults: DefaultPolicy,
    pub(crate) classifiers: Classifiers,
    pub(crate) observer: Option<ErrorObserver>,
}

impl ExceptionHandler {
    pub fn builder() -> ExceptionHandlerBuilder {
        ExceptionHandlerBuilder::new()
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn defaults(&self) -> &DefaultPolicy {
        &self.defaults
    }

    /// The concrete category of a raised failure.
    pub fn classify(&self, error: &(dyn Error + 'static)) -> &'static FailureCategory {
        self.classifiers.classify(error)
    }

    pub fn resolve(&self, error: &(dyn Error + Send + Sync + 'static)) -> ResolvedResponse {
        let category = self.classify(error);

        let (status, content_type, formatter) = match self.registry.resolve(category) {
            Some(rule) => {
                tracing::debug!(
                    "Failure '{}' matched rule for '{}'",
                    category,
                    rule.category()
                );
                let content_type = rule
                    .content_type()
                    .or(self.defaults.global_content_type())
                    .cloned()
                    .unwrap_or_else(builtin_content_type);
                let formatter = rule
                    .formatter()
                    .unwrap_or_else(|| self.defaults.formatter());
                (rule.status(), content_type, formatter)
            }
            None => {
                tracing::debug!("Failure '{}' matched no rule, using defaults", category);
                self.defaults.resolve_default()
            }
        };

        let resolved = match render(formatter, &FailureContext::new(error, category, status)) {
            Ok(body) => ResolvedResponse {
                status,
                content_type,
                body,
            },
            Err(reason) => {
                tracing::warn!(
                    "Body formatter failed for '{}': {}; sending generic response",
                    category,
                    reason
                );
                ResolvedResponse::generic()
            }
        };

        self.notify(&FailureContext::new(error, category, resolved.status));
        resolved
    }

    /// Resolve `error` and write the result onto `response`.
    pub fn apply(&self, error: &(dyn Error + Send + Sync + 'static), response: &mut Response) {
        self.resolve(error).write_to(response);
    }

    /// Resolve `error` into a fresh response.
    pub fn respond(&self, error: &(dyn Error + Send + Sync + 'static)) -> Response {
        self.resolve(error).into_response()
    }

    fn notify(&self, context: &FailureContext<'_>) {
        let Some(observer) = &self.observer else {
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(context))) {
            tracing::warn!("Error observer panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

impl fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandler")
            .field("registry", &self.registry)
            .field("defaults", &self.defaults)
            .field("classifiers", &self.classifiers)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

fn render(formatter: &BodyFormatter, context: &FailureContext<'_>) -> Result<String, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| formatter.format(context))) {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::*;
    use crate::formatter;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("An invalid argument supplied")]
    struct InvalidArgument;

    #[derive(Debug, thiserror::Error)]
    #[error("Parameter 'id' was missing")]
    struct MissingArgument;

    #[derive(Debug, thiserror::Error)]
    #[error("database password is hunter2")]
    struct Internal;

    fn base() -> ExceptionHandlerBuilder {
        ExceptionHandler::builder()
            .classify_as::<InvalidArgument>(&ARGUMENT_INVALID)
            .classify_as::<MissingArgument>(&ARGUMENT_MISSING)
    }

    #[test]
    fn test_rule_overrides_global_formatter() {
        let handler = base()
            .content_type("application/json")
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400)
                    .using_formatter(|_| r#"{"error":{"message":"Oops, something went wrong"}}"#)
            })
            .message_formatter(|_| "This will be overridden")
            .build()
            .unwrap();

        let resolved = handler.resolve(&InvalidArgument);
        assert_eq!(resolved.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resolved.content_type(), "application/json");
        assert_eq!(
            resolved.body(),
            r#"{"error":{"message":"Oops, something went wrong"}}"#
        );
    }

    #[test]
    fn test_global_formatter_used_when_rule_has_none() {
        let handler = base()
            .for_category(&ARGUMENT_INVALID, |rule| rule.return_status_code(400))
            .message_formatter(|f| format!("global: {}", f.category()))
            .build()
            .unwrap();

        let resolved = handler.resolve(&InvalidArgument);
        assert_eq!(resolved.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resolved.body(), "global: ArgumentInvalid");
    }

    #[test]
    fn test_builtin_formatter_when_nothing_configured() {
        let handler = base()
            .for_category(&ARGUMENT_INVALID, |rule| rule.return_status_code(400))
            .build()
            .unwrap();

        let resolved = handler.resolve(&InvalidArgument);
        assert_eq!(resolved.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resolved.body(), GENERIC_MESSAGE);
        assert_eq!(resolved.content_type(), formatter::DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_rule_formatter_without_any_content_type() {
        let handler = base()
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400).using_formatter(|_| "custom")
            })
            .build()
            .unwrap();

        let resolved = handler.resolve(&InvalidArgument);
        assert_eq!(resolved.body(), "custom");
        assert_eq!(resolved.content_type(), formatter::DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_rule_content_type_beats_global() {
        let handler = base()
            .content_type("application/json")
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400).content_type("application/problem+json")
            })
            .build()
            .unwrap();

        assert_eq!(
            handler.resolve(&InvalidArgument).content_type(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_refinement_falls_back_to_ancestor_rule() {
        let handler = base()
            .for_category(&ARGUMENT_INVALID, |rule| rule.return_status_code(400))
            .build()
            .unwrap();

        let resolved = handler.resolve(&MissingArgument);
        assert_eq!(resolved.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_refinement_rule_beats_ancestor_rule() {
        let handler = base()
            .for_category(&ARGUMENT_MISSING, |rule| rule.return_status_code(422))
            .for_category(&ARGUMENT_INVALID, |rule| rule.return_status_code(400))
            .build()
            .unwrap();

        assert_eq!(
            handler.resolve(&MissingArgument).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            handler.resolve(&InvalidArgument).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_unmatched_without_defaults() {
        let handler = base().build().unwrap();

        let resolved = handler.resolve(&Internal);
        assert_eq!(resolved, ResolvedResponse::generic());
        assert!(!resolved.body().contains("hunter2"));
    }

    #[test]
    fn test_unmatched_uses_global_defaults() {
        let handler = base()
            .status_code(503)
            .content_type("application/json")
            .message_formatter(|_| r#"{"error":"unavailable"}"#)
            .for_category(&NOT_FOUND, |rule| rule.return_status_code(404))
            .build()
            .unwrap();

        let resolved = handler.resolve(&Internal);
        assert_eq!(resolved.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resolved.content_type(), "application/json");
        assert_eq!(resolved.body(), r#"{"error":"unavailable"}"#);
    }

    #[test]
    fn test_failing_formatter_degrades_to_generic() {
        let handler = base()
            .content_type("application/json")
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400)
                    .using_fallible_formatter(|_| Err(anyhow::anyhow!("serializer exploded")))
            })
            .build()
            .unwrap();

        assert_eq!(
            handler.resolve(&InvalidArgument),
            ResolvedResponse::generic()
        );
    }

    #[test]
    fn test_panicking_formatter_degrades_to_generic() {
        let handler = base()
            .message_formatter(|_| -> String { panic!("formatter bug") })
            .build()
            .unwrap();

        assert_eq!(handler.resolve(&Internal), ResolvedResponse::generic());
    }

    #[test]
    fn test_formatter_sees_status_and_category() {
        let handler = base()
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400)
                    .using_formatter(|f| format!("{} {}", f.status().as_u16(), f.category()))
            })
            .build()
            .unwrap();

        assert_eq!(handler.resolve(&MissingArgument).body(), "400 ArgumentMissing");
    }

    #[test]
    fn test_observer_notified_once_per_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = base()
            .on_error(move |f| sink.lock().unwrap().push(f.category().name()))
            .build()
            .unwrap();

        handler.resolve(&InvalidArgument);
        handler.resolve(&Internal);
        assert_eq!(*seen.lock().unwrap(), ["ArgumentInvalid", "Failure"]);
    }

    #[test]
    fn test_observer_sees_status_sent_after_formatter_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = base()
            .on_error(move |f| sink.lock().unwrap().push(f.status()))
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400)
                    .using_fallible_formatter(|_| Err(anyhow::anyhow!("serializer exploded")))
            })
            .for_category(&ARGUMENT_MISSING, |rule| rule.return_status_code(422))
            .build()
            .unwrap();

        handler.resolve(&InvalidArgument);
        handler.resolve(&MissingArgument);
        assert_eq!(
            *seen.lock().unwrap(),
            [
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::UNPROCESSABLE_ENTITY
            ]
        );
    }

    #[test]
    fn test_panicking_observer_is_contained() {
        let handler = base()
            .on_error(|_| panic!("observer bug"))
            .for_category(&ARGUMENT_INVALID, |rule| rule.return_status_code(400))
            .build()
            .unwrap();

        assert_eq!(
            handler.resolve(&InvalidArgument).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_write_to_replaces_status_headers_and_body() {
        let handler = base()
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400)
                    .content_type("application/json")
                    .using_formatter(|_| "{}")
            })
            .build()
            .unwrap();

        let mut response = (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html"), (header::CONTENT_LENGTH, "42")],
            "<html></html>",
        )
            .into_response();
        handler.apply(&InvalidArgument, &mut response);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    }
}
