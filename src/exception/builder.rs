use super::engine::ErrorObserver;
use super::{DefaultPolicy, ExceptionHandler, Rule, RuleRegistry};
use crate::category::FailureCategory;
use crate::config::{ConfigService, CONTENT_TYPE_KEY, STATUS_CODE_KEY};
use crate::error::{ConfigError, Result};
use crate::failure::{Categorized, Classifier, Classifiers, FailureContext};
use crate::formatter::BodyFormatter;
use axum::http::{HeaderValue, StatusCode};
use std::error::Error;
use std::sync::Arc;

/// Builder for constructing an [`ExceptionHandler`]
///
/// Runs once at startup. Every call overwrites what an earlier call set for
/// the same slot. Invalid arguments do not panic; the first one is remembered
/// and reported by [`build`](Self::build), so a bad configuration fails
/// startup instead of a request.
///
/// # Example
/// ```
/// use meshestra_exception::{ExceptionHandler, category::ARGUMENT_INVALID};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("invalid argument")]
/// struct InvalidArgument;
///
/// let handler = ExceptionHandler::builder()
///     .content_type("application/json")
///     .classify_as::<InvalidArgument>(&ARGUMENT_INVALID)
///     .for_category(&ARGUMENT_INVALID, |rule| {
///         rule.return_status_code(400)
///             .using_formatter(|_| r#"{"error":{"message":"Oops, something went wrong"}}"#)
///     })
///     .message_formatter(|_| "This will be overridden")
///     .build()
///     .unwrap();
///
/// let resolved = handler.resolve(&InvalidArgument);
/// assert_eq!(resolved.status().as_u16(), 400);
/// assert_eq!(resolved.body(), r#"{"error":{"message":"Oops, something went wrong"}}"#);
/// ```
#[must_use]
pub struct ExceptionHandlerBuilder {
    registry: RuleRegistry,
    defaults: DefaultPolicy,
    classifiers: Classifiers,
    observer: Option<ErrorObserver>,
    error: Option<ConfigError>,
}

impl ExceptionHandlerBuilder {
    /// Create a new builder with no rules and built-in defaults
    pub fn new() -> Self {
        Self {
            registry: RuleRegistry::new(),
            defaults: DefaultPolicy::new(),
            classifiers: Classifiers::default(),
            observer: None,
            error: None,
        }
    }

    fn fail(&mut self, error: ConfigError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Set the global content type
    pub fn content_type(mut self, content_type: impl IntoContentType) -> Self {
        match content_type.into_content_type() {
            Ok(value) => self.defaults.set_content_type(value),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Set the status code used when no rule matches
    pub fn status_code(mut self, code: u16) -> Self {
        match parse_status(code) {
            Ok(status) => self.defaults.set_status(status),
            Err(e) => self.fail(e),
        }
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.defaults.set_status(status);
        self
    }

    /// Set the global body formatter
    pub fn message_formatter<F, B>(self, format: F) -> Self
    where
        F: Fn(&FailureContext<'_>) -> B + Send + Sync + 'static,
        B: Into<String>,
    {
        self.formatter(BodyFormatter::new(format))
    }

    pub fn fallible_message_formatter<F>(self, format: F) -> Self
    where
        F: Fn(&FailureContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.formatter(BodyFormatter::fallible(format))
    }

    /// Set the global body formatter from a prepared [`BodyFormatter`], such
    /// as one from [`crate::formatter`].
    pub fn formatter(mut self, formatter: BodyFormatter) -> Self {
        self.defaults.set_formatter(formatter);
        self
    }

    /// Register the rule for `category`, replacing any earlier one.
    ///
    /// The closure must set a status code with
    /// [`RuleBuilder::return_status_code`].
    pub fn for_category<F>(mut self, category: &'static FailureCategory, configure: F) -> Self
    where
        F: FnOnce(RuleBuilder) -> RuleBuilder,
    {
        if category.name().is_empty() {
            self.fail(ConfigError::EmptyCategory);
            return self;
        }
        match configure(RuleBuilder::new(category)).finish() {
            Ok(rule) => {
                if self.registry.register(rule).is_some() {
                    tracing::debug!("Replaced exception rule for '{}'", category);
                }
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Classify errors of type `E` by asking them through [`Categorized`].
    pub fn classify<E>(mut self) -> Self
    where
        E: Categorized + Error + 'static,
    {
        self.classifiers.insert(Classifier::categorized::<E>());
        self
    }

    /// Classify every error of type `E` as `category`.
    pub fn classify_as<E>(mut self, category: &'static FailureCategory) -> Self
    where
        E: Error + 'static,
    {
        if category.name().is_empty() {
            self.fail(ConfigError::EmptyCategory);
            return self;
        }
        self.classifiers.insert(Classifier::fixed::<E>(category));
        self
    }

    /// Observe every resolved failure, e.g. to log it. The observer runs
    /// after the body is formatted and cannot change the response; its
    /// context carries the status actually sent, which is 500 when the
    /// formatter failed.
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&FailureContext<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Take the global content type and status code from the environment
    /// snapshot, where present.
    pub fn with_config(mut self, config: &ConfigService) -> Self {
        if let Some(value) = config.get(CONTENT_TYPE_KEY) {
            self = self.content_type(value);
        }
        if let Some(value) = config.get(STATUS_CODE_KEY) {
            match value.trim().parse::<u16>() {
                Ok(code) => self = self.status_code(code),
                Err(_) => self.fail(ConfigError::invalid_environment(STATUS_CODE_KEY, value)),
            }
        }
        self
    }

    /// Build the handler
    pub fn build(self) -> Result<ExceptionHandler> {
        if let Some(error) = self.error {
            tracing::error!("Exception handler misconfigured: {}", error);
            return Err(error);
        }

        tracing::info!(
            "Exception handler configured ({} rules, {} classifiers)",
            self.registry.len(),
            self.classifiers.len()
        );
        Ok(ExceptionHandler {
            registry: self.registry,
            defaults: self.defaults,
            classifiers: self.classifiers,
            observer: self.observer,
        })
    }
}

impl Default for ExceptionHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configures a single [`Rule`] inside
/// [`ExceptionHandlerBuilder::for_category`].
#[must_use]
pub struct RuleBuilder {
    category: &'static FailureCategory,
    status: Option<StatusCode>,
    content_type: Option<HeaderValue>,
    formatter: Option<BodyFormatter>,
    error: Option<ConfigError>,
}

impl RuleBuilder {
    fn new(category: &'static FailureCategory) -> Self {
        Self {
            category,
            status: None,
            content_type: None,
            formatter: None,
            error: None,
        }
    }

    fn fail(&mut self, error: ConfigError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn return_status_code(mut self, code: u16) -> Self {
        match parse_status(code) {
            Ok(status) => self.status = Some(status),
            Err(e) => self.fail(e),
        }
        self
    }

    pub fn return_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Override the global content type for this category
    pub fn content_type(mut self, content_type: impl IntoContentType) -> Self {
        match content_type.into_content_type() {
            Ok(value) => self.content_type = Some(value),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Override the global formatter for this category
    pub fn using_formatter<F, B>(self, format: F) -> Self
    where
        F: Fn(&FailureContext<'_>) -> B + Send + Sync + 'static,
        B: Into<String>,
    {
        self.using(BodyFormatter::new(format))
    }

    pub fn using_fallible_formatter<F>(self, format: F) -> Self
    where
        F: Fn(&FailureContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.using(BodyFormatter::fallible(format))
    }

    pub fn using(mut self, formatter: BodyFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    fn finish(self) -> Result<Rule> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let status = self
            .status
            .ok_or_else(|| ConfigError::missing_status(self.category.name()))?;

        let mut rule = Rule::new(self.category, status);
        if let Some(content_type) = self.content_type {
            rule = rule.with_content_type(content_type);
        }
        if let Some(formatter) = self.formatter {
            rule = rule.with_formatter(formatter);
        }
        Ok(rule)
    }
}

fn parse_status(code: u16) -> Result<StatusCode> {
    StatusCode::from_u16(code).map_err(|_| ConfigError::invalid_status(code.to_string()))
}

/// A value usable as a `Content-Type` header.
///
/// Blank values and strings that are not valid header values are rejected
/// when the handler is built.
pub trait IntoContentType {
    fn into_content_type(self) -> Result<HeaderValue>;
}

impl IntoContentType for &str {
    fn into_content_type(self) -> Result<HeaderValue> {
        if self.trim().is_empty() {
            return Err(ConfigError::invalid_content_type(self));
        }
        HeaderValue::from_str(self).map_err(|_| ConfigError::invalid_content_type(self))
    }
}

impl IntoContentType for String {
    fn into_content_type(self) -> Result<HeaderValue> {
        self.as_str().into_content_type()
    }
}

impl IntoContentType for HeaderValue {
    fn into_content_type(self) -> Result<HeaderValue> {
        if self.as_bytes().trim_ascii().is_empty() {
            return Err(ConfigError::invalid_content_type(
                String::from_utf8_lossy(self.as_bytes()),
            ));
        }
        Ok(self)
    }
}

impl IntoContentType for &HeaderValue {
    fn into_content_type(self) -> Result<HeaderValue> {
        self.clone().into_content_type()
    }
}
