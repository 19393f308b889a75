//! # Meshestra Exception
//!
//! Declarative global exception handling for Meshestra and axum applications.
//!
//! Failures that escape request handlers are mapped to HTTP responses through
//! a table of rules configured once at startup: failure category to status
//! code, content type and body.
//!
//! ## Features
//!
//! - **Category hierarchy**: failures are classified into a tree of
//!   categories; the most specific matching rule always wins
//! - **Layered defaults**: per-rule content type and formatter fall back to
//!   the global ones, then to safe built-ins that never leak failure detail
//! - **Safe formatting**: a formatter that errors or panics degrades to a
//!   generic 500 instead of taking the handler down
//! - **Interceptor integration**: drop-in tower layer for axum routers, plus
//!   [`Raised`] so handlers can simply use `?`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshestra_exception::prelude::*;
//! use meshestra_exception::category::{ARGUMENT_INVALID, NOT_FOUND};
//!
//! #[derive(Debug, thiserror::Error, Categorized)]
//! enum UserError {
//!     #[error("invalid user id {0}")]
//!     #[category(ARGUMENT_INVALID)]
//!     InvalidId(String),
//!     #[error("user {0} not found")]
//!     #[category(NOT_FOUND)]
//!     Missing(String),
//! }
//!
//! async fn get_user(Path(id): Path<String>) -> Result<String, Raised> {
//!     Err(UserError::Missing(id).into())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // 1. Configure once at startup
//!     let handler = ExceptionHandler::builder()
//!         .content_type("application/json")
//!         .classify::<UserError>()
//!         .for_category(&ARGUMENT_INVALID, |rule| rule.return_status_code(400))
//!         .for_category(&NOT_FOUND, |rule| {
//!             rule.return_status_code(404)
//!                 .using(formatter::json_error("No such user"))
//!         })
//!         .formatter(formatter::json_envelope("Something went wrong"))
//!         .build()
//!         .expect("invalid exception handling configuration");
//!
//!     // 2. Attach it to the router
//!     let app: Router = Router::new()
//!         .route("/users/{id}", axum::routing::get(get_user))
//!         .layer(ExceptionInterceptor::new(Arc::new(handler)).layer());
//!
//!     // Serve your app...
//! }
//! ```

extern crate self as meshestra_exception;

pub mod category;
pub mod config;
pub mod error;
pub mod exception;
pub mod failure;
pub mod formatter;
pub mod interceptor;

// Re-export core types
pub use category::FailureCategory;
pub use config::ConfigService;
pub use error::{ConfigError, Result};
pub use exception::{
    DefaultPolicy, ExceptionFilter, ExceptionHandler, ExceptionHandlerBuilder, IntoContentType,
    Raised, ResolvedResponse, Rule, RuleBuilder, RuleRegistry,
};
pub use failure::{BoxError, Categorized, CategorizedError, FailureContext, Panicked};
pub use formatter::BodyFormatter;

// Re-export macros
pub use meshestra_exception_macro::Categorized;

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_exception::prelude::*;
/// ```
pub mod prelude {
    pub use crate::category::{FAILURE, FailureCategory};
    pub use crate::config::ConfigService;
    pub use crate::error::ConfigError;
    pub use crate::exception::{
        DefaultPolicy, ExceptionFilter, ExceptionHandler, ExceptionHandlerBuilder,
        IntoContentType, Raised, ResolvedResponse, Rule, RuleBuilder, RuleRegistry,
    };
    pub use crate::Categorized;
    pub use crate::failure::{BoxError, CategorizedError, FailureContext, Panicked};
    pub use crate::formatter::{self, BodyFormatter};
    pub use crate::interceptor::{
        ExceptionInterceptor, Interceptor, InterceptorResult, Next, SharedInterceptorLayer,
    };
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
