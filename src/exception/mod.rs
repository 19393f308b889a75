use axum::response::Response;
use std::error::Error;

mod builder;
mod engine;
mod policy;
mod raised;
mod registry;
mod rule;

pub use builder::{ExceptionHandlerBuilder, IntoContentType, RuleBuilder};
pub use engine::{ExceptionHandler, ResolvedResponse};
pub use policy::DefaultPolicy;
pub use raised::Raised;
pub(crate) use raised::PendingFailure;
pub use registry::RuleRegistry;
pub use rule::Rule;

/// The ExceptionFilter trait
///
/// Filters handle errors thrown during request processing.
/// They must return a valid Response and must not panic.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch an exception and return a response
    fn catch(&self, error: &(dyn Error + Send + Sync + 'static)) -> Response;
}

impl ExceptionFilter for ExceptionHandler {
    fn catch(&self, error: &(dyn Error + Send + Sync + 'static)) -> Response {
        self.respond(error)
    }
}
