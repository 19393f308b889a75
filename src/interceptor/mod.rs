use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

mod exception;
mod layer;

pub use exception::ExceptionInterceptor;
pub use layer::{InterceptorMiddleware, SharedInterceptorLayer};

/// standard return type for Interceptors
pub type InterceptorResult = Result<Response, InterceptorError>;

/// A type-erased error for interceptors
pub type InterceptorError = crate::failure::BoxError;

type NextFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;
type NextFn = Box<dyn FnOnce(Request<Body>) -> NextFuture + Send>;

/// Represents the next handler in the chain
pub struct Next {
    run: NextFn,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> NextFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// The Interceptor trait
///
/// Interceptors wrap the rest of the pipeline. They can inspect the request
/// before it reaches the handler and inspect, replace or recover the result
/// afterwards. An `Err` returned by `next` is a failure raised further down
/// the chain; [`ExceptionInterceptor`] turns those into responses.
///
/// # Example
/// ```rust,ignore
/// struct TimingInterceptor;
///
/// #[async_trait]
/// impl Interceptor for TimingInterceptor {
///     async fn intercept(&self, req: Request<Body>, next: Next) -> InterceptorResult {
///         let start = Instant::now();
///         let res = next.run(req).await;
///         tracing::debug!("took {:?}", start.elapsed());
///         res
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
