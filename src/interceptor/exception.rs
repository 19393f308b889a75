use crate::exception::{ExceptionFilter, PendingFailure};
use crate::failure::Panicked;
use crate::interceptor::{Interceptor, InterceptorResult, Next, SharedInterceptorLayer};
use async_trait::async_trait;
use axum::{body::Body, http::Request};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// An interceptor that turns raised failures into responses
///
/// Catches every kind of failure the pipeline can produce:
/// - an `Err` coming back from the rest of the interceptor chain
/// - a response produced by a handler returning [`Raised`](crate::Raised)
/// - a panic further down the chain, raised as [`Panicked`]
///
/// Either way the failure is handed to the configured [`ExceptionFilter`],
/// normally an [`ExceptionHandler`](crate::ExceptionHandler), and its
/// response replaces the original one.
#[derive(Clone)]
pub struct ExceptionInterceptor {
    filter: Arc<dyn ExceptionFilter>,
}

impl ExceptionInterceptor {
    pub fn new<F: ExceptionFilter>(filter: Arc<F>) -> Self {
        Self { filter }
    }

    /// A layer running only this interceptor.
    pub fn layer(self) -> SharedInterceptorLayer {
        SharedInterceptorLayer::new(vec![Box::new(self)])
    }
}

#[async_trait]
impl Interceptor for ExceptionInterceptor {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let outcome = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let failure = Panicked::from_payload(payload.as_ref());
                tracing::error!("{} {} {}", method, uri, failure);
                return Ok(self.filter.catch(&failure));
            }
        };

        match outcome {
            Ok(response) => {
                let Some(pending) = response.extensions().get::<PendingFailure>().cloned() else {
                    return Ok(response);
                };
                tracing::debug!("{} {} raised: {}", method, uri, pending.error());
                Ok(self.filter.catch(pending.error()))
            }
            Err(error) => {
                tracing::debug!("{} {} failed: {}", method, uri, error);
                Ok(self.filter.catch(&*error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ARGUMENT_INVALID, NOT_FOUND};
    use crate::formatter;
    use crate::interceptor::InterceptorError;
    use crate::{ExceptionHandler, Raised};
    use axum::{
        Router,
        body::to_bytes,
        http::{StatusCode, header},
        response::Response,
        routing::get,
    };
    use tower::ServiceExt;
    use tower_http::trace::TraceLayer;

    #[derive(Debug, thiserror::Error)]
    #[error("An invalid argument supplied")]
    struct InvalidArgument;

    #[derive(Debug, thiserror::Error)]
    #[error("user 42 not found in shard 7")]
    struct UserMissing;

    /// Fails every request before it reaches the router
    struct Exploding;

    #[async_trait]
    impl Interceptor for Exploding {
        async fn intercept(&self, _request: Request<Body>, _next: Next) -> InterceptorResult {
            Err(Box::new(InvalidArgument) as InterceptorError)
        }
    }

    async fn panicking() -> String {
        let ids: Vec<u32> = Vec::new();
        ids[3].to_string()
    }

    fn handler() -> Arc<ExceptionHandler> {
        let handler = ExceptionHandler::builder()
            .content_type("application/json")
            .classify_as::<InvalidArgument>(&ARGUMENT_INVALID)
            .classify_as::<UserMissing>(&NOT_FOUND)
            .for_category(&ARGUMENT_INVALID, |rule| {
                rule.return_status_code(400)
                    .using(formatter::json_error("Oops, something went wrong"))
            })
            .for_category(&NOT_FOUND, |rule| {
                rule.return_status_code(404).content_type("text/plain")
            })
            .message_formatter(|_| "This will be overridden")
            .build()
            .unwrap();
        Arc::new(handler)
    }

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/api/badrequest",
                get(|| async { Err::<String, Raised>(Raised::from(InvalidArgument)) }),
            )
            .route(
                "/users/42",
                get(|| async {
                    let user: Result<String, UserMissing> = Err(UserMissing);
                    Ok::<_, Raised>(user?)
                }),
            )
            .route(
                "/boom",
                get(|| async { Err::<String, Raised>(std::io::Error::other("secret").into()) }),
            )
            .route("/panic", get(panicking))
            .layer(ExceptionInterceptor::new(handler()).layer())
            .layer(TraceLayer::new_for_http())
    }

    async fn call(app: Router, uri: &str) -> (Response, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        (
            Response::from_parts(parts, Body::empty()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_rule_response_for_raised_failure() {
        let (response, body) = call(app(), "/api/badrequest").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, r#"{"error":{"message":"Oops, something went wrong"}}"#);
    }

    #[tokio::test]
    async fn test_question_mark_in_handler() {
        let (response, body) = call(app(), "/users/42").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body, "This will be overridden");
    }

    #[tokio::test]
    async fn test_unmatched_failure_uses_defaults() {
        let (response, body) = call(app(), "/boom").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, "This will be overridden");
    }

    #[tokio::test]
    async fn test_handler_panic_uses_defaults() {
        let app = app();

        let (response, body) = call(app.clone(), "/panic").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, "This will be overridden");

        let (response, _) = call(app, "/ok").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_panic_without_configuration_is_generic() {
        let handler = Arc::new(ExceptionHandler::builder().build().unwrap());
        let app = Router::new()
            .route("/panic", get(panicking))
            .layer(ExceptionInterceptor::new(handler).layer());

        let (response, body) = call(app, "/panic").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            formatter::DEFAULT_CONTENT_TYPE
        );
        assert_eq!(body, formatter::GENERIC_MESSAGE);
        assert!(!body.contains("out of bounds"));
    }

    #[tokio::test]
    async fn test_handler_panic_with_own_rule() {
        let handler = ExceptionHandler::builder()
            .classify_as::<Panicked>(&crate::category::INVALID_OPERATION)
            .for_category(&crate::category::INVALID_OPERATION, |rule| {
                rule.return_status_code(503)
                    .using_formatter(|f| f.downcast_ref::<Panicked>().map_or("?", |_| "panicked"))
            })
            .build()
            .unwrap();
        let app = Router::new()
            .route("/panic", get(panicking))
            .layer(ExceptionInterceptor::new(Arc::new(handler)).layer());

        let (response, body) = call(app, "/panic").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "panicked");
    }

    #[tokio::test]
    async fn test_successful_response_untouched() {
        let (response, body) = call(app(), "/ok").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body, "fine");
    }

    #[tokio::test]
    async fn test_error_from_inner_interceptor() {
        let layer = SharedInterceptorLayer::new(vec![
            Box::new(ExceptionInterceptor::new(handler())),
            Box::new(Exploding),
        ]);
        let app = Router::new().route("/ok", get(|| async { "fine" })).layer(layer);

        let (response, body) = call(app, "/ok").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":{"message":"Oops, something went wrong"}}"#);
    }

    #[tokio::test]
    async fn test_raised_without_interceptor_is_bare_500() {
        let app = Router::new().route(
            "/boom",
            get(|| async { Err::<String, Raised>(UserMissing.into()) }),
        );

        let (response, body) = call(app, "/boom").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("shard"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_handler() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let app = app();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let uri = if i % 2 == 0 { "/api/badrequest" } else { "/users/42" };
                    call(app, uri).await.0.status()
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let expected = if i % 2 == 0 {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::NOT_FOUND
            };
            assert_eq!(task.await.unwrap(), expected);
        }
    }
}
