use crate::category::FailureCategory;
use crate::failure::{BoxError, CategorizedError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Error type for axum handlers that want their failures resolved by the
/// exception handler.
///
/// Any `std::error::Error` converts into `Raised`, so handlers can use `?`.
/// The failure rides along in the response extensions until an
/// [`ExceptionInterceptor`](crate::interceptor::ExceptionInterceptor)
/// replaces the response; without one the client sees a bare 500.
///
/// ```rust,no_run
/// use meshestra_exception::Raised;
///
/// async fn load_user() -> Result<String, Raised> {
///     let name = std::fs::read_to_string("/srv/users/1")?;
///     Ok(name)
/// }
/// ```
pub struct Raised {
    error: Arc<dyn Error + Send + Sync>,
}

impl Raised {
    pub fn from_boxed(error: BoxError) -> Self {
        Self {
            error: Arc::from(error),
        }
    }

    /// Raise `error` under an explicit category.
    pub fn categorized(category: &'static FailureCategory, error: impl Into<BoxError>) -> Self {
        Self::from(CategorizedError::new(category, error))
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }
}

impl<E> From<E> for Raised
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self {
            error: Arc::new(error),
        }
    }
}

impl fmt::Debug for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Raised").field(&self.error).finish()
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Response extension carrying a failure to the interceptor
#[derive(Clone)]
pub(crate) struct PendingFailure(Arc<dyn Error + Send + Sync>);

impl PendingFailure {
    pub(crate) fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl IntoResponse for Raised {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(PendingFailure(self.error));
        response
    }
}
