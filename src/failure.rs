//! Raised failures and their classification
//!
//! A failure is any `std::error::Error` that escapes request processing. Before
//! a rule can be chosen the failure has to be placed in the category tree:
//!
//! 1. Each classifier registered on the builder gets a chance to downcast the
//!    error to its concrete type.
//! 2. A [`CategorizedError`] carries its category with it.
//! 3. If the outermost error is unclassified, the `source()` chain is searched
//!    the same way.
//! 4. Anything left over belongs to [`FAILURE`].

use crate::category::{FAILURE, FailureCategory};
use axum::http::StatusCode;
use std::any::{Any, TypeId, type_name};
use std::error::Error;
use std::fmt;

/// A type-erased error as it travels through the request pipeline
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Implemented by error types that know their own failure category.
///
/// Usually derived:
///
/// ```rust
/// use meshestra_exception::{Categorized, category::{NOT_FOUND, CONFLICT}};
///
/// #[derive(Debug, Categorized)]
/// enum UserError {
///     #[category(NOT_FOUND)]
///     Missing,
///     #[category(CONFLICT)]
///     Duplicate,
/// }
/// ```
pub trait Categorized {
    fn category(&self) -> &'static FailureCategory;
}

/// An error paired with an explicit category.
///
/// Useful when a handler wants to raise a foreign error under a specific
/// category without registering a classifier for its type.
#[derive(Debug)]
pub struct CategorizedError {
    category: &'static FailureCategory,
    source: BoxError,
}

impl CategorizedError {
    pub fn new(category: &'static FailureCategory, source: impl Into<BoxError>) -> Self {
        Self {
            category,
            source: source.into(),
        }
    }

    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

impl Categorized for CategorizedError {
    fn category(&self) -> &'static FailureCategory {
        self.category
    }
}

impl fmt::Display for CategorizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl Error for CategorizedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// A request handler panicked before producing a response.
///
/// Nothing classifies it by default, so it resolves like any other
/// unclassified failure. Register it with
/// [`classify_as`](crate::ExceptionHandlerBuilder::classify_as) to give panics
/// their own rule.
#[derive(Debug, Clone)]
pub struct Panicked {
    message: String,
}

impl Panicked {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build from a payload caught by `catch_unwind`.
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        Self::new(panic_message(payload))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler panicked: {}", self.message)
    }
}

impl Error for Panicked {}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

type ClassifyFn =
    Box<dyn Fn(&(dyn Error + 'static)) -> Option<&'static FailureCategory> + Send + Sync>;

/// Maps one concrete error type to a category
pub(crate) struct Classifier {
    type_id: TypeId,
    type_name: &'static str,
    classify: ClassifyFn,
}

impl Classifier {
    /// Ask the error itself through [`Categorized`].
    pub(crate) fn categorized<E>() -> Self
    where
        E: Categorized + Error + 'static,
    {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            classify: Box::new(|error: &(dyn Error + 'static)| {
                error.downcast_ref::<E>().map(|e| e.category())
            }),
        }
    }

    /// Every value of `E` belongs to `category`.
    pub(crate) fn fixed<E>(category: &'static FailureCategory) -> Self
    where
        E: Error + 'static,
    {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            classify: Box::new(move |error: &(dyn Error + 'static)| {
                error.downcast_ref::<E>().map(|_| category)
            }),
        }
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// The set of classifiers known to a handler, at most one per error type
#[derive(Debug, Default)]
pub(crate) struct Classifiers {
    entries: Vec<Classifier>,
}

impl Classifiers {
    pub(crate) fn insert(&mut self, classifier: Classifier) {
        let type_id = classifier.type_id;
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.type_id == type_id)
        {
            Some(existing) => *existing = classifier,
            None => self.entries.push(classifier),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn classify_one(&self, error: &(dyn Error + 'static)) -> Option<&'static FailureCategory> {
        if let Some(categorized) = error.downcast_ref::<CategorizedError>() {
            return Some(categorized.category());
        }
        self.entries
            .iter()
            .find_map(|classifier| (classifier.classify)(error))
    }

    /// Derive the concrete category of a raised error.
    pub(crate) fn classify(&self, error: &(dyn Error + 'static)) -> &'static FailureCategory {
        let mut current = Some(error);
        while let Some(error) = current {
            if let Some(category) = self.classify_one(error) {
                return category;
            }
            current = error.source();
        }
        &FAILURE
    }
}

/// What a body formatter gets to see about a failure.
pub struct FailureContext<'a> {
    error: &'a (dyn Error + Send + Sync + 'static),
    category: &'static FailureCategory,
    status: StatusCode,
}

impl<'a> FailureContext<'a> {
    pub fn new(
        error: &'a (dyn Error + Send + Sync + 'static),
        category: &'static FailureCategory,
        status: StatusCode,
    ) -> Self {
        Self {
            error,
            category,
            status,
        }
    }

    pub fn error(&self) -> &'a (dyn Error + Send + Sync + 'static) {
        self.error
    }

    /// The concrete category the failure was classified under
    pub fn category(&self) -> &'static FailureCategory {
        self.category
    }

    /// The response status. Formatters see the status the rule asks for;
    /// observers see the status actually sent.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The failure's own message. This is internal detail; only put it in a
    /// response body deliberately.
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&'a E> {
        self.error.downcast_ref::<E>()
    }

    /// Find the first error of type `E` in the `source()` chain, starting with
    /// the failure itself.
    pub fn find<E: Error + 'static>(&self) -> Option<&'a E> {
        let mut current: Option<&'a (dyn Error + 'static)> = Some(self.error);
        while let Some(error) = current {
            if let Some(found) = error.downcast_ref::<E>() {
                return Some(found);
            }
            current = error.source();
        }
        None
    }
}

impl fmt::Debug for FailureContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureContext")
            .field("category", &self.category.name())
            .field("status", &self.status)
            .field("error", &self.error.to_string())
            .finish()
    }
}
