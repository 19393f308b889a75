//! Built-in category taxonomy
//!
//! Every built-in category descends from [`FAILURE`], which is also the
//! category given to errors nothing else classifies. A rule registered for
//! `FAILURE` therefore acts as a catch-all.

use super::FailureCategory;

/// Root of the built-in hierarchy.
pub static FAILURE: FailureCategory = FailureCategory::root("Failure");

pub static ARGUMENT_INVALID: FailureCategory =
    FailureCategory::refines("ArgumentInvalid", &FAILURE);
pub static ARGUMENT_MISSING: FailureCategory =
    FailureCategory::refines("ArgumentMissing", &ARGUMENT_INVALID);
pub static ARGUMENT_OUT_OF_RANGE: FailureCategory =
    FailureCategory::refines("ArgumentOutOfRange", &ARGUMENT_INVALID);

pub static INVALID_OPERATION: FailureCategory =
    FailureCategory::refines("InvalidOperation", &FAILURE);
pub static NOT_SUPPORTED: FailureCategory =
    FailureCategory::refines("NotSupported", &INVALID_OPERATION);
pub static CONFLICT: FailureCategory = FailureCategory::refines("Conflict", &INVALID_OPERATION);

pub static NOT_FOUND: FailureCategory = FailureCategory::refines("NotFound", &FAILURE);
pub static UNAUTHORIZED: FailureCategory = FailureCategory::refines("Unauthorized", &FAILURE);
pub static FORBIDDEN: FailureCategory = FailureCategory::refines("Forbidden", &FAILURE);
pub static TIMEOUT: FailureCategory = FailureCategory::refines("Timeout", &FAILURE);
