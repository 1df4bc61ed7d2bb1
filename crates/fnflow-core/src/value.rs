//! Result/Option helpers
//!
//! `std::result::Result` and `std::option::Option` already provide the
//! monadic surface pipelines rely on:
//!
//! | operation        | `Result`          | `Option`          |
//! |------------------|-------------------|-------------------|
//! | map              | `map`             | `map`             |
//! | andThen / bind   | `and_then`        | `and_then`        |
//! | unwrapOr         | `unwrap_or`       | `unwrap_or`       |
//! | unwrapOrElse     | `unwrap_or_else`  | `unwrap_or_else`  |
//!
//! Values are only observed through `match` or these combinators, so reading
//! the wrong variant cannot be expressed. The traits below add the
//! conversions between the two that steps keep writing by hand.
use crate::error::{ErrorKind, StepError, StepResult};

pub trait OptionExt<T> {
    /// `None` becomes `InvalidInput { message }`.
    fn or_invalid(self, message: impl Into<String>) -> StepResult<T>;

    /// `None` becomes `ResourceUnavailable { resource }`.
    fn or_unavailable(self, resource: impl Into<String>) -> StepResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_invalid(self, message: impl Into<String>) -> StepResult<T> {
        self.ok_or_else(|| StepError::invalid_input(message))
    }

    fn or_unavailable(self, resource: impl Into<String>) -> StepResult<T> {
        self.ok_or_else(|| StepError::unavailable(resource))
    }
}

pub trait ResultExt<T> {
    /// Error-recovery variant of `unwrap_or_else`: always yields a `T`.
    fn recover<F>(self, f: F) -> T
    where
        F: FnOnce(StepError) -> T;

    /// Kind of the contained error, `None` on success.
    fn error_kind(&self) -> Option<ErrorKind>;
}

impl<T> ResultExt<T> for StepResult<T> {
    fn recover<F>(self, f: F) -> T
    where
        F: FnOnce(StepError) -> T,
    {
        self.unwrap_or_else(f)
    }

    fn error_kind(&self) -> Option<ErrorKind> {
        self.as_ref().err().map(StepError::kind)
    }
}
