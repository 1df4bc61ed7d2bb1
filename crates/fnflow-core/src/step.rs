//! Step Trait: the single contract every pipeline stage satisfies
use crate::error::StepResult;
use std::fmt;

/// A fallible transformation `In -> Result<Output, StepError>`.
///
/// Steps are owned by the caller and borrowed by the executor for the
/// duration of a run. They should be pure; side effects (logging, I/O) are
/// allowed but are the step's own business.
pub trait Step<In>: Send + Sync {
    type Output;

    /// Stable name used in run reports and logs (ex: "orders.validate").
    fn name(&self) -> &str;

    fn run(&self, input: In) -> StepResult<Self::Output>;
}

impl<In, S> Step<In> for &S
where
    S: Step<In> + ?Sized,
{
    type Output = S::Output;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, input: In) -> StepResult<Self::Output> {
        (**self).run(input)
    }
}

impl<In, S> Step<In> for Box<S>
where
    S: Step<In> + ?Sized,
{
    type Output = S::Output;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, input: In) -> StepResult<Self::Output> {
        (**self).run(input)
    }
}

/// A closure with a name attached, see [`step_fn`].
pub struct FnStep<F> {
    name: String,
    f: F,
}

/// Turns a closure into a named [`Step`].
///
/// ```
/// use fnflow_core::{step_fn, Step, StepError};
///
/// let positive = step_fn("positive", |n: i64| {
///     if n > 0 { Ok(n) } else { Err(StepError::invalid_input("not positive")) }
/// });
/// assert_eq!(positive.run(3), Ok(3));
/// ```
pub fn step_fn<In, Out, F>(name: impl Into<String>, f: F) -> FnStep<F>
where
    F: Fn(In) -> StepResult<Out> + Send + Sync,
{
    FnStep {
        name: name.into(),
        f,
    }
}

impl<In, Out, F> Step<In> for FnStep<F>
where
    F: Fn(In) -> StepResult<Out> + Send + Sync,
{
    type Output = Out;

    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: In) -> StepResult<Out> {
        (self.f)(input)
    }
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}
