//! Async Pipeline: same contract as [`Pipeline`](crate::Pipeline), for steps
//! that await (remote calls, timers). Suspension only happens inside a step;
//! boundaries, ordering and cancellation checks are identical.
use crate::context::RunContext;
use crate::error::StepResult;
use crate::pipeline::{Chain, Leaf, RunOutcome, RunTracker};
use crate::retry::{Retry, RetryPolicy};
use crate::step::Step;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use tracing::warn;

#[async_trait]
pub trait AsyncStep<In: Send + 'static>: Send + Sync {
    type Output: Send + 'static;

    fn name(&self) -> &str;

    async fn run(&self, input: In) -> StepResult<Self::Output>;
}

/// Lifts a synchronous [`Step`] into an async pipeline.
pub struct Blocking<S>(pub S);

#[async_trait]
impl<In, S> AsyncStep<In> for Blocking<S>
where
    In: Send + 'static,
    S: Step<In>,
    S::Output: Send + 'static,
{
    type Output = S::Output;

    fn name(&self) -> &str {
        self.0.name()
    }

    async fn run(&self, input: In) -> StepResult<S::Output> {
        self.0.run(input)
    }
}

/// An async closure with a name attached, see [`async_step_fn`].
pub struct AsyncFnStep<F> {
    name: String,
    f: F,
}

pub fn async_step_fn<In, Out, F, Fut>(name: impl Into<String>, f: F) -> AsyncFnStep<F>
where
    F: Fn(In) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult<Out>> + Send + 'static,
{
    AsyncFnStep {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<In, Out, F, Fut> AsyncStep<In> for AsyncFnStep<F>
where
    In: Send + 'static,
    Out: Send + 'static,
    F: Fn(In) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult<Out>> + Send + 'static,
{
    type Output = Out;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: In) -> StepResult<Out> {
        (self.f)(input).await
    }
}

impl<F> fmt::Debug for AsyncFnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsyncFnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<In, S, P> AsyncStep<In> for Retry<S, P>
where
    In: Clone + Send + 'static,
    S: AsyncStep<In>,
    P: RetryPolicy,
{
    type Output = S::Output;

    fn name(&self) -> &str {
        self.step.name()
    }

    async fn run(&self, input: In) -> StepResult<S::Output> {
        let mut attempt = 0u32;
        loop {
            let err = match self.step.run(input.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if !self.policy.should_retry(&err, attempt) {
                return Err(self.give_up(err, attempt));
            }

            let delay = self.policy.capped_delay(attempt);
            warn!(
                step = self.step.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying step"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Async counterpart of [`Stages`](crate::pipeline::Stages).
#[async_trait]
pub trait AsyncStages<In: Send + 'static>: Send + Sync {
    type Output: Send + 'static;

    fn names(&self) -> Vec<&str>;

    async fn drive(&self, input: In, run: &mut RunTracker<'_>) -> StepResult<Self::Output>;
}

#[async_trait]
impl<In, S> AsyncStages<In> for Leaf<S>
where
    In: Send + 'static,
    S: AsyncStep<In>,
{
    type Output = S::Output;

    fn names(&self) -> Vec<&str> {
        vec![self.0.name()]
    }

    async fn drive(&self, input: In, run: &mut RunTracker<'_>) -> StepResult<S::Output> {
        let started = run.enter(self.0.name())?;
        let result = self.0.run(input).await;
        run.leave(self.0.name(), started, &result);
        result
    }
}

#[async_trait]
impl<In, A, B> AsyncStages<In> for Chain<A, B>
where
    In: Send + 'static,
    A: AsyncStages<In>,
    B: AsyncStages<A::Output>,
{
    type Output = B::Output;

    fn names(&self) -> Vec<&str> {
        let mut names = self.head.names();
        names.extend(self.tail.names());
        names
    }

    async fn drive(&self, input: In, run: &mut RunTracker<'_>) -> StepResult<B::Output> {
        let mid = self.head.drive(input, run).await?;
        self.tail.drive(mid, run).await
    }
}

/// Ordered sequence of [`AsyncStep`]s.
///
/// ```
/// use fnflow_core::{async_step_fn, AsyncPipeline, step_fn};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let pipeline = AsyncPipeline::start(async_step_fn("fetch", |id: u32| async move {
///         Ok(format!("user-{}", id))
///     }))
///     .then_blocking(step_fn("shout", |s: String| Ok(s.to_uppercase())));
///
/// assert_eq!(rt.block_on(pipeline.run(7)), Ok("USER-7".to_string()));
/// ```
pub struct AsyncPipeline<In, S> {
    stages: S,
    id: String,
    _input: PhantomData<fn(In)>,
}

impl<In, S> AsyncPipeline<In, Leaf<S>>
where
    In: Send + 'static,
    S: AsyncStep<In>,
{
    pub fn start(step: S) -> Self {
        let id = step.name().to_string();
        Self {
            stages: Leaf(step),
            id,
            _input: PhantomData,
        }
    }
}

impl<In, S> AsyncPipeline<In, S>
where
    In: Send + 'static,
    S: AsyncStages<In>,
{
    pub fn then<T>(self, step: T) -> AsyncPipeline<In, Chain<S, Leaf<T>>>
    where
        T: AsyncStep<S::Output>,
    {
        let id = format!("{}→{}", self.id, step.name());
        AsyncPipeline {
            stages: Chain {
                head: self.stages,
                tail: Leaf(step),
            },
            id,
            _input: PhantomData,
        }
    }

    /// Appends a synchronous step.
    pub fn then_blocking<T>(self, step: T) -> AsyncPipeline<In, Chain<S, Leaf<Blocking<T>>>>
    where
        T: Step<S::Output>,
        T::Output: Send + 'static,
    {
        self.then(Blocking(step))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.stages.names()
    }

    pub async fn run(&self, input: In) -> StepResult<S::Output> {
        self.run_with(input, &RunContext::new()).await.result
    }

    #[tracing::instrument(skip_all, fields(pipeline = %self.id, trace_id = %ctx.trace_id))]
    pub async fn run_with(&self, input: In, ctx: &RunContext) -> RunOutcome<S::Output> {
        let mut tracker = RunTracker::new(ctx, &self.id);
        let result = self.stages.drive(input, &mut tracker).await;
        let report = tracker.finish(&result);
        RunOutcome { result, report }
    }
}

impl<In, S> fmt::Debug for AsyncPipeline<In, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsyncPipeline").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::report::RunState;
    use crate::retry::BackoffPolicy;
    use crate::step::step_fn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_async_steps_run_in_order() {
        let pipeline = AsyncPipeline::start(async_step_fn("load", |id: u32| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(vec![id, id + 1])
        }))
        .then_blocking(step_fn("sum", |v: Vec<u32>| Ok(v.iter().sum::<u32>())));

        assert_eq!(pipeline.id(), "load→sum");
        assert_eq!(pipeline.run(3).await, Ok(7));
    }

    #[tokio::test]
    async fn test_async_short_circuit() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let pipeline = AsyncPipeline::start(async_step_fn("reject", |_: u32| async move {
            Err::<u32, _>(StepError::invalid_input("nope"))
        }))
        .then(async_step_fn("never", move |x: u32| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(x)
            }
        }));

        let outcome = pipeline.run_with(1, &RunContext::new()).await;
        assert_eq!(outcome.result, Err(StepError::invalid_input("nope")));
        assert_eq!(outcome.state(), RunState::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_async_steps() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let pipeline = AsyncPipeline::start(async_step_fn("first", move |x: u32| {
            let trigger = trigger.clone();
            async move {
                trigger.cancel();
                Ok(x)
            }
        }))
        .then(async_step_fn("second", |x: u32| async move { Ok(x + 1) }));

        let ctx = RunContext::new().with_cancellation(token);
        let outcome = pipeline.run_with(1, &ctx).await;

        assert_eq!(outcome.result, Err(StepError::cancelled("second")));
        assert_eq!(outcome.state(), RunState::Cancelled);
        assert!(outcome.result.as_ref().unwrap_err().is_cancelled());
        assert_eq!(outcome.report.invoked(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_async_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let flaky = async_step_fn("flaky", move |x: u32| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StepError::failed("fetch", "Network error"))
                } else {
                    Ok(x)
                }
            }
        });
        let policy = BackoffPolicy::new(3, Duration::from_millis(1));
        let pipeline = AsyncPipeline::start(Retry::new(flaky, policy));

        assert_eq!(pipeline.run(9).await, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
