//! Pipeline: chains steps with compile-time type checking and short-circuits on the first error
use crate::context::RunContext;
use crate::error::{StepError, StepResult};
use crate::report::{RunReport, RunState, StepOutcome, StepRecord};
use crate::step::Step;
use chrono::{DateTime, Utc};
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ordered sequence of steps whose types line up end to end.
///
/// Built with [`Pipeline::start`] and [`Pipeline::then`]; each `then` only
/// accepts a step whose input is the previous step's output, so a mistyped
/// chain does not compile. A pipeline holds no state between runs.
///
/// ```
/// use fnflow_core::{step_fn, Pipeline, StepError};
///
/// let pipeline = Pipeline::start(step_fn("parse", |s: String| {
///         s.trim().parse::<i64>().map_err(|e| StepError::invalid_input(e.to_string()))
///     }))
///     .then(step_fn("double", |n: i64| Ok(n * 2)))
///     .then(step_fn("render", |n: i64| Ok(format!("= {}", n))));
///
/// assert_eq!(pipeline.run(" 21 ".to_string()), Ok("= 42".to_string()));
/// assert!(pipeline.run("x".to_string()).is_err());
/// ```
pub struct Pipeline<In, S> {
    stages: S,
    id: String,
    _input: PhantomData<fn(In)>,
}

impl<In, S> Pipeline<In, Leaf<S>>
where
    S: Step<In>,
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

impl<In, S> Pipeline<In, S>
where
    S: Stages<In>,
{
    /// Appends `step`, which must accept the current output type.
    pub fn then<T>(self, step: T) -> Pipeline<In, Chain<S, Leaf<T>>>
    where
        T: Step<S::Output>,
    {
        let id = format!("{}→{}", self.id, step.name());
        Pipeline {
            stages: Chain {
                head: self.stages,
                tail: Leaf(step),
            },
            id,
            _input: PhantomData,
        }
    }

    /// Step names joined with `→` (ex: "validate→check_stock→charge").
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stable hash of the pipeline shape, handy for correlating logs.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.id)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.stages.names()
    }

    pub fn step_count(&self) -> usize {
        self.stages.names().len()
    }

    /// Runs every step in declaration order, stopping at the first `Err`.
    pub fn run(&self, input: In) -> StepResult<S::Output> {
        self.run_with(input, &RunContext::new()).result
    }

    /// Like [`Pipeline::run`] but honours the context's cancellation token and
    /// returns the run report alongside the result.
    #[tracing::instrument(skip_all, fields(pipeline = %self.id, trace_id = %ctx.trace_id))]
    pub fn run_with(&self, input: In, ctx: &RunContext) -> RunOutcome<S::Output> {
        let mut tracker = RunTracker::new(ctx, &self.id);
        let result = self.stages.drive(input, &mut tracker);
        let report = tracker.finish(&result);
        RunOutcome { result, report }
    }
}

impl<In, S> fmt::Debug for Pipeline<In, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pipeline").field("id", &self.id).finish()
    }
}

/// Result of a run plus the report describing how it got there.
#[derive(Debug)]
pub struct RunOutcome<T> {
    pub result: StepResult<T>,
    pub report: RunReport,
}

impl<T> RunOutcome<T> {
    pub fn state(&self) -> RunState {
        self.report.state
    }

    pub fn into_result(self) -> StepResult<T> {
        self.result
    }
}

/// The step sequence behind a [`Pipeline`]. Implemented by [`Leaf`] and
/// [`Chain`]; callers build it through `start`/`then` rather than by hand.
pub trait Stages<In>: Send + Sync {
    type Output;

    fn names(&self) -> Vec<&str>;

    fn drive(&self, input: In, run: &mut RunTracker<'_>) -> StepResult<Self::Output>;
}

/// A single step in the sequence.
pub struct Leaf<S>(pub(crate) S);

/// `head` followed by `tail`.
pub struct Chain<A, B> {
    pub(crate) head: A,
    pub(crate) tail: B,
}

impl<In, S> Stages<In> for Leaf<S>
where
    S: Step<In>,
{
    type Output = S::Output;

    fn names(&self) -> Vec<&str> {
        vec![self.0.name()]
    }

    fn drive(&self, input: In, run: &mut RunTracker<'_>) -> StepResult<S::Output> {
        let started = run.enter(self.0.name())?;
        let result = self.0.run(input);
        run.leave(self.0.name(), started, &result);
        result
    }
}

impl<In, A, B> Stages<In> for Chain<A, B>
where
    A: Stages<In>,
    B: Stages<A::Output>,
{
    type Output = B::Output;

    fn names(&self) -> Vec<&str> {
        let mut names = self.head.names();
        names.extend(self.tail.names());
        names
    }

    fn drive(&self, input: In, run: &mut RunTracker<'_>) -> StepResult<B::Output> {
        let mid = self.head.drive(input, run)?;
        self.tail.drive(mid, run)
    }
}

pub(crate) fn fingerprint(pipeline_id: &str) -> String {
    format!("blake3:{}", blake3::hash(pipeline_id.as_bytes()))
}

/// Bookkeeping for one run: state transitions, step records, cancellation
/// checks at step boundaries.
pub struct RunTracker<'a> {
    ctx: &'a RunContext,
    report: RunReport,
}

pub(crate) struct Started {
    position: usize,
    at: DateTime<Utc>,
    clock: Instant,
}

impl<'a> RunTracker<'a> {
    pub(crate) fn new(ctx: &'a RunContext, pipeline_id: &str) -> Self {
        Self {
            ctx,
            report: RunReport {
                run_id: uuid::Uuid::new_v4().to_string(),
                trace_id: ctx.trace_id.clone(),
                pipeline_id: pipeline_id.to_string(),
                fingerprint: fingerprint(pipeline_id),
                state: RunState::Pending,
                steps: Vec::new(),
                started_at: Utc::now(),
                finished_at: None,
            },
        }
    }

    pub fn state(&self) -> RunState {
        self.report.state
    }

    pub(crate) fn enter(&mut self, name: &str) -> StepResult<Started> {
        if self.report.state == RunState::Pending {
            self.report.state = RunState::Running;
        }
        let position = self.report.steps.len() + 1;

        if self.ctx.is_cancelled() {
            debug!(run_id = %self.report.run_id, step = name, position, "cancelled at step boundary");
            self.report.steps.push(StepRecord {
                name: name.to_string(),
                position,
                started_at: Utc::now(),
                latency_ms: 0,
                outcome: StepOutcome::Cancelled,
            });
            return Err(StepError::cancelled(name));
        }

        debug!(run_id = %self.report.run_id, step = name, position, "step started");
        Ok(Started {
            position,
            at: Utc::now(),
            clock: Instant::now(),
        })
    }

    pub(crate) fn leave<T>(&mut self, name: &str, started: Started, result: &StepResult<T>) {
        let latency_ms = started.clock.elapsed().as_millis() as u64;
        let outcome = match result {
            Ok(_) => StepOutcome::Ok,
            Err(err) => StepOutcome::from_error(err),
        };
        debug!(
            run_id = %self.report.run_id,
            step = name,
            position = started.position,
            latency_ms,
            ok = outcome.is_ok(),
            "step finished"
        );
        self.report.steps.push(StepRecord {
            name: name.to_string(),
            position: started.position,
            started_at: started.at,
            latency_ms,
            outcome,
        });
    }

    pub(crate) fn finish<T>(mut self, result: &StepResult<T>) -> RunReport {
        self.report.state = match result {
            Ok(_) => RunState::Succeeded,
            Err(StepError::Cancelled { .. }) => RunState::Cancelled,
            Err(_) => RunState::Failed,
        };
        self.report.finished_at = Some(Utc::now());

        match result {
            Ok(_) => info!(
                run_id = %self.report.run_id,
                steps = self.report.steps.len(),
                "pipeline succeeded"
            ),
            Err(err) => warn!(
                run_id = %self.report.run_id,
                kind = %err.kind(),
                error = %err,
                "pipeline halted"
            ),
        }
        self.report
    }
}
