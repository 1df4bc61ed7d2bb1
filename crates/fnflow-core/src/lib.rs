//! fnflow core: Step trait, typed Pipeline executor, retry and run reports
//!
//! A pipeline is an ordered chain of fallible steps. Each step's output type
//! is the next step's input type, checked at compile time. Steps run in
//! declaration order; the first `Err` ends the run and is returned as is.
//!
//! ```text
//! input → step 1 → step 2 → ... → step n → Ok(output)
//!            ↓        ↓              ↓
//!           Err      Err            Err        (first one wins)
//! ```

pub mod async_pipeline;
pub mod compose;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod step;
pub mod value;

pub use async_pipeline::{async_step_fn, AsyncFnStep, AsyncPipeline, AsyncStep, Blocking};
pub use compose::{compose, pipe};
pub use config::{FlowConfig, RetryConfig};
pub use context::RunContext;
pub use error::{ConfigError, ErrorKind, StepError, StepResult};
pub use pipeline::{Pipeline, RunOutcome};
pub use report::{RunReport, RunState, StepOutcome, StepRecord};
pub use retry::{retry, BackoffPolicy, Retry, RetryPolicy};
pub use step::{step_fn, FnStep, Step};
pub use value::{OptionExt, ResultExt};

/// Re-exported so callers can build a [`RunContext`] without a direct dependency.
pub use tokio_util::sync::CancellationToken;

pub const FNFLOW_VERSION: &str = env!("CARGO_PKG_VERSION");
