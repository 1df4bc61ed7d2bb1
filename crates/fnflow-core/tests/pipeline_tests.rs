//! Executor contract tests: ordering, short-circuiting, cancellation, retry.

use fnflow_core::{
    retry, step_fn, BackoffPolicy, CancellationToken, ErrorKind, Pipeline, RunContext, RunState,
    Step, StepError, StepOutcome, StepResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fnflow_core=debug")
        .with_test_writer()
        .try_init();
}

/// Step that appends its name to a shared journal and either passes the
/// value through (+1) or fails.
struct Probe<'a> {
    name: &'static str,
    fail: bool,
    journal: &'a Mutex<Vec<&'static str>>,
    calls: AtomicUsize,
}

impl<'a> Probe<'a> {
    fn ok(name: &'static str, journal: &'a Mutex<Vec<&'static str>>) -> Self {
        Self {
            name,
            fail: false,
            journal,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(name: &'static str, journal: &'a Mutex<Vec<&'static str>>) -> Self {
        Self {
            fail: true,
            ..Self::ok(name, journal)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Step<u32> for Probe<'_> {
    type Output = u32;

    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, input: u32) -> StepResult<u32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().unwrap().push(self.name);
        if self.fail {
            Err(StepError::failed(self.name, "probe failure"))
        } else {
            Ok(input + 1)
        }
    }
}

#[test]
fn all_ok_runs_every_step_once_in_order() {
    init_tracing();
    let journal = Mutex::new(Vec::new());
    let (a, b, c, d) = (
        Probe::ok("a", &journal),
        Probe::ok("b", &journal),
        Probe::ok("c", &journal),
        Probe::ok("d", &journal),
    );

    let pipeline = Pipeline::start(&a).then(&b).then(&c).then(&d);
    let outcome = pipeline.run_with(0, &RunContext::new());

    assert_eq!(outcome.result, Ok(4));
    assert_eq!(outcome.state(), RunState::Succeeded);
    assert_eq!(*journal.lock().unwrap(), vec!["a", "b", "c", "d"]);
    for probe in [&a, &b, &c, &d] {
        assert_eq!(probe.calls(), 1);
    }
    let positions: Vec<usize> = outcome.report.steps.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4]);
}

#[test]
fn failure_at_each_position_skips_the_rest() {
    for k in 0..4 {
        let journal = Mutex::new(Vec::new());
        let names = ["s1", "s2", "s3", "s4"];
        let probes: Vec<Probe> = names
            .iter()
            .enumerate()
            .map(|(i, &name)| {
                if i == k {
                    Probe::failing(name, &journal)
                } else {
                    Probe::ok(name, &journal)
                }
            })
            .collect();

        let pipeline = Pipeline::start(&probes[0])
            .then(&probes[1])
            .then(&probes[2])
            .then(&probes[3]);
        let outcome = pipeline.run_with(0, &RunContext::new());

        assert_eq!(
            outcome.result,
            Err(StepError::failed(names[k], "probe failure")),
            "failing at {}",
            k + 1
        );
        assert_eq!(outcome.state(), RunState::Failed);
        for (i, probe) in probes.iter().enumerate() {
            let expected = if i <= k { 1 } else { 0 };
            assert_eq!(probe.calls(), expected, "step {} when failing at {}", i + 1, k + 1);
        }
        assert_eq!(outcome.report.steps.len(), k + 1);
        assert_eq!(
            outcome.report.failed_step().map(|s| s.name.as_str()),
            Some(names[k])
        );
    }
}

#[test]
fn runs_are_deterministic_and_independent() {
    let pipeline = Pipeline::start(step_fn("inc", |x: i32| Ok(x + 1)))
        .then(step_fn("check", |x: i32| {
            if x < 10 {
                Ok(x)
            } else {
                Err(StepError::invalid_input("too big"))
            }
        }))
        .then(step_fn("render", |x: i32| Ok(format!("#{}", x))));

    for _ in 0..3 {
        assert_eq!(pipeline.run(1), Ok("#2".to_string()));
        assert_eq!(pipeline.run(9), Err(StepError::invalid_input("too big")));
    }
}

#[test]
fn cancellation_stops_at_the_next_boundary() {
    init_tracing();
    let token = CancellationToken::new();
    let trigger = token.clone();
    let later = AtomicUsize::new(0);

    let pipeline = Pipeline::start(step_fn("first", |x: u32| Ok(x + 1)))
        .then(step_fn("pull_the_plug", move |x: u32| {
            trigger.cancel();
            Ok(x + 1)
        }))
        .then(step_fn("third", |x: u32| {
            later.fetch_add(1, Ordering::SeqCst);
            Ok(x + 1)
        }))
        .then(step_fn("fourth", |x: u32| {
            later.fetch_add(1, Ordering::SeqCst);
            Ok(x)
        }));

    let ctx = RunContext::new().with_cancellation(token);
    let outcome = pipeline.run_with(0, &ctx);

    assert_eq!(outcome.result, Err(StepError::cancelled("third")));
    assert_eq!(outcome.state(), RunState::Cancelled);
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.report.invoked(), vec!["first", "pull_the_plug"]);
    assert_eq!(outcome.report.steps[2].outcome, StepOutcome::Cancelled);
}

#[test]
fn cancelled_before_start_runs_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let calls = AtomicUsize::new(0);
    let pipeline = Pipeline::start(step_fn("only", |x: u8| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(x)
    }));

    let outcome = pipeline.run_with(1, &RunContext::new().with_cancellation(token));
    assert_eq!(outcome.result, Err(StepError::cancelled("only")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn retry_decorator_composes_inside_a_pipeline() {
    // fails n-1 = 3 times, succeeds on the 4th call
    let n = 4;
    let make_flaky = |calls: &'static AtomicUsize| {
        step_fn("charge", move |amount: u32| {
            if calls.fetch_add(1, Ordering::SeqCst) + 1 < n {
                Err(StepError::failed("charge", "gateway timeout"))
            } else {
                Ok(amount)
            }
        })
    };

    static ENOUGH: AtomicUsize = AtomicUsize::new(0);
    let pipeline = Pipeline::start(step_fn("validate", |amount: u32| Ok(amount)))
        .then(retry(make_flaky(&ENOUGH), BackoffPolicy::immediate(3)));
    assert_eq!(pipeline.run(50), Ok(50));
    assert_eq!(ENOUGH.load(Ordering::SeqCst), 4);

    static TOO_FEW: AtomicUsize = AtomicUsize::new(0);
    let pipeline = Pipeline::start(step_fn("validate", |amount: u32| Ok(amount)))
        .then(retry(make_flaky(&TOO_FEW), BackoffPolicy::immediate(2)));
    let outcome = pipeline.run_with(50, &RunContext::new());
    assert_eq!(
        outcome.result,
        Err(StepError::failed("charge", "gateway timeout"))
    );
    assert_eq!(TOO_FEW.load(Ordering::SeqCst), 3);
    // retries are invisible to the executor: one record per step
    assert_eq!(outcome.report.steps.len(), 2);
}

#[test]
fn executor_never_rewrites_error_kinds() {
    let kinds = vec![
        StepError::invalid_input("x"),
        StepError::unavailable("A"),
        StepError::failed("op", "msg"),
        StepError::other("QUOTA", "over"),
        StepError::exhausted(2, StepError::unavailable("B")),
    ];
    for err in kinds {
        let expected = err.clone();
        let pipeline = Pipeline::start(step_fn("pass", |x: u8| Ok(x)))
            .then(step_fn("boom", move |_: u8| -> StepResult<u8> { Err(err.clone()) }));
        let result = pipeline.run(1);
        assert_eq!(result.as_ref().err().map(StepError::kind), Some(expected.kind()));
        assert_eq!(result, Err(expected));
    }
}

#[test]
fn report_serializes_for_logging() {
    let pipeline = Pipeline::start(step_fn("a", |x: u8| Ok(x)))
        .then(step_fn("b", |_: u8| -> StepResult<u8> {
            Err(StepError::unavailable("A"))
        }));
    let outcome = pipeline.run_with(1, &RunContext::new().with_label("serialize"));

    let json = serde_json::to_value(&outcome.report).unwrap();
    assert_eq!(json["pipeline_id"], "a→b");
    assert_eq!(json["state"], "FAILED");
    assert_eq!(json["steps"][1]["outcome"]["kind"], "ResourceUnavailable");
    assert_eq!(
        outcome.report.failed_step().map(|s| &s.outcome),
        Some(&StepOutcome::Err {
            kind: ErrorKind::ResourceUnavailable,
            message: "UNAVAILABLE/A".to_string(),
        })
    );
}
