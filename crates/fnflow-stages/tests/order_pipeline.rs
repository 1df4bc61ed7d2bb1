//! Checkout scenarios run end to end through the pipeline executor.

use fnflow_core::{
    retry, BackoffPolicy, ErrorKind, Pipeline, RunContext, RunState, Step, StepError, StepResult,
};
use fnflow_stages::notify::{Channel, Notification, Sender, SenderExt};
use fnflow_stages::{
    order_pipeline, ChargePayment, CheckStock, Inventory, Order, Payment, PaymentMethod,
    SendConfirmation, ValidateOrder,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fnflow_stages=debug,fnflow_core=debug")
        .with_test_writer()
        .try_init();
}

fn ord_1() -> Order {
    Order::new("ORD-1").item("A", 2)
}

/// Counts how often the wrapped charge step runs.
struct Counted<'a> {
    inner: ChargePayment,
    calls: &'a AtomicUsize,
}

impl Step<Order> for Counted<'_> {
    type Output = Payment;

    fn name(&self) -> &str {
        "orders.charge"
    }

    fn run(&self, order: Order) -> StepResult<Payment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(order)
    }
}

#[test]
fn checkout_succeeds_with_enough_stock() {
    init_tracing();
    let inventory = Inventory::new().with("A", 10);

    let payment = order_pipeline(&inventory, PaymentMethod::CreditCard)
        .run(ord_1())
        .unwrap();

    assert!(!payment.payment_id.is_empty());
    assert_eq!(payment.order, ord_1());
    // checking stock never takes it
    assert_eq!(inventory.available("A"), 10);
}

#[test]
fn checkout_stops_before_charging_when_stock_is_short() {
    init_tracing();
    let inventory = Inventory::new().with("A", 1);
    let charges = AtomicUsize::new(0);
    let charge = Counted {
        inner: ChargePayment::new(PaymentMethod::CreditCard),
        calls: &charges,
    };

    let pipeline = Pipeline::start(ValidateOrder)
        .then(CheckStock::new(&inventory))
        .then(charge);
    let outcome = pipeline.run_with(ord_1(), &RunContext::new().with_label("ORD-1"));

    assert_eq!(outcome.result, Err(StepError::unavailable("A")));
    assert_eq!(
        outcome.result,
        Err(StepError::ResourceUnavailable {
            resource: "A".to_string()
        })
    );
    assert_eq!(outcome.state(), RunState::Failed);
    assert_eq!(charges.load(Ordering::SeqCst), 0);
    assert_eq!(
        outcome.report.invoked(),
        vec!["orders.validate", "orders.check_stock"]
    );
}

#[test]
fn unknown_sku_is_unavailable() {
    let inventory = Inventory::new().with("A", 10);
    let result = order_pipeline(&inventory, PaymentMethod::PayPal).run(ord_1().item("Z", 1));
    assert_eq!(result.unwrap_err(), StepError::unavailable("Z"));
}

#[test]
fn declined_payment_is_an_operation_failure() {
    let inventory = Inventory::new().with("A", 10);
    let charge = ChargePayment::new(PaymentMethod::ApplePay).with_price("A", 400.0);
    let result = Pipeline::start(ValidateOrder)
        .then(CheckStock::new(&inventory))
        .then(charge)
        .run(ord_1());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::OperationFailed);
}

/// Email sender whose first `fail_times` sends time out.
struct FlakyMailer {
    fail_times: usize,
    calls: AtomicUsize,
}

impl Sender for FlakyMailer {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_times {
            return Err(StepError::failed("email", "smtp timeout"));
        }
        Channel::Email.send(notification)
    }
}

#[test]
fn confirmation_is_retried_by_the_step_decorator() {
    init_tracing();
    let inventory = Inventory::new().with("A", 10);
    let mailer = FlakyMailer {
        fail_times: 2,
        calls: AtomicUsize::new(0),
    };
    let confirm = SendConfirmation::new(&mailer, Channel::Email, "alice@example.com");

    let receipt = Pipeline::start(ValidateOrder)
        .then(CheckStock::new(&inventory))
        .then(ChargePayment::new(PaymentMethod::CreditCard))
        .then(retry(&confirm, BackoffPolicy::immediate(3)))
        .run(ord_1())
        .unwrap();

    assert_eq!(receipt.order_id, "ORD-1");
    assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn confirmation_rate_limit_surfaces_as_unavailable() {
    let inventory = Inventory::new().with("A", 10);
    let confirm = SendConfirmation::new(
        Channel::Email.rate_limited(1).logged(),
        Channel::Email,
        "alice@example.com",
    );
    let pipeline = order_pipeline(&inventory, PaymentMethod::CreditCard);

    let payment = pipeline.run(ord_1()).unwrap();
    assert!(confirm.run(payment).is_ok());

    let payment = pipeline.run(ord_1()).unwrap();
    assert_eq!(
        confirm.run(payment).unwrap_err(),
        StepError::unavailable("rate_limit:email")
    );
}
