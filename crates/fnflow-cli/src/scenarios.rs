//! Demo scenarios. Each returns the lines it wants shown; nothing here prints.
use anyhow::{Context, Result};
use fnflow_core::{
    async_step_fn, retry, AsyncPipeline, Blocking, FlowConfig, ResultExt, RunContext, StepError,
};
use fnflow_stages::ledger::MARCH_2024;
use fnflow_stages::notify::{Channel, Notification, Sender, SenderExt};
use fnflow_stages::{
    fulfil, order_pipeline, profile_pipeline, ChargePayment, Directory, Inventory, Ledger, Level,
    LogSink, Order, PaymentMethod, RawUser, SendConfirmation, ValidateOrder,
};
use fnflow_tax::{calculate_tax, CustomerType, ProductType, RateTable, Region};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn describe<T>(result: &Result<T, StepError>, ok: impl FnOnce(&T) -> String) -> String {
    match result {
        Ok(value) => ok(value),
        Err(err) => format!("failed: {}", err),
    }
}

/// Checkout against plenty and too little stock, then a full fulfilment.
pub fn orders(config: &FlowConfig) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let order = Order::new("ORD-1").item("A", 2);

    for available in [10, 1] {
        let inventory = Inventory::new().with("A", available);
        let ctx = context(config, "checkout");
        let outcome = order_pipeline(&inventory, PaymentMethod::CreditCard)
            .run_with(order.clone(), &ctx);
        lines.push(format!(
            "{} with stock A:{} → {}",
            order.id,
            available,
            describe(&outcome.result, |p| format!("paid {}", p.payment_id))
        ));
    }

    let inventory = Inventory::new().with("productA", 10).with("productB", 5);
    let charge = ChargePayment::new(PaymentMethod::PayPal)
        .with_price("productA", 19.99)
        .with_price("productB", 5.0);
    let confirm = SendConfirmation::new(
        Channel::Email.logged(),
        Channel::Email,
        "alice@example.com",
    );
    let raw = serde_json::json!({
        "id": "ORD-123",
        "items": [
            {"sku": "productA", "qty": 2},
            {"sku": "productB", "qty": 1}
        ]
    });
    let (outcome, updated) = fulfil(raw, &inventory, &charge, &confirm, &context(config, "fulfil"))
        .context("fulfilment bookkeeping failed")?;
    lines.push(format!(
        "ORD-123 → {} (steps: {})",
        describe(&outcome.result, |r| format!(
            "{} charged {:.2}, confirmation to {}",
            r.payment_id, r.amount, r.notified
        )),
        outcome.report.invoked().join(", ")
    ));
    lines.push(format!(
        "stock after: productA={} productB={}",
        updated.available("productA"),
        updated.available("productB")
    ));
    Ok(lines)
}

pub fn profile() -> Result<Vec<String>> {
    let raw = RawUser {
        id: " 123 ".to_string(),
        name: " Alice Smith ".to_string(),
        email: " alice@example.com ".to_string(),
        phone: Some(" (555) 123-4567 ".to_string()),
    };
    let masked = profile_pipeline().run(raw);
    let line = match masked {
        Ok(user) => serde_json::to_string(&user).context("serializing masked user")?,
        Err(err) => format!("failed: {}", err),
    };
    Ok(vec![line])
}

pub fn balances() -> Vec<String> {
    let directory = Directory::sample();
    [1, 2, 3, 10]
        .into_iter()
        .map(|id| format!("user {}: {}", id, directory.describe_balance(id)))
        .collect()
}

pub fn tax() -> Vec<String> {
    let table = RateTable::standard();
    let eu_digital = table.region(Region::Eu).product(ProductType::Digital);
    let us_physical = table.region(Region::Us).product(ProductType::Physical);
    let closure = calculate_tax(Arc::new(table.clone()));

    let cases = [
        ("EU digital individual", eu_digital.customer(CustomerType::Individual).amount(100.0), 100.0),
        ("EU digital business", eu_digital.customer(CustomerType::Business).amount(100.0), 100.0),
        ("US physical business", us_physical.customer(CustomerType::Business).amount(200.0), 200.0),
        ("US physical individual", us_physical.customer(CustomerType::Individual).amount(200.0), 200.0),
        (
            "US service individual",
            closure(Region::Us)(ProductType::Service)(CustomerType::Individual)(500.0),
            500.0,
        ),
    ];
    cases
        .into_iter()
        .map(|(label, owed, amount)| {
            format!(
                "{} on {:.2}: {}",
                label,
                amount,
                describe(&owed, |t| format!("{:.2}", t))
            )
        })
        .collect()
}

pub fn notify(config: &FlowConfig) -> Vec<String> {
    let mut lines = Vec::new();

    let email = Channel::Email.logged();
    let shipped = Notification::new(Channel::Email, "alice@example.com", "Your order has shipped!");
    lines.push(format!("email: {}", describe(&email.send(&shipped), |_| "sent".into())));

    let sms = Channel::Sms.retried(2).logged();
    let promo = Notification::new(Channel::Sms, "+1234567890", "Your promo code is active.");
    lines.push(format!("sms: {}", describe(&sms.send(&promo), |_| "sent".into())));

    let push = Channel::Push.rate_limited(config.notify_rate_limit);
    let ping = Notification::new(Channel::Push, "user_789", "New notification from your app.");
    for n in 1..=config.notify_rate_limit + 1 {
        lines.push(format!(
            "push #{}: {}",
            n,
            describe(&push.send(&ping), |_| "sent".into())
        ));
    }
    lines
}

pub fn logging() -> Vec<String> {
    let dev = LogSink::for_environment("development");
    let prod = LogSink::for_environment("production");
    let mut lines = vec![
        dev.emit(Level::Info, "User logged in successfully."),
        prod.emit(Level::Error, "Database connection failed."),
    ];
    let alert = "file"
        .parse::<LogSink>()
        .and_then(|sink| sink.emit_named("warn", "Disk space is low!"))
        .recover(|err| format!("failed: {}", err));
    lines.push(alert);
    lines
}

pub fn ledger() -> Result<Vec<String>> {
    let ledger = Ledger::from_json(MARCH_2024).context("loading sample ledger")?;
    let march = ledger.in_month(2024, 3);
    Ok(vec![
        format!("Total Expenses in March: ${:.2}", march.total_expenses()),
        format!("Net in March: ${:.2}", march.net()),
    ])
}

/// Async checkout whose remote hold times out once and is retried with the
/// configured backoff.
pub async fn async_checkout(config: &FlowConfig) -> Result<Vec<String>> {
    let calls = Arc::new(AtomicU32::new(0));
    let hold_calls = Arc::clone(&calls);

    let remote_hold = async_step_fn("orders.remote_hold", move |order: Order| {
        let calls = Arc::clone(&hold_calls);
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StepError::failed("orders.remote_hold", "gateway timeout"))
            } else {
                Ok(order)
            }
        }
    });

    let pipeline = AsyncPipeline::start(Blocking(ValidateOrder))
        .then(retry(remote_hold, config.retry.policy()))
        .then_blocking(ChargePayment::new(PaymentMethod::ApplePay).with_price("A", 45.0));

    let outcome = pipeline
        .run_with(Order::new("ORD-7").item("A", 3), &context(config, "async-checkout"))
        .await;
    Ok(vec![format!(
        "ORD-7 → {} after {} remote attempt(s) [{}]",
        describe(&outcome.result, |p| format!("paid {:.2} ({})", p.amount, p.payment_id)),
        calls.load(Ordering::SeqCst),
        outcome.report.fingerprint
    )])
}

fn context(config: &FlowConfig, scenario: &str) -> RunContext {
    let label = config.label.as_deref().unwrap_or("fnflow");
    RunContext::new()
        .with_label(format!("{}/{}", label, scenario))
        .with_metadata("scenario", serde_json::Value::from(scenario))
}
