//! Order processing steps
//!
//! ```text
//! Value → parse → validate → check_stock → charge → reserve_stock → confirm
//!                                ↓            ↓           ↓             ↓
//!                           Unavailable    Failed    Unavailable     Invalid
//! ```
//!
//! [`order_pipeline`] is the three-step checkout (validate, check stock,
//! charge). [`fulfil`] runs the whole chain against a private copy of the
//! inventory and hands back the updated copy.
use crate::notify::{Channel, Notification, Sender};
use crate::payment::PaymentMethod;
use fnflow_core::pipeline::Stages;
use fnflow_core::{Pipeline, RunContext, RunOutcome, Step, StepError, StepResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
        }
    }

    pub fn item(mut self, sku: impl Into<String>, qty: u32) -> Self {
        self.items.push(LineItem {
            sku: sku.into(),
            qty,
        });
        self
    }

    /// Quantity per SKU, summing repeated lines. Sums are `u64` so repeated
    /// `u32` lines cannot overflow.
    pub fn demand(&self) -> BTreeMap<&str, u64> {
        self.items.iter().fold(BTreeMap::new(), |mut acc, item| {
            *acc.entry(item.sku.as_str()).or_insert(0) += u64::from(item.qty);
            acc
        })
    }
}

/// Units available per SKU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    stock: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sku: impl Into<String>, available: u32) -> Self {
        self.stock.insert(sku.into(), available);
        self
    }

    pub fn available(&self, sku: &str) -> u32 {
        self.stock.get(sku).copied().unwrap_or(0)
    }

    /// First SKU (in SKU order) the inventory cannot cover.
    pub fn shortfall<'o>(&self, order: &'o Order) -> Option<&'o str> {
        order
            .demand()
            .into_iter()
            .find(|(sku, qty)| u64::from(self.available(sku)) < *qty)
            .map(|(sku, _)| sku)
    }

    /// Takes every line of `order` out of stock, or nothing at all.
    pub fn reserve(&mut self, order: &Order) -> StepResult<()> {
        if let Some(sku) = self.shortfall(order) {
            return Err(StepError::unavailable(sku));
        }
        for (sku, qty) in order.demand() {
            if let Some(available) = self.stock.get_mut(sku) {
                // shortfall already guarantees qty <= available
                *available = u64::from(*available)
                    .checked_sub(qty)
                    .and_then(|left| u32::try_from(left).ok())
                    .ok_or_else(|| StepError::unavailable(sku))?;
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            stock: iter.into_iter().map(|(sku, n)| (sku.into(), n)).collect(),
        }
    }
}

/// A charged order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub order: Order,
}

/// What the customer is told once the order went through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub order_id: String,
    pub payment_id: String,
    pub amount: f64,
    pub notified: String,
}

/// Raw JSON into an [`Order`]; any shape mismatch is `InvalidInput`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOrder;

impl Step<Value> for ParseOrder {
    type Output = Order;

    fn name(&self) -> &str {
        "orders.parse"
    }

    fn run(&self, input: Value) -> StepResult<Order> {
        serde_json::from_value(input)
            .map_err(|e| StepError::invalid_input(format!("malformed order: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOrder;

impl Step<Order> for ValidateOrder {
    type Output = Order;

    fn name(&self) -> &str {
        "orders.validate"
    }

    fn run(&self, order: Order) -> StepResult<Order> {
        if order.id.trim().is_empty() {
            return Err(StepError::invalid_input("order id is required"));
        }
        if order.items.is_empty() {
            return Err(StepError::invalid_input(format!(
                "order {} has no items",
                order.id
            )));
        }
        if let Some(item) = order.items.iter().find(|i| i.sku.is_empty() || i.qty == 0) {
            return Err(StepError::invalid_input(format!(
                "order {} has an invalid line: sku {:?} qty {}",
                order.id, item.sku, item.qty
            )));
        }
        if let Some((sku, qty)) = order
            .demand()
            .into_iter()
            .find(|(_, qty)| *qty > u64::from(u32::MAX))
        {
            return Err(StepError::invalid_input(format!(
                "order {} asks for {} of {}, more than can be stocked",
                order.id, qty, sku
            )));
        }
        debug!(order_id = %order.id, "order validated");
        Ok(order)
    }
}

/// Fails with `ResourceUnavailable { resource: sku }` for the first SKU the
/// borrowed inventory cannot cover. Does not modify stock.
#[derive(Debug, Clone, Copy)]
pub struct CheckStock<'a> {
    inventory: &'a Inventory,
}

impl<'a> CheckStock<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }
}

impl Step<Order> for CheckStock<'_> {
    type Output = Order;

    fn name(&self) -> &str {
        "orders.check_stock"
    }

    fn run(&self, order: Order) -> StepResult<Order> {
        if let Some(sku) = self.inventory.shortfall(&order) {
            return Err(StepError::unavailable(sku));
        }
        debug!(order_id = %order.id, "inventory checked");
        Ok(order)
    }
}

/// Prices the order and authorizes the charge with one payment method.
///
/// SKUs without a listed price cost `fallback_price` per unit (1.0 unless
/// set), so an unpriced order is charged its item count.
#[derive(Debug, Clone)]
pub struct ChargePayment {
    method: PaymentMethod,
    prices: HashMap<String, f64>,
    fallback_price: f64,
}

impl ChargePayment {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            prices: HashMap::new(),
            fallback_price: 1.0,
        }
    }

    pub fn with_price(mut self, sku: impl Into<String>, unit_price: f64) -> Self {
        self.prices.insert(sku.into(), unit_price);
        self
    }

    pub fn with_fallback_price(mut self, unit_price: f64) -> Self {
        self.fallback_price = unit_price;
        self
    }

    pub fn amount(&self, order: &Order) -> f64 {
        order
            .items
            .iter()
            .map(|item| {
                let unit = self.prices.get(&item.sku).copied().unwrap_or(self.fallback_price);
                unit * f64::from(item.qty)
            })
            .sum()
    }
}

impl Step<Order> for ChargePayment {
    type Output = Payment;

    fn name(&self) -> &str {
        "orders.charge"
    }

    fn run(&self, order: Order) -> StepResult<Payment> {
        let amount = self.amount(&order);
        self.method.authorize(amount)?;

        let payment_id = format!("PAY-{}", Uuid::new_v4().simple());
        info!(order_id = %order.id, %payment_id, amount, "payment processed");
        Ok(Payment {
            payment_id,
            amount,
            method: self.method,
            order,
        })
    }
}

/// Takes a paid order's items out of an owned inventory.
#[derive(Debug, Default)]
pub struct ReserveStock {
    inventory: Mutex<Inventory>,
}

impl ReserveStock {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: Mutex::new(inventory),
        }
    }

    pub fn snapshot(&self) -> StepResult<Inventory> {
        self.inventory
            .lock()
            .map(|inventory| inventory.clone())
            .map_err(|_| StepError::failed("orders.reserve_stock", "inventory lock poisoned"))
    }

    pub fn into_inventory(self) -> StepResult<Inventory> {
        self.inventory
            .into_inner()
            .map_err(|_| StepError::failed("orders.reserve_stock", "inventory lock poisoned"))
    }
}

impl Step<Payment> for ReserveStock {
    type Output = Payment;

    fn name(&self) -> &str {
        "orders.reserve_stock"
    }

    fn run(&self, payment: Payment) -> StepResult<Payment> {
        self.inventory
            .lock()
            .map_err(|_| StepError::failed("orders.reserve_stock", "inventory lock poisoned"))?
            .reserve(&payment.order)?;
        debug!(order_id = %payment.order.id, "inventory updated");
        Ok(payment)
    }
}

/// Tells the customer their order went through.
pub struct SendConfirmation<S> {
    sender: S,
    channel: Channel,
    recipient: String,
}

impl<S: Sender> SendConfirmation<S> {
    pub fn new(sender: S, channel: Channel, recipient: impl Into<String>) -> Self {
        Self {
            sender,
            channel,
            recipient: recipient.into(),
        }
    }
}

impl<S: Sender> Step<Payment> for SendConfirmation<S> {
    type Output = Receipt;

    fn name(&self) -> &str {
        "orders.confirm"
    }

    fn run(&self, payment: Payment) -> StepResult<Receipt> {
        let notification = Notification::new(
            self.channel,
            self.recipient.clone(),
            format!(
                "Order {} confirmed, payment {} of {:.2}",
                payment.order.id, payment.payment_id, payment.amount
            ),
        );
        self.sender.send(&notification)?;
        Ok(Receipt {
            order_id: payment.order.id,
            payment_id: payment.payment_id,
            amount: payment.amount,
            notified: self.recipient.clone(),
        })
    }
}

/// validate → check_stock → charge.
pub fn order_pipeline(
    inventory: &Inventory,
    method: PaymentMethod,
) -> Pipeline<Order, impl Stages<Order, Output = Payment> + '_> {
    Pipeline::start(ValidateOrder)
        .then(CheckStock::new(inventory))
        .then(ChargePayment::new(method))
}

/// Runs parse → validate → check_stock → charge → reserve_stock → confirm
/// against a copy of `inventory`.
///
/// `inventory` itself is never modified. The returned inventory has the
/// order's items taken out when the run reached the reserve step, and is an
/// untouched copy otherwise.
pub fn fulfil<S: Sender>(
    raw: Value,
    inventory: &Inventory,
    charge: &ChargePayment,
    confirm: &SendConfirmation<S>,
    ctx: &RunContext,
) -> StepResult<(RunOutcome<Receipt>, Inventory)> {
    let reserve = ReserveStock::new(inventory.clone());
    let outcome = Pipeline::start(ParseOrder)
        .then(ValidateOrder)
        .then(CheckStock::new(inventory))
        .then(charge)
        .then(&reserve)
        .then(confirm)
        .run_with(raw, ctx);
    Ok((outcome, reserve.into_inventory()?))
}
