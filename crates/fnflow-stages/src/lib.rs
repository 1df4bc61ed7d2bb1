//! fnflow stages: reference steps built on the core step contract.
//!
//! Small, deterministic implementations of the everyday scenarios pipelines
//! are used for. They only depend on `fnflow_core`'s public API, so they can
//! be swapped for real implementations one at a time.
//!
//! # Order Flow
//!
//! ```text
//! Value → ParseOrder → ValidateOrder → CheckStock → ChargePayment → ReserveStock → SendConfirmation
//!            ↓              ↓              ↓              ↓              ↓               ↓
//!          Order          Order          Order         Payment        Payment         Receipt
//! ```

pub mod accounts;
pub mod ledger;
pub mod log_sink;
pub mod notify;
pub mod orders;
pub mod payment;
pub mod profile;

pub use accounts::{Directory, User};
pub use ledger::{Ledger, Transaction, TransactionKind};
pub use log_sink::{Level, LogSink};
pub use notify::{Channel, Notification, RateLimiter, Sender, SenderExt};
pub use orders::{
    fulfil, order_pipeline, ChargePayment, CheckStock, Inventory, LineItem, Order, ParseOrder,
    Payment, Receipt, ReserveStock, SendConfirmation, ValidateOrder,
};
pub use payment::PaymentMethod;
pub use profile::{profile_pipeline, MaskedUser, RawUser};
