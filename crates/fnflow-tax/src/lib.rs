//! fnflow tax: rate table and curried tax calculator
//!
//! `rate(region)(product)(customer)(amount)` and
//! `rate(region, product, customer, amount)` are the same function; this
//! crate offers both, plus a pipeline step over a fully applied rate.

pub mod curried;
pub mod error;
pub mod rates;
pub mod step;

pub use curried::{calculate_tax, AmountFn, CustomerFn, ForProduct, ForRegion, ProductFn, TaxRate};
pub use error::TaxError;
pub use rates::{CustomerType, ProductType, RateTable, Region};
pub use step::{TaxStep, TaxedAmount};
