//! Curried forms of [`RateTable::tax`].
//!
//! Fix the dimensions one at a time and keep the partial calculators around:
//!
//! ```
//! use fnflow_tax::{CustomerType, ProductType, RateTable, Region};
//!
//! let table = RateTable::standard();
//! let eu_digital = table.region(Region::Eu).product(ProductType::Digital);
//! let for_individuals = eu_digital.customer(CustomerType::Individual);
//!
//! assert_eq!(for_individuals.amount(100.0), Ok(20.0));
//! assert_eq!(eu_digital.customer(CustomerType::Business).amount(100.0), Ok(0.0));
//! ```
//!
//! Lookups happen at the final application, so a combination missing from
//! the table only fails once an amount is supplied.
use crate::rates::{CustomerType, ProductType, RateTable, Region};
use fnflow_core::StepResult;
use std::sync::Arc;

impl RateTable {
    pub fn region(&self, region: Region) -> ForRegion<'_> {
        ForRegion {
            table: self,
            region,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForRegion<'t> {
    table: &'t RateTable,
    region: Region,
}

impl<'t> ForRegion<'t> {
    pub fn product(self, product: ProductType) -> ForProduct<'t> {
        ForProduct {
            table: self.table,
            region: self.region,
            product,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForProduct<'t> {
    table: &'t RateTable,
    region: Region,
    product: ProductType,
}

impl<'t> ForProduct<'t> {
    pub fn customer(self, customer: CustomerType) -> TaxRate<'t> {
        TaxRate {
            table: self.table,
            region: self.region,
            product: self.product,
            customer,
        }
    }
}

/// All three dimensions fixed; only the amount is left.
#[derive(Debug, Clone, Copy)]
pub struct TaxRate<'t> {
    table: &'t RateTable,
    region: Region,
    product: ProductType,
    customer: CustomerType,
}

impl<'t> TaxRate<'t> {
    pub fn amount(&self, amount: f64) -> StepResult<f64> {
        self.table
            .tax(self.region, self.product, self.customer, amount)
    }

    pub fn into_fn(self) -> impl Fn(f64) -> StepResult<f64> + 't {
        move |amount| self.amount(amount)
    }

    /// `region/product/customer`, as used in step names.
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.region, self.product, self.customer)
    }
}

pub type AmountFn = Box<dyn Fn(f64) -> StepResult<f64> + Send + Sync>;
pub type CustomerFn = Box<dyn Fn(CustomerType) -> AmountFn + Send + Sync>;
pub type ProductFn = Box<dyn Fn(ProductType) -> CustomerFn + Send + Sync>;

/// Closure-returning form over a shared table:
/// `calculate_tax(table)(region)(product)(customer)(amount)`.
pub fn calculate_tax(table: Arc<RateTable>) -> impl Fn(Region) -> ProductFn + Send + Sync {
    move |region: Region| -> ProductFn {
        let table = Arc::clone(&table);
        Box::new(move |product: ProductType| -> CustomerFn {
            let table = Arc::clone(&table);
            Box::new(move |customer: CustomerType| -> AmountFn {
                let table = Arc::clone(&table);
                Box::new(move |amount: f64| table.tax(region, product, customer, amount))
            })
        })
    }
}
