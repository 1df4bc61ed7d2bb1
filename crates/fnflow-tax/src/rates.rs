//! Tax dimensions and the rate table
//!
//! Rates are looked up by region, then product type, then customer type.
//! Tables load from YAML keyed the same way:
//!
//! ```yaml
//! US:
//!   digital: { business: 0.05, individual: 0.10 }
//! EU:
//!   digital: { business: 0.0, individual: 0.20 }
//! ```
use crate::error::TaxError;
use fnflow_core::StepResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Us,
    Eu,
    Asia,
}

impl Region {
    pub const ALL: [Region; 3] = [Self::Us, Self::Eu, Self::Asia];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Eu => "EU",
            Self::Asia => "ASIA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Digital,
    Physical,
    Service,
}

impl ProductType {
    pub const ALL: [ProductType; 3] = [Self::Digital, Self::Physical, Self::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Physical => "physical",
            Self::Service => "service",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Business,
    Individual,
}

impl CustomerType {
    pub const ALL: [CustomerType; 2] = [Self::Business, Self::Individual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Individual => "individual",
        }
    }
}

macro_rules! name_impls {
    ($ty:ty, $err:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TaxError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| TaxError::$err(s.to_string()))
            }
        }
    };
}

name_impls!(Region, UnknownRegion);
name_impls!(ProductType, UnknownProduct);
name_impls!(CustomerType, UnknownCustomer);

type CustomerRates = BTreeMap<CustomerType, f64>;
type ProductRates = BTreeMap<ProductType, CustomerRates>;

/// Region → product type → customer type → rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    rates: BTreeMap<Region, ProductRates>,
}

impl RateTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in US/EU/ASIA table.
    pub fn standard() -> Self {
        use CustomerType::{Business, Individual};
        use ProductType::{Digital, Physical, Service};

        let rows = [
            (Region::Us, Digital, 0.05, 0.10),
            (Region::Us, Physical, 0.06, 0.12),
            (Region::Us, Service, 0.04, 0.10),
            (Region::Eu, Digital, 0.0, 0.20),
            (Region::Eu, Physical, 0.0, 0.20),
            (Region::Eu, Service, 0.0, 0.20),
            (Region::Asia, Digital, 0.03, 0.08),
            (Region::Asia, Physical, 0.04, 0.10),
            (Region::Asia, Service, 0.05, 0.09),
        ];
        rows.into_iter()
            .fold(Self::empty(), |table, (region, product, business, individual)| {
                table
                    .with_rate(region, product, Business, business)
                    .with_rate(region, product, Individual, individual)
            })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, TaxError> {
        let table: Self = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    pub fn with_rate(
        mut self,
        region: Region,
        product: ProductType,
        customer: CustomerType,
        rate: f64,
    ) -> Self {
        self.rates
            .entry(region)
            .or_default()
            .entry(product)
            .or_default()
            .insert(customer, rate);
        self
    }

    /// Every rate must be a finite fraction in `0..=1`.
    pub fn validate(&self) -> Result<(), TaxError> {
        for (region, products) in &self.rates {
            for (product, customers) in products {
                for (customer, rate) in customers {
                    if !(0.0..=1.0).contains(rate) {
                        return Err(TaxError::InvalidRate {
                            path: format!("{}/{}/{}", region, product, customer),
                            rate: *rate,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn rate_for(
        &self,
        region: Region,
        product: ProductType,
        customer: CustomerType,
    ) -> Result<f64, TaxError> {
        self.rates
            .get(&region)
            .and_then(|products| products.get(&product))
            .and_then(|customers| customers.get(&customer))
            .copied()
            .ok_or(TaxError::MissingRate {
                region,
                product,
                customer,
            })
    }

    /// Tax owed on `amount`: `amount * rate`.
    pub fn tax(
        &self,
        region: Region,
        product: ProductType,
        customer: CustomerType,
        amount: f64,
    ) -> StepResult<f64> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(TaxError::InvalidAmount(amount).into());
        }
        let rate = self.rate_for(region, product, customer)?;
        debug!(%region, %product, %customer, rate, amount, "tax computed");
        Ok(amount * rate)
    }
}
