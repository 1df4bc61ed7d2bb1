use crate::rates::{CustomerType, ProductType, Region};
use fnflow_core::StepError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxError {
    #[error("TAX/unknown region: {0}")]
    UnknownRegion(String),

    #[error("TAX/unknown product type: {0}")]
    UnknownProduct(String),

    #[error("TAX/unknown customer type: {0}")]
    UnknownCustomer(String),

    #[error("TAX/no tax rule found for {region}/{product}/{customer}")]
    MissingRate {
        region: Region,
        product: ProductType,
        customer: CustomerType,
    },

    #[error("TAX/amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("TAX/rate for {path} must be within 0..=1, got {rate}")]
    InvalidRate { path: String, rate: f64 },

    #[error("TAX/config: {0}")]
    Config(#[from] serde_yaml::Error),
}

/// Every tax failure is a problem with the caller's input.
impl From<TaxError> for StepError {
    fn from(err: TaxError) -> Self {
        StepError::invalid_input(err.to_string())
    }
}
