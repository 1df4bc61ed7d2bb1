use crate::curried::TaxRate;
use fnflow_core::{Step, StepResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxedAmount {
    pub net: f64,
    pub tax: f64,
    pub gross: f64,
}

/// Pipeline step that adds tax to a net amount.
pub struct TaxStep<'t> {
    rate: TaxRate<'t>,
    name: String,
}

impl<'t> TaxStep<'t> {
    pub fn new(rate: TaxRate<'t>) -> Self {
        Self {
            name: format!("tax.{}", rate.label()),
            rate,
        }
    }
}

impl<'t> From<TaxRate<'t>> for TaxStep<'t> {
    fn from(rate: TaxRate<'t>) -> Self {
        Self::new(rate)
    }
}

impl Step<f64> for TaxStep<'_> {
    type Output = TaxedAmount;

    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, net: f64) -> StepResult<TaxedAmount> {
        let tax = self.rate.amount(net)?;
        Ok(TaxedAmount {
            net,
            tax,
            gross: net + tax,
        })
    }
}
