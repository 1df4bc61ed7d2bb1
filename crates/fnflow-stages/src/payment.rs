//! Payment methods as a closed set of handlers.
use fnflow_core::{StepError, StepResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Highest amount Apple Pay authorizes in one charge.
pub const APPLE_PAY_LIMIT: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "credit_card")]
    CreditCard,
    #[serde(rename = "paypal")]
    PayPal,
    #[serde(rename = "apple_pay")]
    ApplePay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [Self::CreditCard, Self::PayPal, Self::ApplePay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::PayPal => "paypal",
            Self::ApplePay => "apple_pay",
        }
    }

    /// Per-charge ceiling, if the method has one.
    pub fn limit(&self) -> Option<f64> {
        match self {
            Self::ApplePay => Some(APPLE_PAY_LIMIT),
            Self::CreditCard | Self::PayPal => None,
        }
    }

    /// Authorizes a charge of `amount`.
    ///
    /// Negative or non-finite amounts are `InvalidInput`; an amount above the
    /// method's limit is a declined charge (`OperationFailed`).
    pub fn authorize(&self, amount: f64) -> StepResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(StepError::invalid_input(format!(
                "payment amount must be a non-negative number, got {}",
                amount
            )));
        }

        info!(method = self.as_str(), amount, "processing payment");

        match self.limit() {
            Some(limit) if amount > limit => Err(StepError::failed(
                format!("payment.{}", self.as_str()),
                format!("declined: {:.2} exceeds limit {:.2}", amount, limit),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "credit_card" | "card" => Ok(Self::CreditCard),
            "paypal" => Ok(Self::PayPal),
            "apple_pay" | "applepay" => Ok(Self::ApplePay),
            _ => Err(StepError::invalid_input(format!(
                "unsupported payment method: {}",
                s
            ))),
        }
    }
}
