//! Account lookups chained through `Option` and `Result`.
use fnflow_core::{OptionExt, StepError, StepResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BONUS_RATE: f64 = 1.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: BTreeMap<u32, User>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: u32, name: impl Into<String>, balance: f64) -> Self {
        self.users.insert(
            id,
            User {
                name: name.into(),
                balance,
            },
        );
        self
    }

    /// Alice (200), Bob (-50) and Trudy (3) under ids 1 to 3.
    pub fn sample() -> Self {
        Self::new()
            .with_user(1, "Alice", 200.0)
            .with_user(2, "Bob", -50.0)
            .with_user(3, "Trudy", 3.0)
    }

    pub fn find_user(&self, id: u32) -> Option<&User> {
        self.users.get(&id)
    }

    /// Balance after bonus, or the first reason it cannot be computed.
    pub fn bonus_balance(&self, id: u32) -> StepResult<f64> {
        let user = self.find_user(id).or_invalid("User not found")?;
        balance(user).and_then(apply_bonus)
    }

    /// One line describing the user's balance after bonus, or why there is
    /// none. Never fails.
    pub fn describe_balance(&self, id: u32) -> String {
        self.find_user(id)
            .map(balance)
            .unwrap_or_else(|| Err(StepError::invalid_input("User not found")))
            .and_then(apply_bonus)
            .map(|total| format!("New Balance: {:.2}", total))
            .unwrap_or_else(|err| match err {
                StepError::InvalidInput { message } => message,
                other => other.to_string(),
            })
    }
}

/// Negative balances are `InvalidInput("Invalid balance")`.
pub fn balance(user: &User) -> StepResult<f64> {
    if user.balance >= 0.0 {
        Ok(user.balance)
    } else {
        Err(StepError::invalid_input("Invalid balance"))
    }
}

/// Adds 10%; only positive balances qualify.
pub fn apply_bonus(balance: f64) -> StepResult<f64> {
    if balance > 0.0 {
        Ok(balance * BONUS_RATE)
    } else {
        Err(StepError::invalid_input("Balance too low"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_balance() {
        let directory = Directory::sample();
        assert_eq!(directory.describe_balance(1), "New Balance: 220.00");
        assert_eq!(directory.describe_balance(2), "Invalid balance");
        assert_eq!(directory.describe_balance(3), "New Balance: 3.30");
        assert_eq!(directory.describe_balance(10), "User not found");
    }

    #[test]
    fn test_zero_balance_is_too_low() {
        let directory = Directory::new().with_user(7, "Zed", 0.0);
        assert_eq!(directory.describe_balance(7), "Balance too low");
        assert_eq!(
            directory.bonus_balance(7),
            Err(StepError::invalid_input("Balance too low"))
        );
    }

    #[test]
    fn test_bonus_balance_short_circuits() {
        let directory = Directory::sample();
        assert!((directory.bonus_balance(1).unwrap() - 220.0).abs() < 1e-9);
        assert_eq!(
            directory.bonus_balance(99),
            Err(StepError::invalid_input("User not found"))
        );
        assert_eq!(
            directory.bonus_balance(2),
            Err(StepError::invalid_input("Invalid balance"))
        );
    }
}
