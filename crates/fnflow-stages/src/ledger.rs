//! Transaction ledger aggregated with iterator adapters.
use chrono::{Datelike, NaiveDate};
use fnflow_core::{StepError, StepResult};
use serde::{Deserialize, Serialize};

/// Sample ledger for March 2024.
pub const MARCH_2024: &str = r#"[
    {"id": "t1", "description": "Salary",        "amount": 3000, "kind": "income",  "date": "2024-03-01"},
    {"id": "t2", "description": "Rent",          "amount": 1200, "kind": "expense", "date": "2024-03-02"},
    {"id": "t3", "description": "Groceries",     "amount": 150,  "kind": "expense", "date": "2024-03-05"},
    {"id": "t4", "description": "Freelance Gig", "amount": 500,  "kind": "income",  "date": "2024-03-10"},
    {"id": "t5", "description": "Electricity",   "amount": 80,   "kind": "expense", "date": "2024-03-15"},
    {"id": "t6", "description": "Dining Out",    "amount": 75,   "kind": "expense", "date": "2024-03-20"}
]"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn from_json(json: &str) -> StepResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StepError::invalid_input(format!("malformed ledger: {}", e)))
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn by_kind(&self, kind: TransactionKind) -> impl Iterator<Item = &Transaction> + '_ {
        self.transactions.iter().filter(move |t| t.kind == kind)
    }

    pub fn expenses(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.by_kind(TransactionKind::Expense)
    }

    pub fn total(&self, kind: TransactionKind) -> f64 {
        self.by_kind(kind).map(|t| t.amount).sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.total(TransactionKind::Expense)
    }

    /// Income minus expenses.
    pub fn net(&self) -> f64 {
        self.transactions.iter().fold(0.0, |acc, t| match t.kind {
            TransactionKind::Income => acc + t.amount,
            TransactionKind::Expense => acc - t.amount,
        })
    }

    /// Transactions dated in the given month, as a new ledger.
    pub fn in_month(&self, year: i32, month: u32) -> Ledger {
        self.transactions
            .iter()
            .filter(|t| t.date.year() == year && t.date.month() == month)
            .cloned()
            .collect()
    }
}

impl FromIterator<Transaction> for Ledger {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
