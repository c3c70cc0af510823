use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The direction of a recorded trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TransactionKind::Buy),
            "sell" => Ok(TransactionKind::Sell),
            other => Err(CoreError::Unrecognized {
                field: "transaction kind",
                value: other.to_string(),
                expected: "buy, sell",
            }),
        }
    }
}

/// Which ledger table(s) a bulk clear should reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    Transactions,
    Positions,
    History,
    /// All three tables plus the cash balance.
    All,
}

impl ClearScope {
    pub fn clears_transactions(&self) -> bool {
        matches!(self, ClearScope::Transactions | ClearScope::All)
    }

    pub fn clears_positions(&self) -> bool {
        matches!(self, ClearScope::Positions | ClearScope::All)
    }

    pub fn clears_history(&self) -> bool {
        matches!(self, ClearScope::History | ClearScope::All)
    }

    pub fn clears_balance(&self) -> bool {
        matches!(self, ClearScope::All)
    }
}

impl fmt::Display for ClearScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClearScope::Transactions => "transactions",
            ClearScope::Positions => "positions",
            ClearScope::History => "history",
            ClearScope::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for ClearScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactions" => Ok(ClearScope::Transactions),
            "positions" => Ok(ClearScope::Positions),
            "history" => Ok(ClearScope::History),
            "all" => Ok(ClearScope::All),
            other => Err(CoreError::Unrecognized {
                field: "clear scope",
                value: other.to_string(),
                expected: "transactions, positions, history, all",
            }),
        }
    }
}
