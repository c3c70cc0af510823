use crate::persistence::Table;
use core_types::CoreError;
use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not enough cash available. Required: {required}, Available: {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Not enough {symbol} held. Requested: {requested}, Available: {available}")]
    InsufficientHoldings {
        symbol: String,
        requested: u64,
        available: u64,
    },

    #[error("The {table} document at {} could not be parsed: {source}", .path.display())]
    PersistenceCorrupt {
        table: Table,
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error while accessing the ledger documents: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode a ledger document: {0}")]
    Serialization(serde_json::Error),
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

impl LedgerError {
    /// True when the in-memory ledger was updated but the documents on disk may be stale.
    pub fn is_durability_failure(&self) -> bool {
        matches!(self, LedgerError::Io(_) | LedgerError::Serialization(_))
    }
}
