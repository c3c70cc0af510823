//! # Folio Ledger Crate
//!
//! This crate owns the portfolio ledger: the transaction log, the derived
//! position table, the cash balance and the snapshot history. It is the only
//! component allowed to mutate them.
//!
//! ## Architectural Principles
//!
//! - **Reject Fast, Change Nothing:** Every validation and solvency check runs
//!   before any table is touched. A rejected request leaves the ledger exactly
//!   as it was.
//! - **Write-Through Persistence:** Each table lives in its own JSON document.
//!   Every mutation rewrites the affected documents before returning, using
//!   staged temporary files so a crash never leaves a truncated document.
//! - **Single Writer:** Mutations take `&mut self`. Callers that need to share
//!   a store across threads wrap it in one `Mutex` held for a whole operation.
//!
//! ## Public API
//!
//! - `LedgerStore`: The state machine that records trades and cash movements.
//! - `JsonStore`: The stateless persistence adapter for the four documents.
//! - `PriceSource`: The capability the net-worth calculation needs from a market data feed.
//! - `LedgerError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod persistence;
pub mod price_source;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use error::LedgerError;
pub use persistence::{BalanceDocument, JsonStore, LedgerTables, Table, TransactionLog};
pub use price_source::PriceSource;
pub use store::LedgerStore;
