use crate::error::LedgerError;
use crate::persistence::{JsonStore, LedgerTables, TransactionLog};
use crate::price_source::PriceSource;
use chrono::{DateTime, Utc};
use configuration::Storage;
use core_types::{ClearScope, Position, PositionTable, Snapshot, Transaction, TransactionKind};
use rust_decimal::Decimal;

/// The portfolio ledger.
///
/// Owns the transaction log, the position table derived from it, the cash
/// balance and the snapshot history. Every mutation validates first, then
/// updates the in-memory tables, then writes them through to disk.
#[derive(Debug)]
pub struct LedgerStore {
    persistence: JsonStore,
    log: TransactionLog,
    positions: PositionTable,
    history: Vec<Snapshot>,
    balance: Decimal,
    history_limit: Option<usize>,
}

impl LedgerStore {
    /// Loads every table from the configured data directory. Tables with no
    /// document on disk start empty.
    pub fn open(storage: &Storage) -> Result<Self, LedgerError> {
        let persistence = JsonStore::new(storage);
        let log = persistence.read_transactions()?;
        let positions = persistence.read_positions()?;
        let history = persistence.read_history()?;
        let balance = persistence.read_balance()?;

        tracing::info!(
            dir = %persistence.data_dir().display(),
            transactions = log.transactions.len(),
            positions = positions.len(),
            snapshots = history.len(),
            %balance,
            "Opened ledger"
        );

        Ok(Self {
            persistence,
            log,
            positions,
            history,
            balance,
            history_limit: storage.history_limit,
        })
    }

    /// Records a trade and returns its id.
    ///
    /// A buy needs `quantity * price` in cash; a sell needs at least
    /// `quantity` shares held. Either way the check happens before anything
    /// changes. On success the balance, position table and history are
    /// updated and all four documents are rewritten. If that write fails the
    /// in-memory ledger keeps the trade and the error is a durability warning.
    pub fn record_transaction(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: Decimal,
        kind: TransactionKind,
    ) -> Result<u64, LedgerError> {
        let symbol = normalize_symbol(symbol)?;
        if quantity == 0 {
            return Err(LedgerError::InvalidInput(
                "quantity must be greater than zero".to_string(),
            ));
        }
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "price must be greater than zero, got {price}"
            )));
        }
        let notional = Decimal::from(quantity)
            .checked_mul(price)
            .ok_or_else(|| LedgerError::InvalidInput("trade value is out of range".to_string()))?;

        let (new_balance, new_position) = match kind {
            TransactionKind::Buy => {
                if notional > self.balance {
                    tracing::warn!(%symbol, %notional, balance = %self.balance, "Rejected buy: insufficient funds");
                    return Err(LedgerError::InsufficientFunds {
                        required: notional,
                        available: self.balance,
                    });
                }
                let mut position = self
                    .positions
                    .get(&symbol)
                    .cloned()
                    .unwrap_or_else(|| Position::new(0, Decimal::ZERO));
                position.add_lot(quantity, price)?;
                (self.balance - notional, Some(position))
            }
            TransactionKind::Sell => {
                let held = self.positions.get(&symbol).map_or(0, |p| p.quantity);
                if quantity > held {
                    tracing::warn!(%symbol, quantity, held, "Rejected sell: insufficient holdings");
                    return Err(LedgerError::InsufficientHoldings {
                        symbol,
                        requested: quantity,
                        available: held,
                    });
                }
                let balance = self.balance.checked_add(notional).ok_or_else(|| {
                    LedgerError::InvalidInput("resulting balance is out of range".to_string())
                })?;
                let position = self
                    .positions
                    .get(&symbol)
                    .map(|p| Position::new(held - quantity, p.average_cost))
                    .filter(|p| !p.is_flat());
                (balance, position)
            }
        };

        // Nothing below can fail until persistence.
        let timestamp = Utc::now();
        let id = self.log.next_id;
        self.log.next_id += 1;
        self.balance = new_balance;
        self.log.transactions.push(Transaction {
            id,
            symbol: symbol.clone(),
            quantity,
            price,
            kind,
            timestamp,
        });
        match new_position {
            Some(position) => {
                self.positions.insert(symbol.clone(), position);
            }
            None => {
                self.positions.remove(&symbol);
            }
        }
        self.push_snapshot(timestamp);

        self.persistence.commit(self.tables())?;

        tracing::info!(id, %symbol, %kind, quantity, %price, balance = %self.balance, "Recorded transaction");
        Ok(id)
    }

    /// Looks up a transaction by id.
    pub fn get_transaction(&self, id: u64) -> Option<Transaction> {
        self.log.transactions.iter().find(|tx| tx.id == id).cloned()
    }

    pub fn list_transactions(&self) -> Vec<Transaction> {
        self.log.transactions.clone()
    }

    pub fn list_positions(&self) -> PositionTable {
        self.positions.clone()
    }

    pub fn list_history(&self) -> Vec<Snapshot> {
        self.history.clone()
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.positions.get(symbol.trim().to_ascii_uppercase().as_str()).cloned()
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Id the next recorded transaction will receive.
    pub fn next_transaction_id(&self) -> u64 {
        self.log.next_id
    }

    /// Adds cash to the account and returns the new balance.
    ///
    /// Only the balance document is rewritten. Cash movements do not append
    /// a snapshot to the history.
    pub fn deposit_cash(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        ensure_positive_amount(amount)?;
        self.balance = self.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidInput("resulting balance is out of range".to_string())
        })?;
        self.persistence.write_balance(self.balance)?;

        tracing::info!(%amount, balance = %self.balance, "Deposited cash");
        Ok(self.balance)
    }

    /// Removes cash from the account and returns the new balance.
    ///
    /// Like [`deposit_cash`](Self::deposit_cash), this writes only the balance
    /// document and takes no snapshot.
    pub fn withdraw_cash(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        ensure_positive_amount(amount)?;
        if amount > self.balance {
            tracing::warn!(%amount, balance = %self.balance, "Rejected withdrawal: insufficient funds");
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.persistence.write_balance(self.balance)?;

        tracing::info!(%amount, balance = %self.balance, "Withdrew cash");
        Ok(self.balance)
    }

    /// Cash plus the market value of every holding the source can price.
    /// Holdings without a quote are left out. Fails if a holding's value or
    /// the running total exceeds `Decimal`'s range.
    pub fn compute_net_worth<P: PriceSource + ?Sized>(
        &self,
        prices: &P,
    ) -> Result<Decimal, LedgerError> {
        self.positions
            .iter()
            .try_fold(self.balance, |total, (symbol, position)| {
                let Some(price) = prices.price(symbol) else {
                    tracing::debug!(%symbol, "No price available, excluded from net worth");
                    return Ok(total);
                };
                position
                    .market_value(price)
                    .and_then(|value| total.checked_add(value))
                    .ok_or_else(|| {
                        LedgerError::InvalidInput(format!(
                            "net worth is out of range when valuing {symbol} at {price}"
                        ))
                    })
            })
    }

    /// Bulk-resets the named tables. `All` also zeroes the balance.
    pub fn clear(&mut self, scope: ClearScope) -> Result<(), LedgerError> {
        if scope.clears_transactions() {
            self.log = TransactionLog::default();
        }
        if scope.clears_positions() {
            self.positions.clear();
        }
        if scope.clears_history() {
            self.history.clear();
        }
        if scope.clears_balance() {
            self.balance = Decimal::ZERO;
        }

        match scope {
            ClearScope::Transactions => self.persistence.write_transactions(&self.log)?,
            ClearScope::Positions => self.persistence.write_positions(&self.positions)?,
            ClearScope::History => self.persistence.write_history(&self.history)?,
            ClearScope::All => self.persistence.commit(self.tables())?,
        }

        tracing::info!(%scope, "Cleared ledger data");
        Ok(())
    }

    fn push_snapshot(&mut self, timestamp: DateTime<Utc>) {
        self.history.push(Snapshot {
            timestamp,
            positions: self.positions.clone(),
            balance: self.balance,
        });

        if let Some(limit) = self.history_limit {
            if self.history.len() > limit {
                let excess = self.history.len() - limit;
                self.history.drain(..excess);
            }
        }
    }

    fn tables(&self) -> LedgerTables<'_> {
        LedgerTables {
            log: &self.log,
            positions: &self.positions,
            history: &self.history,
            balance: self.balance,
        }
    }
}

fn normalize_symbol(symbol: &str) -> Result<String, LedgerError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(LedgerError::InvalidInput("symbol must not be empty".to_string()));
    }
    Ok(symbol.to_ascii_uppercase())
}

fn ensure_positive_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use tempfile::{TempDir, tempdir};

    fn fresh_store() -> (TempDir, LedgerStore) {
        let dir = tempdir().unwrap();
        let store = LedgerStore::open(&Storage::in_dir(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn rejects_invalid_trade_inputs() {
        let (_dir, mut store) = fresh_store();
        store.deposit_cash(dec!(1000)).unwrap();

        let cases = [
            ("", 1, dec!(10)),
            ("   ", 1, dec!(10)),
            ("AAPL", 0, dec!(10)),
            ("AAPL", 1, dec!(0)),
            ("AAPL", 1, dec!(-5)),
        ];
        for (symbol, quantity, price) in cases {
            let result = store.record_transaction(symbol, quantity, price, TransactionKind::Buy);
            assert!(
                matches!(result, Err(LedgerError::InvalidInput(_))),
                "{symbol:?} {quantity} {price} should be invalid, got {result:?}"
            );
        }
        assert_eq!(store.balance(), dec!(1000));
        assert!(store.list_transactions().is_empty());
        assert!(store.list_history().is_empty());
        assert_eq!(store.next_transaction_id(), 1);
    }

    #[test]
    fn rejects_buy_that_overflows_position_quantity() {
        let (_dir, mut store) = fresh_store();
        store.deposit_cash(dec!(1)).unwrap();
        let tiny = dec!(0.00000000000000000001);
        store
            .record_transaction("DUST", u64::MAX, tiny, TransactionKind::Buy)
            .unwrap();
        let balance = store.balance();

        let result = store.record_transaction("DUST", 1, tiny, TransactionKind::Buy);
        assert!(
            matches!(result, Err(LedgerError::InvalidInput(_))),
            "expected overflow rejection, got {result:?}"
        );

        assert_eq!(store.balance(), balance);
        assert_eq!(store.list_transactions().len(), 1);
        assert_eq!(store.list_history().len(), 1);
        assert_eq!(store.position("DUST").unwrap().quantity, u64::MAX);
        assert_eq!(store.next_transaction_id(), 2);
    }

    #[test]
    fn net_worth_errors_when_value_is_out_of_range() {
        let (_dir, mut store) = fresh_store();
        store.deposit_cash(dec!(1000)).unwrap();
        store
            .record_transaction("AAPL", 10, dec!(10), TransactionKind::Buy)
            .unwrap();

        let prices = BTreeMap::from([("AAPL".to_string(), Decimal::MAX)]);
        assert!(matches!(
            store.compute_net_worth(&prices),
            Err(LedgerError::InvalidInput(_))
        ));

        let prices = BTreeMap::from([("AAPL".to_string(), dec!(12))]);
        assert_eq!(store.compute_net_worth(&prices).unwrap(), dec!(1020));
    }

    #[test]
    fn rejects_non_positive_cash_movements() {
        let (_dir, mut store) = fresh_store();
        for amount in [dec!(0), dec!(-1)] {
            assert!(matches!(store.deposit_cash(amount), Err(LedgerError::InvalidInput(_))));
            assert!(matches!(store.withdraw_cash(amount), Err(LedgerError::InvalidInput(_))));
        }
        assert_eq!(store.balance(), Decimal::ZERO);
    }

    #[test]
    fn sell_keeps_average_cost() {
        let (_dir, mut store) = fresh_store();
        store.deposit_cash(dec!(10000)).unwrap();
        store.record_transaction("MSFT", 4, dec!(100), TransactionKind::Buy).unwrap();
        store.record_transaction("MSFT", 6, dec!(150), TransactionKind::Buy).unwrap();
        store.record_transaction("MSFT", 5, dec!(400), TransactionKind::Sell).unwrap();

        let position = store.position("msft").unwrap();
        assert_eq!(position.quantity, 5);
        assert_eq!(position.average_cost, dec!(130));
    }

    #[test]
    fn symbols_are_normalized() {
        let (_dir, mut store) = fresh_store();
        store.deposit_cash(dec!(100)).unwrap();
        store.record_transaction(" aapl ", 1, dec!(10), TransactionKind::Buy).unwrap();
        store.record_transaction("AAPL", 1, dec!(10), TransactionKind::Sell).unwrap();

        assert!(store.list_positions().is_empty());
        assert_eq!(store.get_transaction(1).unwrap().symbol, "AAPL");
    }

    #[test]
    fn history_limit_keeps_newest_snapshots() {
        let dir = tempdir().unwrap();
        let storage = Storage {
            history_limit: Some(2),
            ..Storage::in_dir(dir.path())
        };
        let mut store = LedgerStore::open(&storage).unwrap();
        store.deposit_cash(dec!(100)).unwrap();
        for _ in 0..3 {
            store.record_transaction("AAPL", 1, dec!(10), TransactionKind::Buy).unwrap();
        }

        let history = store.list_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].positions["AAPL"].quantity, 2);
        assert_eq!(history[1].positions["AAPL"].quantity, 3);
        assert_eq!(history[1].balance, dec!(70));
    }

    #[test]
    fn clear_transactions_restarts_ids() {
        let (_dir, mut store) = fresh_store();
        store.deposit_cash(dec!(100)).unwrap();
        store.record_transaction("AAPL", 1, dec!(10), TransactionKind::Buy).unwrap();

        store.clear(ClearScope::Transactions).unwrap();

        assert!(store.list_transactions().is_empty());
        assert_eq!(store.list_positions().len(), 1);
        assert_eq!(store.list_history().len(), 1);
        assert_eq!(store.balance(), dec!(90));
        let id = store.record_transaction("AAPL", 1, dec!(10), TransactionKind::Buy).unwrap();
        assert_eq!(id, 1);
    }
}
