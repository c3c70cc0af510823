use crate::error::LedgerError;
use configuration::Storage;
use core_types::{PositionTable, Snapshot, Transaction};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The four documents the ledger is persisted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Transactions,
    Positions,
    History,
    Balance,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Transactions => "transactions",
            Table::Positions => "positions",
            Table::History => "history",
            Table::Balance => "balance",
        };
        f.write_str(name)
    }
}

/// On-disk shape of the transactions document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    /// Id handed to the next recorded transaction.
    pub next_id: u64,
    pub transactions: Vec<Transaction>,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self {
            next_id: 1,
            transactions: Vec::new(),
        }
    }
}

/// On-disk shape of the balance document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDocument {
    pub balance: Decimal,
}

/// Borrowed view of every table, written together by [`JsonStore::commit`].
#[derive(Debug, Clone, Copy)]
pub struct LedgerTables<'a> {
    pub log: &'a TransactionLog,
    pub positions: &'a PositionTable,
    pub history: &'a [Snapshot],
    pub balance: Decimal,
}

/// Reads and writes the ledger documents. Holds paths only; the tables
/// themselves are owned by the caller.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
    transactions: PathBuf,
    positions: PathBuf,
    history: PathBuf,
    balance: PathBuf,
}

impl JsonStore {
    pub fn new(storage: &Storage) -> Self {
        Self {
            data_dir: storage.data_dir.clone(),
            transactions: storage.transactions_path(),
            positions: storage.positions_path(),
            history: storage.history_path(),
            balance: storage.balance_path(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, table: Table) -> &Path {
        match table {
            Table::Transactions => &self.transactions,
            Table::Positions => &self.positions,
            Table::History => &self.history,
            Table::Balance => &self.balance,
        }
    }

    pub fn read_transactions(&self) -> Result<TransactionLog, LedgerError> {
        self.read(Table::Transactions)
    }

    pub fn read_positions(&self) -> Result<PositionTable, LedgerError> {
        self.read(Table::Positions)
    }

    pub fn read_history(&self) -> Result<Vec<Snapshot>, LedgerError> {
        self.read(Table::History)
    }

    pub fn read_balance(&self) -> Result<Decimal, LedgerError> {
        self.read::<BalanceDocument>(Table::Balance)
            .map(|doc| doc.balance)
    }

    pub fn write_transactions(&self, log: &TransactionLog) -> Result<(), LedgerError> {
        self.write(Table::Transactions, log)
    }

    pub fn write_positions(&self, positions: &PositionTable) -> Result<(), LedgerError> {
        self.write(Table::Positions, positions)
    }

    pub fn write_history(&self, history: &[Snapshot]) -> Result<(), LedgerError> {
        self.write(Table::History, history)
    }

    pub fn write_balance(&self, balance: Decimal) -> Result<(), LedgerError> {
        self.write(Table::Balance, &BalanceDocument { balance })
    }

    /// Rewrites all four documents.
    ///
    /// Every document is staged to a temporary file before any of them is
    /// renamed into place, so an encoding or I/O failure while staging leaves
    /// the previous documents untouched. The renames are not coupled: a crash
    /// between two of them leaves a mix of old and new documents.
    pub fn commit(&self, tables: LedgerTables<'_>) -> Result<(), LedgerError> {
        let mut staged = Vec::with_capacity(4);
        if let Err(err) = self.stage_all(tables, &mut staged) {
            for (_, tmp) in &staged {
                let _ = fs::remove_file(tmp);
            }
            return Err(err);
        }

        for (table, tmp) in staged {
            fs::rename(&tmp, self.path(table))?;
        }
        tracing::debug!(dir = %self.data_dir.display(), "Committed ledger documents");
        Ok(())
    }

    fn stage_all(
        &self,
        tables: LedgerTables<'_>,
        staged: &mut Vec<(Table, PathBuf)>,
    ) -> Result<(), LedgerError> {
        staged.push((Table::Transactions, self.stage(Table::Transactions, tables.log)?));
        staged.push((Table::Positions, self.stage(Table::Positions, tables.positions)?));
        staged.push((Table::History, self.stage(Table::History, tables.history)?));
        let balance = BalanceDocument {
            balance: tables.balance,
        };
        staged.push((Table::Balance, self.stage(Table::Balance, &balance)?));
        Ok(())
    }

    /// Loads one document. A missing file is a fresh ledger, not an error.
    fn read<T: DeserializeOwned + Default>(&self, table: Table) -> Result<T, LedgerError> {
        let path = self.path(table);
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(%table, path = %path.display(), "No document yet, starting empty");
                return Ok(T::default());
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&contents).map_err(|source| LedgerError::PersistenceCorrupt {
            table,
            path: path.to_path_buf(),
            source,
        })
    }

    fn write<T: Serialize + ?Sized>(&self, table: Table, value: &T) -> Result<(), LedgerError> {
        let tmp = self.stage(table, value)?;
        fs::rename(&tmp, self.path(table))?;
        tracing::debug!(%table, "Wrote ledger document");
        Ok(())
    }

    /// Serializes `value` next to its target and flushes it to disk.
    fn stage<T: Serialize + ?Sized>(&self, table: Table, value: &T) -> Result<PathBuf, LedgerError> {
        fs::create_dir_all(&self.data_dir)?;
        let tmp = staging_path(self.path(table));
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|err| {
            if err.is_io() {
                LedgerError::Io(err.into())
            } else {
                LedgerError::Serialization(err)
            }
        })?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(tmp)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Position;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn missing_documents_read_as_defaults() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(&Storage::in_dir(dir.path().join("ledger")));

        assert_eq!(store.read_transactions().unwrap(), TransactionLog::default());
        assert!(store.read_positions().unwrap().is_empty());
        assert!(store.read_history().unwrap().is_empty());
        assert_eq!(store.read_balance().unwrap(), Decimal::ZERO);
        assert!(!store.data_dir().exists());
    }

    #[test]
    fn write_creates_directory_and_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(&Storage::in_dir(dir.path().join("nested").join("ledger")));

        store.write_balance(dec!(1275.0)).unwrap();

        assert_eq!(store.read_balance().unwrap(), dec!(1275.0));
        let names: Vec<_> = fs::read_dir(store.data_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["balance.json".to_string()]);
    }

    #[test]
    fn positions_document_is_keyed_by_symbol() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(&Storage::in_dir(dir.path()));
        let mut positions = PositionTable::new();
        positions.insert("AAPL".to_string(), Position::new(5, dec!(150.0)));

        store.write_positions(&positions).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path(Table::Positions)).unwrap()).unwrap();
        assert_eq!(raw["AAPL"]["quantity"], 5);
        assert_eq!(raw["AAPL"]["average_cost"], "150.0");
    }

    #[test]
    fn malformed_document_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(&Storage::in_dir(dir.path()));
        fs::write(store.path(Table::Balance), "{ \"balance\": ").unwrap();
        fs::write(store.path(Table::Transactions), "[1, 2, 3]").unwrap();

        match store.read_balance() {
            Err(LedgerError::PersistenceCorrupt { table, .. }) => assert_eq!(table, Table::Balance),
            other => panic!("expected corrupt balance document, got {other:?}"),
        }
        assert!(matches!(
            store.read_transactions(),
            Err(LedgerError::PersistenceCorrupt {
                table: Table::Transactions,
                ..
            })
        ));
    }

    #[test]
    fn commit_writes_all_four_documents() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(&Storage::in_dir(dir.path()));
        let log = TransactionLog {
            next_id: 7,
            transactions: Vec::new(),
        };
        let positions = PositionTable::new();

        store
            .commit(LedgerTables {
                log: &log,
                positions: &positions,
                history: &[],
                balance: dec!(42),
            })
            .unwrap();

        assert_eq!(store.read_transactions().unwrap().next_id, 7);
        assert!(store.read_positions().unwrap().is_empty());
        assert!(store.read_history().unwrap().is_empty());
        assert_eq!(store.read_balance().unwrap(), dec!(42));
        for table in [Table::Transactions, Table::Positions, Table::History, Table::Balance] {
            assert!(!staging_path(store.path(table)).exists());
        }
    }
}
