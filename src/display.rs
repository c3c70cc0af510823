use chrono::{DateTime, Utc};
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use core_types::{PositionTable, Snapshot, Transaction, TransactionKind};
use rust_decimal::Decimal;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Like [`format_money`], but renders an out-of-range amount as `-`.
fn format_checked_money(amount: Option<Decimal>) -> String {
    amount.map_or_else(|| "-".to_string(), format_money)
}

pub fn transactions_table(transactions: &[Transaction]) -> Table {
    let mut table = new_table(&["ID", "Symbol", "Type", "Quantity", "Price", "Total", "Timestamp"]);
    for tx in transactions {
        let kind_color = match tx.kind {
            TransactionKind::Buy => Color::Green,
            TransactionKind::Sell => Color::Red,
        };
        table.add_row(vec![
            Cell::new(tx.id),
            Cell::new(&tx.symbol),
            Cell::new(tx.kind).fg(kind_color),
            Cell::new(tx.quantity),
            Cell::new(format_money(tx.price)),
            Cell::new(format_checked_money(tx.notional())),
            Cell::new(format_timestamp(&tx.timestamp)),
        ]);
    }
    table
}

pub fn positions_table(positions: &PositionTable) -> Table {
    let mut table = new_table(&["Symbol", "Quantity", "Average Cost", "Cost Basis"]);
    for (symbol, position) in positions {
        table.add_row(vec![
            Cell::new(symbol),
            Cell::new(position.quantity),
            Cell::new(format_money(position.average_cost)),
            Cell::new(format_checked_money(position.cost_basis())),
        ]);
    }
    table
}

pub fn history_table(history: &[Snapshot]) -> Table {
    let mut table = new_table(&["#", "Timestamp", "Holdings", "Balance"]);
    for (index, snapshot) in history.iter().enumerate() {
        let holdings = if snapshot.positions.is_empty() {
            "-".to_string()
        } else {
            snapshot
                .positions
                .iter()
                .map(|(symbol, position)| format!("{symbol}: {}", position.quantity))
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(format_timestamp(&snapshot.timestamp)),
            Cell::new(holdings),
            Cell::new(format_money(snapshot.balance)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Position;
    use rust_decimal_macros::dec;

    #[test]
    fn money_is_rounded_to_cents() {
        assert_eq!(format_money(dec!(1275)), "$1275.00");
        assert_eq!(format_money(dec!(0.126)), "$0.13");
    }

    #[test]
    fn out_of_range_cost_basis_renders_placeholder() {
        let mut positions = PositionTable::new();
        positions.insert("HUGE".to_string(), Position::new(u64::MAX, Decimal::MAX));

        let rendered = positions_table(&positions).to_string();
        assert!(rendered.contains("HUGE"));
        assert!(rendered.contains(" - "));
    }

    #[test]
    fn history_rows_list_holdings() {
        let mut positions = PositionTable::new();
        positions.insert("AAPL".to_string(), Position::new(5, dec!(150)));
        positions.insert("MSFT".to_string(), Position::new(2, dec!(400)));
        let history = vec![
            Snapshot {
                timestamp: Utc::now(),
                positions: PositionTable::new(),
                balance: dec!(10),
            },
            Snapshot {
                timestamp: Utc::now(),
                positions,
                balance: dec!(1275),
            },
        ];

        let rendered = history_table(&history).to_string();
        assert!(rendered.contains("AAPL: 5, MSFT: 2"));
        assert!(rendered.contains("$1275.00"));
    }
}
