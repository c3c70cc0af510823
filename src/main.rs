use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::LogLevel;
use core_types::{ClearScope, TransactionKind};
use ledger::LedgerStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

mod display;
mod logging;

/// The main entry point for the Folio portfolio ledger.
fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Errors are reported inline; the ledger rejected the request before changing anything.
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = configuration::load_config(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    let _log_guard = logging::init_tracing(&config.logging, cli.log_level)?;

    // One store for the whole process, handed explicitly to the command handler.
    let mut store = LedgerStore::open(&config.storage).with_context(|| {
        format!(
            "opening ledger in {}",
            config.storage.data_dir.display()
        )
    })?;

    let command = cli.command.name();
    let _span = tracing::info_span!("command", name = command).entered();
    tracing::debug!(dir = %config.storage.data_dir.display(), "Running command");

    execute(cli.command, &mut store).inspect_err(|e| {
        tracing::error!(error = %e, "Command failed");
    })
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A personal portfolio ledger: record trades, track cash and holdings.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, global = true, default_value = "folio.toml")]
    config: PathBuf,

    /// Directory holding the ledger documents. Overrides `storage.data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log verbosity. Overrides `RUST_LOG` and `logging.level`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a purchase, paid from the cash balance.
    Buy(TradeArgs),
    /// Record a sale of held shares, credited to the cash balance.
    Sell(TradeArgs),
    /// Add cash to the account.
    Deposit(AmountArgs),
    /// Remove cash from the account.
    Withdraw(AmountArgs),
    /// Show the current cash balance.
    Balance,
    /// List every recorded transaction.
    Transactions,
    /// Show a single transaction by id.
    Transaction {
        id: u64,
    },
    /// List current holdings with their average cost.
    Positions,
    /// List the snapshot taken after every trade.
    History,
    /// Value the portfolio at the given prices.
    NetWorth(NetWorthArgs),
    /// Delete ledger data: transactions, positions, history, or all (also zeroes the balance).
    Clear {
        scope: ClearScope,
    },
}

impl Commands {
    /// Subcommand name as typed on the command line, used to tag log lines.
    fn name(&self) -> &'static str {
        match self {
            Commands::Buy(_) => "buy",
            Commands::Sell(_) => "sell",
            Commands::Deposit(_) => "deposit",
            Commands::Withdraw(_) => "withdraw",
            Commands::Balance => "balance",
            Commands::Transactions => "transactions",
            Commands::Transaction { .. } => "transaction",
            Commands::Positions => "positions",
            Commands::History => "history",
            Commands::NetWorth(_) => "net-worth",
            Commands::Clear { .. } => "clear",
        }
    }
}

#[derive(Parser)]
struct TradeArgs {
    /// The ticker symbol (e.g., "AAPL").
    symbol: String,

    /// Number of shares.
    quantity: u64,

    /// Price per share.
    price: Decimal,
}

#[derive(Parser)]
struct AmountArgs {
    amount: Decimal,
}

#[derive(Parser)]
struct NetWorthArgs {
    /// Current price for a symbol, as SYMBOL=PRICE. Repeat for each holding.
    #[arg(long = "price", value_parser = parse_price)]
    prices: Vec<(String, Decimal)>,
}

fn parse_price(raw: &str) -> Result<(String, Decimal), String> {
    let (symbol, price) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=PRICE, got '{raw}'"))?;
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(format!("missing symbol in '{raw}'"));
    }
    let price = price
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid price in '{raw}': {e}"))?;
    Ok((symbol.to_ascii_uppercase(), price))
}

// ==============================================================================
// Command Handlers
// ==============================================================================

fn execute(command: Commands, store: &mut LedgerStore) -> anyhow::Result<()> {
    match command {
        Commands::Buy(args) => record(store, args, TransactionKind::Buy)?,
        Commands::Sell(args) => record(store, args, TransactionKind::Sell)?,
        Commands::Deposit(args) => {
            let balance = store.deposit_cash(args.amount)?;
            println!(
                "Deposited {}. New balance: {}",
                display::format_money(args.amount),
                display::format_money(balance)
            );
        }
        Commands::Withdraw(args) => {
            let balance = store.withdraw_cash(args.amount)?;
            println!(
                "Withdrew {}. New balance: {}",
                display::format_money(args.amount),
                display::format_money(balance)
            );
        }
        Commands::Balance => {
            println!("Current Balance: {}", display::format_money(store.balance()));
        }
        Commands::Transactions => {
            let transactions = store.list_transactions();
            if transactions.is_empty() {
                println!("No transactions recorded.");
            } else {
                println!("{}", display::transactions_table(&transactions));
            }
        }
        Commands::Transaction { id } => match store.get_transaction(id) {
            Some(tx) => println!("{}", display::transactions_table(std::slice::from_ref(&tx))),
            None => println!("No transaction with id {id}."),
        },
        Commands::Positions => {
            let positions = store.list_positions();
            if positions.is_empty() {
                println!("No open positions.");
            } else {
                println!("{}", display::positions_table(&positions));
            }
        }
        Commands::History => {
            let history = store.list_history();
            if history.is_empty() {
                println!("No history recorded.");
            } else {
                println!("{}", display::history_table(&history));
            }
        }
        Commands::NetWorth(args) => {
            let prices: HashMap<String, Decimal> = args.prices.into_iter().collect();
            let unpriced: Vec<String> = store
                .list_positions()
                .into_keys()
                .filter(|symbol| !prices.contains_key(symbol))
                .collect();

            let net_worth = store.compute_net_worth(&prices)?;
            println!("Net Worth: {}", display::format_money(net_worth));
            if !unpriced.is_empty() {
                println!("Excluded (no price given): {}", unpriced.join(", "));
            }
        }
        Commands::Clear { scope } => {
            store.clear(scope)?;
            match scope {
                ClearScope::All => println!("All data cleared and balance reset."),
                other => println!("Cleared {other}."),
            }
        }
    }

    Ok(())
}

fn record(store: &mut LedgerStore, args: TradeArgs, kind: TransactionKind) -> anyhow::Result<()> {
    let id = store.record_transaction(&args.symbol, args.quantity, args.price, kind)?;
    let verb = match kind {
        TransactionKind::Buy => "Bought",
        TransactionKind::Sell => "Sold",
    };
    println!(
        "{verb} {} of {} at {} each. Transaction ID: {id}",
        args.quantity,
        args.symbol.trim().to_ascii_uppercase(),
        display::format_money(args.price)
    );
    println!("Current Balance: {}", display::format_money(store.balance()));
    Ok(())
}
