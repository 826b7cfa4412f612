use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use wallet_ledger::application::Ledger;
use wallet_ledger::config::LedgerConfig;
use wallet_ledger::domain::ports::{AccountStoreRef, PaymentStoreRef};
use wallet_ledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryPaymentStore};
use wallet_ledger::infrastructure::logging;
#[cfg(feature = "storage-rocksdb")]
use wallet_ledger::infrastructure::rocksdb::RocksDBStore;
use wallet_ledger::interfaces::csv::operation_reader::OperationReader;
use wallet_ledger::interfaces::csv::report_writer::{OutputFormat, ReportWriter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file (op, account, amount, counterparty, currency)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Upper bound for acquiring account locks, in milliseconds
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 5_000)]
    lock_timeout_ms: u64,

    /// Upper bound for each store call, in milliseconds
    #[arg(long, env = "LEDGER_STORE_TIMEOUT_MS", default_value_t = 5_000)]
    store_timeout_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    output: OutputFormat,

    /// Also print the ledger: a second CSV table after a blank line, or a
    /// `payments` key next to `accounts` in JSON
    #[arg(long)]
    payments: bool,
}

fn in_memory_stores() -> (AccountStoreRef, PaymentStoreRef) {
    (
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryPaymentStore::new()),
    )
}

fn open_stores(db_path: Option<PathBuf>) -> Result<(AccountStoreRef, PaymentStoreRef)> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok((Arc::new(store.clone()), Arc::new(store)))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(in_memory_stores())
        }
        None => Ok(in_memory_stores()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let config = LedgerConfig::from_millis(cli.lock_timeout_ms, cli.store_timeout_ms).into_diagnostic()?;
    let (accounts, payments) = open_stores(cli.db_path)?;
    let ledger = Ledger::new(accounts, payments, config);

    // Apply operations in file order
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for (row, op_result) in reader.operations().enumerate() {
        match op_result {
            Ok(op) => {
                if let Err(e) = op.apply(&ledger).await {
                    eprintln!("Error processing operation {}: {}", row + 1, e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation {}: {}", row + 1, e);
            }
        }
    }

    let accounts = ledger.accounts.load_all().await.into_diagnostic()?;

    let payments = if cli.payments {
        Some(ledger.transfers.payments_all().await.into_diagnostic()?)
    } else {
        None
    };

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock(), cli.output);
    writer
        .write_report(&accounts, payments.as_deref())
        .into_diagnostic()?;

    Ok(())
}
