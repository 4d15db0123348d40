//! Binary entry point for the tabledown administrative CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tabledown::{Batch, Config, KeyBounds, RangeQuery, Store, StoreError};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tabledown",
    version,
    about = "Administrative CLI for tabledown key-value tables",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    open: OpenArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct OpenArgs {
    #[arg(
        long,
        env = "TABLEDOWN_DB",
        value_name = "FILE",
        help = "SQLite database file (omit for an in-memory store)"
    )]
    db: Option<PathBuf>,

    #[arg(
        long,
        env = "TABLEDOWN_TABLE",
        default_value = "kv",
        help = "Backing table name"
    )]
    table: String,

    #[arg(long, default_value_t = 100, help = "Rows per cursor round-trip")]
    fetch_batch: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value stored under a key.
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Store a value under a key.
    Put {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Remove a key.
    Del {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List records in key order.
    Scan {
        #[arg(long, help = "Exclusive lower bound")]
        gt: Option<String>,
        #[arg(long, help = "Inclusive lower bound")]
        gte: Option<String>,
        #[arg(long, help = "Exclusive upper bound")]
        lt: Option<String>,
        #[arg(long, help = "Inclusive upper bound")]
        lte: Option<String>,
        #[arg(long, help = "Descending key order")]
        reverse: bool,
        #[arg(long, help = "Maximum records to print")]
        limit: Option<u64>,
    },
    /// Report the stored byte total for a key range.
    Stat {
        #[arg(value_name = "START")]
        start: String,
        #[arg(value_name = "END")]
        end: String,
    },
    /// Drop the backing table.
    Drop,
}

fn printable(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("0x{}", hex::encode(bytes)),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::new(cli.open.table).fetch_batch(cli.open.fetch_batch);
    if let Some(db) = cli.open.db {
        config = config.database(db);
    }
    let store = Store::open(config)?;

    match cli.command {
        Command::Get { key } => match store.get(key.as_bytes()) {
            Ok(value) => println!("{}", printable(&value)),
            Err(StoreError::NotFound) => {
                eprintln!("not found: {key}");
                store.close()?;
                std::process::exit(1);
            }
            Err(err) => return Err(err.into()),
        },
        Command::Put { key, value } => {
            store.put(key.as_bytes(), value.as_bytes())?;
        }
        Command::Del { key } => {
            let mut batch = Batch::new();
            batch.delete(key.as_bytes());
            store.batch(&batch)?;
        }
        Command::Scan {
            gt,
            gte,
            lt,
            lte,
            reverse,
            limit,
        } => {
            let mut bounds = KeyBounds::new();
            if let Some(key) = gt {
                bounds = bounds.gt(key.into_bytes());
            }
            if let Some(key) = gte {
                bounds = bounds.gte(key.into_bytes());
            }
            if let Some(key) = lt {
                bounds = bounds.lt(key.into_bytes());
            }
            if let Some(key) = lte {
                bounds = bounds.lte(key.into_bytes());
            }
            let mut query = RangeQuery::bounds(bounds).reverse(reverse);
            if let Some(n) = limit {
                query = query.limit(n);
            }
            let mut iter = store.iter(query)?;
            while let Some((key, value)) = iter.next_entry()? {
                println!("{}\t{}", printable(&key), printable(&value));
            }
        }
        Command::Stat { start, end } => {
            let size = store.approximate_size(start.as_bytes(), end.as_bytes())?;
            println!("{size}");
        }
        Command::Drop => {
            store.drop_table()?;
        }
    }

    store.close()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    run(Cli::parse())
}
