use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tradingbook::presentation::{render_json, render_table};
use tradingbook::{Config, CsvLedger, Decimal, LotId, Recorded, SplitPart, TradeBook};

#[derive(Parser)]
#[command(name = "tradingbook")]
#[command(about = "Lot-based trade ledger", long_about = None)]
struct Cli {
    /// Ledger CSV file (overrides LEDGER_PATH)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new lot
    Add {
        ticker: String,
        quantity: Decimal,
        price: Decimal,
        stop: Decimal,
        note: Option<String>,
        /// Trade date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Sell part of a lot
    Trim {
        ticker: String,
        quantity: Decimal,
        #[arg(long)]
        price: Decimal,
        /// Lot id; may be omitted when the ticker has a single open lot
        #[arg(long)]
        id: Option<u64>,
        note: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Sell everything a lot still holds
    Close {
        ticker: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        id: Option<u64>,
        note: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Move a lot's stop
    Stop {
        ticker: String,
        new_stop: Decimal,
        #[arg(long)]
        id: Option<u64>,
        note: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Divide a lot into new lots with their own stops
    Split {
        ticker: String,
        /// QTY@STOP, repeat once per resulting lot
        #[arg(long = "part", required = true)]
        parts: Vec<SplitPart>,
        #[arg(long)]
        id: Option<u64>,
        note: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print open positions and realized P/L
    Report {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()
        .context("load configuration")?
        .with_ledger_path(cli.ledger);

    let ledger = CsvLedger::new(&config.ledger_path);
    let mut book = TradeBook::new(ledger, config.match_policy);

    match cli.cmd {
        Commands::Add {
            ticker,
            quantity,
            price,
            stop,
            note,
            date,
        } => {
            let recorded = book.open(
                &ticker,
                quantity,
                price,
                stop,
                note.as_deref().unwrap_or(""),
                date_or_today(date),
            )?;
            for lot_id in &recorded.lot_ids {
                println!("Added lot {} for {}", lot_id, recorded.event.ticker);
            }
        }

        Commands::Trim {
            ticker,
            quantity,
            price,
            id,
            note,
            date,
        } => {
            let recorded = book.trim(
                &ticker,
                quantity,
                price,
                id.map(LotId::new),
                note.as_deref().unwrap_or(""),
                date_or_today(date),
            )?;
            print_realized("Trimmed", &recorded);
        }

        Commands::Close {
            ticker,
            price,
            id,
            note,
            date,
        } => {
            let recorded = book.close(
                &ticker,
                price,
                id.map(LotId::new),
                note.as_deref().unwrap_or(""),
                date_or_today(date),
            )?;
            print_realized("Closed", &recorded);
        }

        Commands::Stop {
            ticker,
            new_stop,
            id,
            note,
            date,
        } => {
            let recorded = book.stop(
                &ticker,
                new_stop,
                id.map(LotId::new),
                note.as_deref().unwrap_or(""),
                date_or_today(date),
            )?;
            for lot_id in &recorded.lot_ids {
                println!(
                    "Stop for {} lot {} moved to {}",
                    recorded.event.ticker, lot_id, new_stop
                );
            }
        }

        Commands::Split {
            ticker,
            parts,
            id,
            note,
            date,
        } => {
            let recorded = book.split(
                &ticker,
                parts,
                id.map(LotId::new),
                note.as_deref().unwrap_or(""),
                date_or_today(date),
            )?;
            let ids: Vec<String> = recorded.lot_ids.iter().map(|id| id.to_string()).collect();
            println!(
                "Split {} lot {} into lots {}",
                recorded.event.ticker,
                recorded
                    .event
                    .target
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                ids.join(", ")
            );
        }

        Commands::Report { json } => {
            let report = book.report()?;
            if json {
                println!("{}", render_json(&report).context("serialize report")?);
            } else {
                println!("{}", render_table(&report));
            }
        }
    }

    Ok(())
}

fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

fn print_realized(verb: &str, recorded: &Recorded) {
    let ticker = &recorded.event.ticker;
    for lot_id in &recorded.lot_ids {
        let realized = recorded
            .outcome
            .store
            .get(ticker, *lot_id)
            .map(|lot| lot.realized_pnl)
            .unwrap_or_default();
        println!(
            "{} {} lot {}, lot realized P/L {}",
            verb,
            ticker,
            lot_id,
            realized.round_dp(2).inner()
        );
    }
}
