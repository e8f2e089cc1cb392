//! Stockwatch command line
//!
//! ```bash
//! FINNHUB_API_KEY=... stockwatch list
//! stockwatch search "apple"
//! stockwatch add AAPL "Apple Inc."
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use stockwatch_lib::models::{SearchResult, Symbol};
use stockwatch_lib::providers::types::NewsType;
use stockwatch_lib::services::{RowState, RowViewModel, SearchResultsConsumer};
use stockwatch_lib::AppState;
use tokio::sync::mpsc;

const DEFAULT_DATA_DIR: &str = "./stockwatch-data";

#[derive(Debug, Parser)]
#[command(name = "stockwatch", version, about = "Stock watchlist with candles, metrics and search")]
struct Cli {
    /// Data directory (defaults to $STOCKWATCH_DATA_DIR or ./stockwatch-data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch and print the watchlist rows
    List,
    /// Print rows again every time the watchlist changes
    Watch,
    /// Search symbols by ticker or company name
    Search { query: String },
    /// Add a symbol to the watchlist
    Add {
        symbol: String,
        /// Display name, defaults to the symbol
        name: Option<String>,
    },
    /// Remove a symbol from the watchlist
    Remove { symbol: String },
    /// Chart and key metrics for one symbol
    Detail { symbol: String },
    /// Top stories, or company news with --symbol
    News {
        #[arg(long)]
        symbol: Option<String>,
    },
}

struct ChannelConsumer(mpsc::UnboundedSender<Vec<SearchResult>>);

impl SearchResultsConsumer for ChannelConsumer {
    fn update_results(&self, results: Vec<SearchResult>) {
        let _ = self.0.send(results);
    }
}

fn print_rows(rows: &[RowViewModel]) {
    for row in rows {
        println!(
            "{:<8} {:<28} {:>12} {:>9}  ({} points)",
            row.symbol,
            row.company_name,
            row.latest_price_text,
            row.change_percent_text,
            row.sparkline_series.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    stockwatch_lib::init_tracing();
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var_os("STOCKWATCH_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let api_key = std::env::var("FINNHUB_API_KEY").context("FINNHUB_API_KEY must be set")?;

    let state = AppState::new(data_dir, &api_key).context("failed to initialize")?;

    match cli.command {
        Command::List => {
            state.refresher.refresh().await?;
            let entries = state.watchlist.list()?;
            for status in state.projector.project_with_status(&entries, &state.time_series) {
                match status.state {
                    RowState::Ready(row) => print_rows(std::slice::from_ref(&row)),
                    RowState::Failed(kind) => {
                        println!("{:<8} {:<28} {}", status.entry.symbol, status.entry.company_name, kind.code())
                    }
                    RowState::Loading => {}
                }
            }
        }
        Command::Watch => {
            let mut rows = state.refresher.rows();
            let task = Arc::clone(&state.refresher).start();
            loop {
                tokio::select! {
                    changed = rows.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        print_rows(&rows.borrow_and_update());
                        println!();
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            task.abort();
        }
        Command::Search { query } => {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let debouncer = state.search_debouncer(Arc::new(ChannelConsumer(tx)))?;
            debouncer.on_query_changed(&query);

            let results = rx.recv().await.unwrap_or_default();
            for hit in results {
                println!("{:<12} {:<40} {}", hit.display_symbol, hit.description, hit.kind);
            }
        }
        Command::Add { symbol, name } => {
            let name = name.unwrap_or_else(|| symbol.trim().to_uppercase());
            if state.watchlist.add(&symbol, &name)? {
                println!("Added {}", symbol.trim().to_uppercase());
            } else {
                println!("{} is already on the watchlist", symbol.trim().to_uppercase());
            }
        }
        Command::Remove { symbol } => {
            if state.watchlist.remove(&symbol)? {
                println!("Removed {}", symbol.trim().to_uppercase());
            } else {
                println!("{} is not on the watchlist", symbol.trim().to_uppercase());
            }
        }
        Command::Detail { symbol } => {
            let symbol = Symbol::parse(&symbol)?;
            let name = state
                .watchlist
                .list()?
                .into_iter()
                .find(|e| e.symbol == symbol)
                .map(|e| e.company_name)
                .unwrap_or_else(|| symbol.to_string());

            let detail = state.details.detail(&symbol, &name).await;
            println!("{} - {}", detail.symbol, detail.company_name);
            if let Some(chart) = &detail.chart {
                println!("{} points, trend {:?}", chart.data.len(), chart.fill);
            }
            for metric in &detail.metric_rows {
                println!("{:<12} {}", metric.name, metric.value);
            }
        }
        Command::News { symbol } => {
            let news_type = match symbol {
                Some(symbol) => NewsType::Company(Symbol::parse(&symbol)?),
                None => NewsType::TopStories,
            };
            println!("{}", news_type.title());
            for story in state.details.news(&news_type).await {
                println!("- {} ({})\n  {}", story.headline, story.source, story.url);
            }
        }
    }

    Ok(())
}
