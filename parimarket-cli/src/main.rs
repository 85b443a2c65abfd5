//! # Parimarket CLI
//!
//! Command-line interface for running a parimutuel prediction market ledger
//! stored in a local JSON state file.

mod store;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bitcoin_amount::parse_btc;
use clap::{Parser, Subcommand};
use colored::*;
use parimarket_core::bitcoin::Amount;
use parimarket_core::{utils::*, AccountId, Market, MarketId, MarketStatus};
use store::{load_config, State};
use tracing::Level;

#[derive(Parser)]
#[command(name = "parimarket")]
#[command(about = "Parimutuel Bitcoin prediction market ledger")]
#[command(version)]
struct Cli {
    /// Ledger state file
    #[arg(short, long, global = true, default_value = "parimarket.json")]
    state: PathBuf,

    /// Override the current time (Unix timestamp)
    #[arg(long, global = true)]
    now: Option<u64>,

    /// Log ledger activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger state file
    Init {
        /// Platform operator public key (x-only hex)
        #[arg(short, long)]
        owner: Option<AccountId>,
        /// JSON ledger config (owner, min_stake, platform_fee_percent)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Create a new prediction market
    Create {
        /// Creator public key
        #[arg(long)]
        caller: AccountId,
        /// Market question
        #[arg(short, long)]
        question: String,
        /// Outcome label (repeat for each outcome, at least two)
        #[arg(short, long = "outcome", required = true)]
        outcomes: Vec<String>,
        /// Seconds until betting closes
        #[arg(short, long)]
        duration: u64,
    },
    /// Stake on an outcome
    Bet {
        /// Bettor public key
        #[arg(long)]
        caller: AccountId,
        /// Market ID
        #[arg(short, long)]
        market: u64,
        /// Outcome index
        #[arg(short, long)]
        outcome: usize,
        /// Amount in BTC
        #[arg(short, long, value_parser = parse_btc)]
        amount: Amount,
    },
    /// Resolve a market (creator only)
    Resolve {
        /// Creator public key
        #[arg(long)]
        caller: AccountId,
        /// Market ID
        #[arg(short, long)]
        market: u64,
        /// Winning outcome index
        #[arg(short, long)]
        outcome: usize,
    },
    /// Claim winnings from a resolved market
    Claim {
        /// Claimant public key
        #[arg(long)]
        caller: AccountId,
        /// Market ID
        #[arg(short, long)]
        market: u64,
    },
    /// Sweep the ledger balance to the owner
    WithdrawFees {
        /// Owner public key
        #[arg(long)]
        caller: AccountId,
    },
    /// Show market information
    Market {
        /// Market ID
        market_id: u64,
    },
    /// List all markets
    Markets,
    /// Show a user's stake on one outcome
    Stake {
        #[arg(short, long)]
        market: u64,
        #[arg(short, long)]
        outcome: usize,
        #[arg(short, long)]
        user: AccountId,
    },
    /// Show a user's bet history
    History {
        #[arg(short, long)]
        user: AccountId,
        #[arg(long, default_value = "0")]
        offset: usize,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show the ledger balance, or the payouts credited to a user
    Balance {
        #[arg(short, long)]
        user: Option<AccountId>,
    },
    /// Print and clear pending ledger events as JSON lines
    Events,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let now = cli
        .now
        .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);

    if let Commands::Init {
        owner,
        config,
        force,
    } = &cli.command
    {
        return init(&cli.state, owner.clone(), config.as_deref(), *force).await;
    }

    execute(&cli.state, cli.command, now).await
}

/// Load the state file, run one command and save only if the ledger changed.
/// A failed command leaves the file untouched.
async fn execute(path: &Path, command: Commands, now: u64) -> Result<()> {
    let mut state = State::load(path).await?;
    if run(&mut state, command, now)? {
        state.save(path).await?;
    }
    Ok(())
}

async fn init(
    path: &Path,
    owner: Option<AccountId>,
    config: Option<&Path>,
    force: bool,
) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "State file {} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let config = match (config, owner) {
        (Some(file), None) => load_config(file).await?,
        (Some(file), Some(owner)) => {
            let mut config = load_config(file).await?;
            config.owner = owner;
            config
        }
        (None, Some(owner)) => parimarket_core::LedgerConfig::new(owner),
        (None, None) => bail!("Either --owner or --config is required"),
    };

    let state = State::new(config)?;
    state.save(path).await?;

    println!("{}", "Ledger initialized".green().bold());
    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "State File".yellow().bold(), path.display());
    println!("{}: {}", "Owner".yellow().bold(), state.ledger.owner());
    println!(
        "{}: {}",
        "Minimum Stake".yellow().bold(),
        format_btc(state.ledger.config().min_stake)
    );
    println!(
        "{}: {}%",
        "Platform Fee".yellow().bold(),
        state.ledger.config().platform_fee_percent
    );
    Ok(())
}

/// Execute one command; returns whether the state changed.
fn run(state: &mut State, command: Commands, now: u64) -> Result<bool> {
    match command {
        Commands::Init { .. } => bail!("init does not operate on an existing ledger"),

        Commands::Create {
            caller,
            question,
            outcomes,
            duration,
        } => {
            let market_id = state
                .ledger
                .create_market(&caller, &question, outcomes, duration, now)?;
            println!("{}", "Market Created Successfully!".green().bold());
            print_market(state.ledger.market(market_id)?, now);
            Ok(true)
        }

        Commands::Bet {
            caller,
            market,
            outcome,
            amount,
        } => {
            state
                .ledger
                .place_bet(&caller, MarketId(market), outcome, amount, now)?;
            let label = &state.ledger.market(MarketId(market))?.outcomes()[outcome];
            println!(
                "{}: {} on '{}' in market {}",
                "Bet Placed".green().bold(),
                format_btc(amount.to_sat()).cyan(),
                label,
                MarketId(market)
            );
            Ok(true)
        }

        Commands::Resolve {
            caller,
            market,
            outcome,
        } => {
            state
                .ledger
                .resolve(&caller, MarketId(market), outcome, now)?;
            println!("{}", "Market Resolved".green().bold());
            print_market(state.ledger.market(MarketId(market))?, now);
            Ok(true)
        }

        Commands::Claim { caller, market } => {
            let winnings = state
                .ledger
                .claim(&caller, MarketId(market), &mut state.book)?;
            println!(
                "{}: {} from market {}",
                "Winnings Claimed".green().bold(),
                format_btc(winnings.to_sat()).cyan(),
                MarketId(market)
            );
            Ok(true)
        }

        Commands::WithdrawFees { caller } => {
            let amount = state.ledger.withdraw_fees(&caller, &mut state.book)?;
            println!(
                "{}: {}",
                "Fees Withdrawn".green().bold(),
                format_btc(amount.to_sat()).cyan()
            );
            Ok(amount.to_sat() > 0)
        }

        Commands::Market { market_id } => {
            print_market(state.ledger.market(MarketId(market_id))?, now);
            Ok(false)
        }

        Commands::Markets => {
            if state.ledger.market_count() == 0 {
                println!("{}", "No markets yet.".bright_black());
            }
            for market in state.ledger.markets() {
                println!(
                    "{} {} [{}] pool {}",
                    market.id().to_string().yellow().bold(),
                    market.question(),
                    status_label(market.status(now)),
                    format_btc(market.total_pool())
                );
            }
            Ok(false)
        }

        Commands::Stake {
            market,
            outcome,
            user,
        } => {
            let stake = state.ledger.user_stake(MarketId(market), outcome, &user)?;
            println!(
                "{}: {}",
                "Stake".yellow().bold(),
                format_btc(stake.to_sat()).cyan()
            );
            Ok(false)
        }

        Commands::History {
            user,
            offset,
            limit,
        } => {
            let page = state.ledger.user_history_page(&user, offset, limit);
            let total = state.ledger.user_history(&user).len();
            println!(
                "{} ({}-{} of {})",
                format!("Bet history of {}", user.short()).green().bold(),
                offset.min(total),
                offset.min(total) + page.len(),
                total
            );
            for entry in page {
                println!(
                    "  market {} outcome {} {} at {}",
                    entry.market_id,
                    entry.outcome,
                    format_btc(entry.amount).cyan(),
                    format_timestamp(entry.placed_at)
                );
            }
            Ok(false)
        }

        Commands::Balance { user } => {
            match user {
                Some(user) => println!(
                    "{}: {}",
                    format!("Credited to {}", user.short()).yellow().bold(),
                    format_btc(state.book.credited(&user).to_sat()).cyan()
                ),
                None => println!(
                    "{}: {}",
                    "Ledger Balance".yellow().bold(),
                    format_btc(state.ledger.balance().to_sat()).cyan()
                ),
            }
            Ok(false)
        }

        Commands::Events => {
            let events = state.ledger.drain_events();
            for event in &events {
                let mut line = serde_json::to_value(event).context("Failed to encode event")?;
                line["id"] = serde_json::Value::String(event.id()?);
                println!("{line}");
            }
            Ok(!events.is_empty())
        }
    }
}

fn print_market(market: &Market, now: u64) {
    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Market ID".yellow().bold(), market.id());
    println!("{}: {}", "Question".yellow().bold(), market.question());
    println!("{}: {}", "Creator".yellow().bold(), market.creator());
    println!(
        "{}: {}",
        "Betting Closes".yellow().bold(),
        format_timestamp(market.end_time())
    );
    let odds = market.odds();
    for (index, label) in market.outcomes().iter().enumerate() {
        let marker = if market.winning_option() == Some(index) {
            " (winner)".green().bold().to_string()
        } else {
            String::new()
        };
        let odds = odds[index]
            .map(|o| format!("{o:.2}x"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] {}: {} odds {}{}",
            index,
            label,
            format_btc(market.option_totals()[index]),
            odds,
            marker
        );
    }
    println!(
        "{}: {}",
        "Total Pool".cyan().bold(),
        format_btc(market.total_pool())
    );
    println!(
        "{}: {}",
        "Status".yellow().bold(),
        status_label(market.status(now))
    );
    println!("{}", "═".repeat(50).bright_black());
}

fn status_label(status: MarketStatus) -> ColoredString {
    match status {
        MarketStatus::Open => "Active - Accepting bets".green(),
        MarketStatus::AwaitingResolution => "Awaiting resolution".yellow(),
        MarketStatus::Resolved => "Resolved".bright_blue(),
    }
}

mod bitcoin_amount {
    use parimarket_core::bitcoin::{amount::Denomination, Amount};

    /// Parse a BTC amount such as `0.01` without going through floats
    pub fn parse_btc(s: &str) -> Result<Amount, String> {
        Amount::from_str_in(s.trim(), Denomination::Bitcoin).map_err(|e| e.to_string())
    }

}
