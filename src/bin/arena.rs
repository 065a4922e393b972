//! Arena CLI: run bot-vs-bot column auction experiments from the command line.
//!
//! Usage:
//!   cargo run --release --bin arena -- --games 200 --bot greedy --bot random
//!   cargo run --release --bin arena -- --games 50 --bot cautious --bot greedy --bot random --tie-policy void

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use column_auction::engine::arena::run_arena;
use column_auction::engine::bot_profiles::{load_default_profiles, load_profiles};
use column_auction::engine::bot_strategy::BotStrategy;
use column_auction::games::auction::cards::SessionContext;
use column_auction::games::auction::plugin::AuctionPlugin;
use column_auction::games::auction::rules::{load_default_rules, load_rules, TiePolicy};

#[derive(Parser)]
#[command(name = "arena", about = "Run bot-vs-bot arena experiments for the column auction")]
struct Cli {
    /// Number of games to play
    #[arg(long, default_value = "100")]
    games: usize,

    /// Random seed of the first game
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Rotate seats between games
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    alternate_seats: bool,

    /// One seat per occurrence: a profile name or a built-in (`greedy`, `random`)
    #[arg(long = "bot", default_values_t = vec!["greedy".to_string(), "random".to_string()])]
    bots: Vec<String>,

    /// Path to bot_profiles.toml (default: auto-discover)
    #[arg(long, env = "COLUMN_AUCTION_BOT_PROFILES")]
    profiles: Option<PathBuf>,

    /// Path to rules.toml (default: auto-discover)
    #[arg(long, env = "COLUMN_AUCTION_RULES")]
    rules: Option<PathBuf>,

    /// Override the rules' tie policy
    #[arg(long, value_parser = parse_tie_policy)]
    tie_policy: Option<TiePolicy>,
}

fn parse_tie_policy(s: &str) -> Result<TiePolicy, String> {
    match s {
        "cascade" => Ok(TiePolicy::Cascade),
        "void" => Ok(TiePolicy::Void),
        other => Err(format!("unknown tie policy '{}' (cascade or void)", other)),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let profiles = match &cli.profiles {
        Some(path) => load_profiles(path).unwrap_or_else(|e| {
            eprintln!("Error loading profiles: {}", e);
            std::process::exit(1);
        }),
        None => load_default_profiles(),
    };
    let mut rules = match &cli.rules {
        Some(path) => load_rules(path).unwrap_or_else(|e| {
            eprintln!("Error loading rules: {}", e);
            std::process::exit(1);
        }),
        None => load_default_rules(),
    };
    if let Some(policy) = cli.tie_policy {
        rules.tie_policy = policy;
    }

    if !(2..=5).contains(&cli.bots.len()) {
        eprintln!("Error: the arena needs 2 to 5 bots, got {}", cli.bots.len());
        std::process::exit(1);
    }

    // Seat labels stay unique even when the same bot plays twice.
    let mut strategies: HashMap<String, Box<dyn BotStrategy<AuctionPlugin>>> = HashMap::new();
    for (i, name) in cli.bots.iter().enumerate() {
        let strategy = profiles.strategy(name).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available profiles: {:?}", profiles.profiles.keys().collect::<Vec<_>>());
            std::process::exit(1);
        });
        strategies.insert(format!("{}:{}", i + 1, name), strategy);
    }

    eprintln!(
        "Arena: {} games, seed={}, alternate_seats={}, bots={:?}, tie_policy={:?}",
        cli.games, cli.seed, cli.alternate_seats, cli.bots, rules.tie_policy
    );

    let total = cli.games;
    let progress_cb = move |done: usize, _total: usize| {
        eprint!("\r  [{}/{}] games completed", done, total);
    };

    let plugin = AuctionPlugin::new(SessionContext::standard());
    let result = run_arena(
        &plugin,
        &strategies,
        cli.games,
        cli.seed,
        Some(rules.to_options()),
        cli.alternate_seats,
        Some(&progress_cb),
    );

    eprintln!("\r                                    ");
    println!("{}", result.summary());
}
