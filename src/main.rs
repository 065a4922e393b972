use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use column_auction::engine::bot_profiles::{load_default_profiles, load_profiles};
use column_auction::engine::bot_strategy::BotStrategy;
use column_auction::engine::models::{GameConfig, Player};
use column_auction::engine::plugin::action_from_payload;
use column_auction::games::auction::cards::SessionContext;
use column_auction::games::auction::plugin::AuctionPlugin;
use column_auction::games::auction::rules::{load_default_rules, load_rules, RulesConfig};
use column_auction::games::auction::scenario::{FileStore, MemoryStore, ScenarioStore};
use column_auction::games::auction::session::GameSession;

#[derive(Parser)]
#[command(name = "column-auction", about = "Play one seeded column auction game between bots")]
struct Cli {
    /// Number of seats
    #[arg(short = 'n', long, default_value = "3", env = "COLUMN_AUCTION_PLAYERS")]
    players: usize,

    /// Random seed for the deal and the bots
    #[arg(long, default_value = "42", env = "COLUMN_AUCTION_SEED")]
    seed: u64,

    /// Bot profile or built-in strategy for every seat
    #[arg(long, default_value = "greedy")]
    bot: String,

    /// Path to rules.toml (default: auto-discover)
    #[arg(long, env = "COLUMN_AUCTION_RULES")]
    rules: Option<PathBuf>,

    /// Path to bot_profiles.toml (default: auto-discover)
    #[arg(long, env = "COLUMN_AUCTION_BOT_PROFILES")]
    profiles: Option<PathBuf>,

    /// Save the scenario to this file at the start of every turn
    #[arg(long)]
    save: Option<PathBuf>,

    /// Continue the scenario saved in this file instead of dealing a new game
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Print the final spectator view as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let rules = match &cli.rules {
        Some(path) => load_rules(path)?,
        None => load_default_rules(),
    };
    let profiles = match &cli.profiles {
        Some(path) => load_profiles(path)?,
        None => load_default_profiles(),
    };
    let bot = profiles.strategy(&cli.bot)?;

    match &cli.save {
        Some(path) => play(&cli, &rules, bot.as_ref(), FileStore::new(path)),
        None => play(&cli, &rules, bot.as_ref(), MemoryStore::default()),
    }
}

fn play<S: ScenarioStore>(
    cli: &Cli,
    rules: &RulesConfig,
    bot: &dyn BotStrategy<AuctionPlugin>,
    store: S,
) -> Result<(), Box<dyn Error>> {
    let (mut session, _) = match &cli.resume {
        Some(path) => {
            let scenario = FileStore::new(path)
                .load()?
                .ok_or_else(|| format!("no scenario saved at {}", path.display()))?;
            GameSession::resume(SessionContext::standard(), &scenario, store)?
        }
        None => {
            let players: Vec<Player> = (0..cli.players).map(|i| Player::bot(i, &cli.bot)).collect();
            let config = GameConfig {
                options: rules.to_options(),
                random_seed: Some(cli.seed),
            };
            GameSession::start(SessionContext::standard(), players, &config, store)?
        }
    };

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut decisions = 0usize;
    while session.game_over().is_none() {
        let Some(pid) = session.phase().acting_player().map(str::to_string) else {
            return Err(format!("game stalled in phase {}", session.phase().name).into());
        };
        let payload = bot.choose_action(session.state(), session.phase(), &pid, session.plugin(), &mut rng);
        session.submit(&action_from_payload(&pid, payload))?;
        decisions += 1;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&session.view(None))?);
    } else if let Some(result) = session.game_over() {
        println!(
            "Game over after {} rounds ({} decisions): {}",
            session.state().round,
            decisions,
            result.reason
        );
        let mut scores: Vec<_> = result.final_scores.iter().collect();
        scores.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (pid, score) in scores {
            let marker = if result.winners.contains(pid) { "*" } else { " " };
            println!("  {} {:>4}  {}", marker, score, pid);
        }
    }

    session.close();
    Ok(())
}
