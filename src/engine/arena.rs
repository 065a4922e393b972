//! Bot-vs-bot arena runner. Games are independent and run in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::engine::bot_strategy::BotStrategy;
use crate::engine::models::*;
use crate::engine::plugin::{action_from_payload, GamePlugin};
use crate::engine::simulator::{apply_action_and_resolve, resolve_auto, SimulationState};

/// Upper bound on player decisions in a single arena game.
const MAX_DECISIONS: usize = 5_000;

/// Aggregated results from an arena run.
pub struct ArenaResult {
    pub num_games: usize,
    pub wins: HashMap<String, usize>,
    pub draws: usize,
    /// Games that errored or hit the decision limit.
    pub unfinished: usize,
    pub total_scores: HashMap<String, Vec<f64>>,
    pub game_durations_ms: Vec<f64>,
}

impl ArenaResult {
    pub fn win_rate(&self, name: &str) -> f64 {
        *self.wins.get(name).unwrap_or(&0) as f64 / self.num_games.max(1) as f64
    }

    pub fn avg_score(&self, name: &str) -> f64 {
        match self.total_scores.get(name) {
            Some(s) if !s.is_empty() => s.iter().sum::<f64>() / s.len() as f64,
            _ => 0.0,
        }
    }

    pub fn score_stddev(&self, name: &str) -> f64 {
        let scores = match self.total_scores.get(name) {
            Some(s) if s.len() >= 2 => s,
            _ => return 0.0,
        };
        let avg = self.avg_score(name);
        let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / (scores.len() - 1) as f64;
        variance.sqrt()
    }

    /// Wilson score interval for the win rate.
    pub fn confidence_interval_95(&self, name: &str) -> (f64, f64) {
        let n = self.num_games;
        if n == 0 {
            return (0.0, 0.0);
        }
        let p = self.win_rate(name);
        let z = 1.96_f64;
        let denom = 1.0 + z * z / n as f64;
        let center = (p + z * z / (2.0 * n as f64)) / denom;
        let margin = z * ((p * (1.0 - p) + z * z / (4.0 * n as f64)) / n as f64).sqrt() / denom;
        ((center - margin).max(0.0), (center + margin).min(1.0))
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Arena Results ({} games)", self.num_games)];
        lines.push("=".repeat(60));
        let mut names: Vec<&String> = self.wins.keys().collect();
        names.sort();
        for name in names {
            let (ci_lo, ci_hi) = self.confidence_interval_95(name);
            lines.push(format!(
                "  {:>12}: {:3} wins ({:5.1}%)  [95% CI: {:.1}%-{:.1}%]  avg={:5.1} +/- {:4.1}",
                name,
                self.wins[name],
                self.win_rate(name) * 100.0,
                ci_lo * 100.0,
                ci_hi * 100.0,
                self.avg_score(name),
                self.score_stddev(name),
            ));
        }
        lines.push(format!("  {:>12}: {}", "Draws", self.draws));
        if self.unfinished > 0 {
            lines.push(format!("  {:>12}: {}", "Unfinished", self.unfinished));
        }
        if !self.game_durations_ms.is_empty() {
            let avg_ms = self.game_durations_ms.iter().sum::<f64>() / self.game_durations_ms.len() as f64;
            let total_s = self.game_durations_ms.iter().sum::<f64>() / 1000.0;
            lines.push(format!("  Avg game: {:.1}ms  |  Total: {:.2}s", avg_ms, total_s));
        }
        lines.join("\n")
    }
}

/// Outcome of one arena game, keyed by strategy name.
struct GameOutcome {
    result: Option<GameResult>,
    pid_to_name: HashMap<PlayerId, String>,
    elapsed_ms: f64,
}

/// Run `num_games` between the given strategies, one seat per strategy, and
/// return aggregated stats. Game `i` uses seed `base_seed + i`; with
/// `alternate_seats` the seating rotates every game.
pub fn run_arena<P: GamePlugin>(
    plugin: &P,
    strategies: &HashMap<String, Box<dyn BotStrategy<P>>>,
    num_games: usize,
    base_seed: u64,
    game_options: Option<serde_json::Value>,
    alternate_seats: bool,
    progress_callback: Option<&(dyn Fn(usize, usize) + Sync)>,
) -> ArenaResult {
    let mut strategy_names: Vec<String> = strategies.keys().cloned().collect();
    strategy_names.sort();
    let num_players = strategy_names.len();
    let options = game_options.unwrap_or(serde_json::json!({}));
    let finished = AtomicUsize::new(0);

    let outcomes: Vec<GameOutcome> = (0..num_games)
        .into_par_iter()
        .map(|game_idx| {
            let seed = base_seed + game_idx as u64;
            let seat_assignment: Vec<String> = (0..num_players)
                .map(|i| {
                    let offset = if alternate_seats { game_idx } else { 0 };
                    strategy_names[(i + offset) % num_players].clone()
                })
                .collect();

            let players: Vec<Player> = seat_assignment
                .iter()
                .enumerate()
                .map(|(i, name)| Player::bot(i, name))
                .collect();
            let pid_to_name: HashMap<PlayerId, String> = players
                .iter()
                .map(|p| (p.player_id.clone(), p.display_name.clone()))
                .collect();
            let pid_to_strategy: HashMap<PlayerId, &dyn BotStrategy<P>> = players
                .iter()
                .map(|p| (p.player_id.clone(), strategies[&p.display_name].as_ref()))
                .collect();

            let config = GameConfig {
                random_seed: Some(seed),
                options: options.clone(),
            };

            let t0 = Instant::now();
            let result = play_one_game(plugin, &players, &config, &pid_to_strategy);
            let elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0;

            if let Some(cb) = progress_callback {
                cb(finished.fetch_add(1, Ordering::Relaxed) + 1, num_games);
            }
            GameOutcome {
                result,
                pid_to_name,
                elapsed_ms,
            }
        })
        .collect();

    let mut result = ArenaResult {
        num_games,
        wins: strategy_names.iter().map(|n| (n.clone(), 0)).collect(),
        draws: 0,
        unfinished: 0,
        total_scores: strategy_names.iter().map(|n| (n.clone(), Vec::new())).collect(),
        game_durations_ms: Vec::with_capacity(num_games),
    };

    for outcome in outcomes {
        result.game_durations_ms.push(outcome.elapsed_ms);
        let Some(gr) = outcome.result else {
            result.unfinished += 1;
            continue;
        };
        for (pid, score) in &gr.final_scores {
            if let Some(scores) = outcome
                .pid_to_name
                .get(pid)
                .and_then(|name| result.total_scores.get_mut(name))
            {
                scores.push(*score as f64);
            }
        }
        match gr.winners.as_slice() {
            [winner] => {
                if let Some(wins) = outcome
                    .pid_to_name
                    .get(winner)
                    .and_then(|name| result.wins.get_mut(name))
                {
                    *wins += 1;
                }
            }
            _ => result.draws += 1,
        }
    }

    result
}

/// Play one game to completion. Returns `None` if the game could not be
/// created, a bot produced an illegal action, or the decision limit was hit.
pub fn play_one_game<P: GamePlugin>(
    plugin: &P,
    players: &[Player],
    config: &GameConfig,
    pid_to_strategy: &HashMap<PlayerId, &dyn BotStrategy<P>>,
) -> Option<GameResult> {
    let (state, phase, _) = match plugin.create_initial_state(players, config) {
        Ok(created) => created,
        Err(e) => {
            tracing::warn!(error = %e, "arena game could not be created");
            return None;
        }
    };
    let mut sim = SimulationState::new(state, phase, players.to_vec());
    resolve_auto(plugin, &mut sim);

    let mut rng = StdRng::seed_from_u64(config.random_seed.unwrap_or(0).wrapping_add(1));

    for _ in 0..MAX_DECISIONS {
        if sim.game_over.is_some() {
            break;
        }
        let acting_pid = sim.phase.acting_player()?.to_string();
        let strategy = pid_to_strategy.get(&acting_pid)?;

        let chosen = strategy.choose_action(&sim.state, &sim.phase, &acting_pid, plugin, &mut rng);
        let action = action_from_payload(&acting_pid, chosen);
        if let Some(reason) = plugin.validate_action(&sim.state, &sim.phase, &action) {
            tracing::warn!(player = %acting_pid, action = %action.action_type, %reason, "bot chose an illegal action");
            return None;
        }
        apply_action_and_resolve(plugin, &mut sim, &action);
    }

    if sim.game_over.is_none() {
        tracing::warn!(phase = %sim.phase.name, "arena game hit the decision limit");
    }
    sim.game_over
}
