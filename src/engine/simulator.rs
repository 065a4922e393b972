//! Synchronous game simulator. Advances game state through auto-resolve phases.
//! Used by the session, the bots, and the arena.

use std::collections::HashMap;

use crate::engine::models::*;
use crate::engine::plugin::GamePlugin;

/// Upper bound on chained auto-resolve phases after a single action.
const MAX_AUTO_RESOLVE: usize = 64;

/// Mutable game state for synchronous simulation.
#[derive(Clone)]
pub struct SimulationState<S> {
    pub state: S,
    pub phase: Phase,
    pub players: Vec<Player>,
    pub scores: HashMap<PlayerId, u32>,
    pub game_over: Option<GameResult>,
}

impl<S> SimulationState<S> {
    pub fn new(state: S, phase: Phase, players: Vec<Player>) -> Self {
        let scores = players.iter().map(|p| (p.player_id.clone(), 0)).collect();
        Self {
            state,
            phase,
            players,
            scores,
            game_over: None,
        }
    }
}

/// Apply an action and auto-resolve all subsequent auto-resolve phases.
/// Mutates `sim` in place and returns every event emitted along the way.
pub fn apply_action_and_resolve<P: GamePlugin>(
    plugin: &P,
    sim: &mut SimulationState<P::State>,
    action: &Action,
) -> Vec<Event> {
    let mut events = apply_one(plugin, sim, action);
    events.extend(resolve_auto(plugin, sim));
    events
}

/// Run auto-resolve phases until the game waits on a player or ends.
pub fn resolve_auto<P: GamePlugin>(plugin: &P, sim: &mut SimulationState<P::State>) -> Vec<Event> {
    let mut events = Vec::new();
    let mut max_auto = MAX_AUTO_RESOLVE;
    while sim.phase.auto_resolve && sim.game_over.is_none() && max_auto > 0 {
        max_auto -= 1;

        let synthetic = Action {
            action_type: sim.phase.name.clone(),
            player_id: phase_player_id(&sim.phase, &sim.players),
            payload: serde_json::json!({}),
        };
        events.extend(apply_one(plugin, sim, &synthetic));
    }
    if sim.phase.auto_resolve && sim.game_over.is_none() {
        tracing::warn!(phase = %sim.phase.name, "auto-resolve limit reached");
    }
    events
}

fn apply_one<P: GamePlugin>(
    plugin: &P,
    sim: &mut SimulationState<P::State>,
    action: &Action,
) -> Vec<Event> {
    let result = plugin.apply_action(&sim.state, &sim.phase, action, &sim.players);
    sim.state = result.state;
    sim.phase = result.next_phase;
    if !result.scores.is_empty() {
        sim.scores = result.scores;
    }
    sim.game_over = result.game_over;
    result.events
}

/// Extract the acting player from a phase, falling back to first player.
pub fn phase_player_id(phase: &Phase, players: &[Player]) -> PlayerId {
    if let Some(pid) = phase.acting_player() {
        return pid.to_string();
    }
    if let Some(pi) = phase.metadata.get("player_index").and_then(|v| v.as_u64()) {
        let idx = pi as usize;
        if idx < players.len() {
            return players[idx].player_id.clone();
        }
    }
    players
        .first()
        .map(|p| p.player_id.clone())
        .unwrap_or_else(|| "system".into())
}
