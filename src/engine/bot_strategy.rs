//! Bot strategy trait and the game-agnostic random strategy.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::engine::models::*;
use crate::engine::plugin::GamePlugin;

/// A bot strategy selects an action payload given the current game state.
/// The returned payload carries its `action_type`, like the ones produced by
/// `GamePlugin::get_valid_actions`.
pub trait BotStrategy<P: GamePlugin>: Send + Sync {
    fn choose_action(
        &self,
        state: &P::State,
        phase: &Phase,
        player_id: &str,
        plugin: &P,
        rng: &mut StdRng,
    ) -> serde_json::Value;
}

/// Picks a uniformly random valid action.
pub struct RandomStrategy;

impl<P: GamePlugin> BotStrategy<P> for RandomStrategy {
    fn choose_action(
        &self,
        state: &P::State,
        phase: &Phase,
        player_id: &str,
        plugin: &P,
        rng: &mut StdRng,
    ) -> serde_json::Value {
        let valid = plugin.get_valid_actions(state, phase, player_id);
        valid.choose(rng).cloned().unwrap_or(serde_json::json!({}))
    }
}
