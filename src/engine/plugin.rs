//! GamePlugin trait: the interface a game implements to be driven by the
//! simulator, the bots, and the arena.

use std::collections::HashMap;

use crate::engine::models::*;

pub trait GamePlugin: Send + Sync {
    type State: Clone + Send + Sync;

    fn game_id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn min_players(&self) -> u32;
    fn max_players(&self) -> u32;

    /// Create initial game state from players + config.
    fn create_initial_state(
        &self,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<(Self::State, Phase, Vec<Event>), String>;

    /// Return all legal action payloads for this player in the current phase.
    /// Each payload carries its `action_type` so bots can build an `Action`.
    fn get_valid_actions(
        &self,
        state: &Self::State,
        phase: &Phase,
        player_id: &str,
    ) -> Vec<serde_json::Value>;

    /// Validate an action. Returns None if valid, Some(reason) if not.
    fn validate_action(&self, state: &Self::State, phase: &Phase, action: &Action)
        -> Option<String>;

    /// Apply a validated action, returning new state + events + next phase.
    fn apply_action(
        &self,
        state: &Self::State,
        phase: &Phase,
        action: &Action,
        players: &[Player],
    ) -> TransitionResult<Self::State>;

    /// Filter state to what this player (or a spectator) can see.
    fn get_player_view(
        &self,
        state: &Self::State,
        phase: &Phase,
        player_id: Option<&str>,
    ) -> serde_json::Value;

    fn get_scores(&self, state: &Self::State) -> HashMap<PlayerId, u32>;

    fn encode_state(&self, state: &Self::State) -> serde_json::Value;

    fn decode_state(&self, game_data: &serde_json::Value) -> Result<Self::State, String>;
}

/// Build an `Action` from a payload produced by `get_valid_actions`.
pub fn action_from_payload(player_id: &str, payload: serde_json::Value) -> Action {
    let action_type = payload
        .get("action_type")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Action {
        action_type,
        player_id: player_id.into(),
        payload,
    }
}
