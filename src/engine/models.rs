//! Core engine data types shared by every game plugin.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type PlayerId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub display_name: String,
    #[serde(default)]
    pub seat_index: i32,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl Player {
    pub fn bot(seat_index: usize, bot_id: &str) -> Self {
        Self {
            player_id: format!("p{}", seat_index),
            display_name: bot_id.to_string(),
            seat_index: seat_index as i32,
            is_bot: true,
            bot_id: Some(bot_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub options: serde_json::Value,
    pub random_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            options: serde_json::json!({}),
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedAction {
    pub player_id: PlayerId,
    pub action_type: String,
    #[serde(default)]
    pub constraints: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub expected_actions: Vec<ExpectedAction>,
    #[serde(default)]
    pub auto_resolve: bool,
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

fn default_metadata() -> serde_json::Value {
    serde_json::json!({})
}

impl Phase {
    /// A phase the engine resolves on its own without waiting for input.
    pub fn automatic(name: &str, metadata: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            expected_actions: vec![],
            auto_resolve: true,
            metadata,
        }
    }

    /// A phase waiting on a single player, who may send any of `action_types`.
    pub fn awaiting(
        name: &str,
        player_id: &str,
        action_types: &[&str],
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            expected_actions: action_types
                .iter()
                .map(|t| ExpectedAction {
                    player_id: player_id.into(),
                    action_type: (*t).into(),
                    constraints: HashMap::new(),
                })
                .collect(),
            auto_resolve: false,
            metadata,
        }
    }

    pub fn acting_player(&self) -> Option<&str> {
        self.expected_actions.first().map(|ea| ea.player_id.as_str())
    }

    pub fn expects(&self, action_type: &str) -> bool {
        self.expected_actions
            .iter()
            .any(|ea| ea.action_type == action_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,
    pub player_id: PlayerId,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub event_type: String,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    pub fn global(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            player_id: None,
            payload,
        }
    }

    pub fn for_player(event_type: &str, player_id: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            player_id: Some(player_id.into()),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub winners: Vec<PlayerId>,
    pub final_scores: HashMap<PlayerId, u32>,
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    "normal".to_string()
}

/// Outcome of applying one action to a typed game state.
#[derive(Debug, Clone)]
pub struct TransitionResult<S> {
    pub state: S,
    pub events: Vec<Event>,
    pub next_phase: Phase,
    pub scores: HashMap<PlayerId, u32>,
    pub game_over: Option<GameResult>,
}
