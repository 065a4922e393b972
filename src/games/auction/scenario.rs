//! Scenario records: save and best-effort restore of a game in progress.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::models::GameResult;

use super::board::{parse_placement, Board, Column, Location};
use super::cards::SessionContext;
use super::rules::RulesConfig;
use super::turn::TurnMachine;
use super::types::{AuctionState, BidCard, BidState, Faction, PendingAdvance, PlayerState, Stage};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: String,
    pub color: String,
    pub coins: u32,
    pub score: u32,
    /// Bid card names; committed cards carry `@<column>` and a non-committed
    /// resolution state carries `:<state>`.
    pub cards: Vec<String>,
    /// Meeple placement keys, `c<column>:<location>`.
    pub meeples: Vec<String>,
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub turn: u32,
    pub round: u32,
    /// Column card names, bottom rank first.
    pub columns: Vec<Vec<String>>,
    pub players: Vec<PlayerRecord>,
    /// Engine state that is not described above; see [`save_state`].
    #[serde(default)]
    pub state: Vec<serde_json::Value>,
}

const STATE_TURN: usize = 0;
const STATE_STAGE: usize = 1;
const STATE_CURRENT: usize = 2;
const STATE_ROUND_START: usize = 3;
const STATE_TURNS_TAKEN: usize = 4;
const STATE_PENDING: usize = 5;
const STATE_RULES: usize = 6;
const STATE_RESULT: usize = 7;

/// Serialize the engine-internal part of the state into the opaque array.
pub fn save_state(state: &AuctionState) -> Vec<serde_json::Value> {
    vec![
        serde_json::json!(state.turn),
        serde_json::json!(state.stage),
        serde_json::json!(state.current_player_index),
        serde_json::json!(state.round_start),
        serde_json::json!(state.turns_taken),
        serde_json::json!(state.pending_advances),
        state.rules.to_options(),
        serde_json::json!(state.result),
    ]
}

/// Apply a saved opaque state array onto `state`. Entries that are missing
/// or malformed are logged and left at their current value.
pub fn parse_state(values: &[serde_json::Value], state: &mut AuctionState) {
    fn field<T: serde::de::DeserializeOwned>(values: &[serde_json::Value], idx: usize, name: &str) -> Option<T> {
        let value = values.get(idx)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(field = name, error = %e, "skipping malformed saved state entry");
                None
            }
        }
    }

    if let Some(turn) = field::<TurnMachine>(values, STATE_TURN, "turn") {
        state.turn = turn;
    }
    if let Some(stage) = field::<Stage>(values, STATE_STAGE, "stage") {
        state.stage = stage;
    }
    if let Some(idx) = field::<usize>(values, STATE_CURRENT, "current_player_index") {
        if idx < state.players.len() {
            state.current_player_index = idx;
        } else {
            tracing::warn!(idx, "saved current player out of range");
        }
    }
    if let Some(idx) = field::<usize>(values, STATE_ROUND_START, "round_start") {
        if idx < state.players.len() {
            state.round_start = idx;
        }
    }
    if let Some(n) = field::<u32>(values, STATE_TURNS_TAKEN, "turns_taken") {
        state.turns_taken = n;
    }
    if let Some(pending) = field::<VecDeque<PendingAdvance>>(values, STATE_PENDING, "pending_advances") {
        state.pending_advances = pending
            .into_iter()
            .filter(|p| state.players.iter().any(|pl| pl.player_id == p.player_id))
            .collect();
    }
    if let Some(result) = field::<Option<GameResult>>(values, STATE_RESULT, "result") {
        state.result = result;
    }
    if state.stage == Stage::Finished && state.result.is_none() {
        tracing::warn!("finished scenario has no saved result");
    }
}

fn encode_card(card: &BidCard) -> String {
    match (card.state, card.column) {
        (BidState::Clear, _) | (_, None) => card.name.clone(),
        (BidState::Committed, Some(col)) => format!("{}@{}", card.name, col),
        (state, Some(col)) => format!("{}@{}:{}", card.name, col, state.as_str()),
    }
}

fn decode_card(entry: &str, ctx: &SessionContext, n_columns: usize) -> Option<BidCard> {
    let (name, rest) = match entry.split_once('@') {
        Some((name, rest)) => (name, Some(rest)),
        None => (entry, None),
    };
    let mut card = ctx.catalog.bid_card(name)?;
    if let Some(rest) = rest {
        let (col, state) = match rest.split_once(':') {
            Some((col, state)) => (col, BidState::parse(state)?),
            None => (rest, BidState::Committed),
        };
        let col: usize = col.parse().ok()?;
        if col == 0 || col > n_columns {
            return None;
        }
        card.state = state;
        card.column = Some(col);
    }
    Some(card)
}

impl Scenario {
    pub fn capture(state: &AuctionState) -> Self {
        let columns = state
            .board
            .columns
            .iter()
            .map(|c| c.cards.iter().map(|card| card.name.clone()).collect())
            .collect();
        let players = state
            .players
            .iter()
            .map(|p| PlayerRecord {
                player_id: p.player_id.clone(),
                color: p.color.clone(),
                coins: p.coins,
                score: p.score,
                cards: p.bid_cards.iter().map(encode_card).collect(),
                meeples: state
                    .board
                    .meeples_of(&p.player_id)
                    .map(|m| m.placement_key())
                    .collect(),
                markers: p.markers.iter().map(|f| f.to_string()).collect(),
            })
            .collect();
        Scenario {
            turn: state.turn_number,
            round: state.round,
            columns,
            players,
            state: save_state(state),
        }
    }

    /// Rebuild a game state. Unknown card names, bad placements, and
    /// unknown factions are logged and skipped.
    pub fn restore(&self, ctx: &SessionContext) -> Result<AuctionState, ScenarioError> {
        if self.players.is_empty() {
            return Err(ScenarioError::Invalid("scenario has no players".into()));
        }

        let mut rules = match self.state.get(STATE_RULES) {
            Some(v) => RulesConfig::from_options(v).map_err(ScenarioError::Invalid)?,
            None => RulesConfig::default(),
        };

        let columns: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, names)| Column {
                id: i + 1,
                cards: names
                    .iter()
                    .filter_map(|name| {
                        let card = ctx.catalog.column_card(name).cloned();
                        if card.is_none() {
                            tracing::warn!(column = i + 1, card = %name, "unknown column card, skipping");
                        }
                        card
                    })
                    .collect(),
            })
            .collect();
        let n_columns = columns.len();
        if n_columns == 0 {
            return Err(ScenarioError::Invalid("scenario has no columns".into()));
        }
        if rules.n_columns != n_columns {
            tracing::warn!(rules = rules.n_columns, saved = n_columns, "column count differs from rules, using saved board");
            rules.n_columns = n_columns;
        }
        let mut board = Board {
            columns,
            meeples: Vec::new(),
        };

        let mut players = Vec::with_capacity(self.players.len());
        for record in &self.players {
            let bid_cards = record
                .cards
                .iter()
                .filter_map(|entry| {
                    let card = decode_card(entry, ctx, n_columns);
                    if card.is_none() {
                        tracing::warn!(player = %record.player_id, card = %entry, "unknown bid card, skipping");
                    }
                    card
                })
                .collect();

            for key in &record.meeples {
                let Some((column, location)) = parse_placement(key) else {
                    tracing::warn!(player = %record.player_id, placement = %key, "malformed meeple placement, skipping");
                    continue;
                };
                if !board.is_valid_location(column, location) {
                    tracing::warn!(player = %record.player_id, placement = %key, "meeple placement off the board, skipping");
                    continue;
                }
                if location != Location::Bottom
                    && location != Location::Top
                    && board.occupant(column, location).is_some()
                {
                    tracing::warn!(player = %record.player_id, placement = %key, "meeple placement already occupied, skipping");
                    continue;
                }
                board.add_meeple(&record.player_id, column, location);
            }

            let markers = record
                .markers
                .iter()
                .filter_map(|m| {
                    let f = Faction::parse(m);
                    if f.is_none() {
                        tracing::warn!(player = %record.player_id, marker = %m, "unknown marker faction, skipping");
                    }
                    f
                })
                .collect();

            players.push(PlayerState {
                player_id: record.player_id.clone(),
                color: record.color.clone(),
                coins: record.coins,
                score: record.score,
                markers,
                bid_cards,
            });
        }

        let mut state = AuctionState {
            rules,
            board,
            players,
            turn: TurnMachine::new(),
            stage: Stage::Bidding,
            round: self.round,
            turn_number: self.turn,
            turns_taken: 0,
            round_start: 0,
            current_player_index: 0,
            pending_advances: VecDeque::new(),
            result: None,
        };
        parse_state(&self.state, &mut state);
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Where scenarios are persisted.
pub trait ScenarioStore: Send {
    fn save(&mut self, scenario: &Scenario) -> Result<(), ScenarioError>;
    fn load(&self) -> Result<Option<Scenario>, ScenarioError>;
}

/// A single JSON file, overwritten on every save.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScenarioStore for FileStore {
    fn save(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        let json = scenario.to_json()?;
        fs::write(&self.path, json).map_err(|source| ScenarioError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn load(&self) -> Result<Option<Scenario>, ScenarioError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|source| ScenarioError::Io {
            path: self.path.clone(),
            source,
        })?;
        Scenario::from_json(&content).map(Some)
    }
}

/// Keeps every saved scenario in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub saved: Vec<Scenario>,
}

impl ScenarioStore for MemoryStore {
    fn save(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        self.saved.push(scenario.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Scenario>, ScenarioError> {
        Ok(self.saved.last().cloned())
    }
}
