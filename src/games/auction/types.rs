//! Domain types for the column auction game.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::models::{GameResult, PlayerId};
use super::board::Board;
use super::rules::RulesConfig;
use super::turn::TurnMachine;

/// 1-based column ordinal.
pub type ColumnId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Red,
    Blue,
    Green,
    Gold,
    Black,
}

impl Faction {
    /// The coloured factions; `Black` only appears on black cards.
    pub const COLORS: [Faction; 4] = [Faction::Red, Faction::Blue, Faction::Green, Faction::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::Red => "red",
            Faction::Blue => "blue",
            Faction::Green => "green",
            Faction::Gold => "gold",
            Faction::Black => "black",
        }
    }

    pub fn parse(s: &str) -> Option<Faction> {
        match s {
            "red" => Some(Faction::Red),
            "blue" => Some(Faction::Blue),
            "green" => Some(Faction::Green),
            "gold" => Some(Faction::Gold),
            "black" => Some(Faction::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidState {
    Clear,
    Committed,
    Won,
    Outbid,
    Cancelled,
}

impl BidState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidState::Clear => "clear",
            BidState::Committed => "committed",
            BidState::Won => "won",
            BidState::Outbid => "outbid",
            BidState::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<BidState> {
        match s {
            "clear" => Some(BidState::Clear),
            "committed" => Some(BidState::Committed),
            "won" => Some(BidState::Won),
            "outbid" => Some(BidState::Outbid),
            "cancelled" => Some(BidState::Cancelled),
            _ => None,
        }
    }
}

/// A bid card in a player's hand. Committing it to a column places a bid of
/// `value` on that column for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidCard {
    pub name: String,
    pub value: u32,
    pub factions: Vec<Faction>,
    pub state: BidState,
    #[serde(default)]
    pub column: Option<ColumnId>,
}

impl BidCard {
    pub fn new(name: &str, value: u32, factions: Vec<Faction>) -> Self {
        Self {
            name: name.into(),
            value,
            factions,
            state: BidState::Clear,
            column: None,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.state == BidState::Clear
    }

    /// Whether this card counts towards colour-match scoring for `faction`.
    pub fn matches(&self, faction: Faction) -> bool {
        !self.is_clear() && self.factions.contains(&faction)
    }

    pub fn clear(&mut self) {
        self.state = BidState::Clear;
        self.column = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub color: String,
    pub coins: u32,
    pub score: u32,
    #[serde(default)]
    pub markers: Vec<Faction>,
    #[serde(default)]
    pub bid_cards: Vec<BidCard>,
}

impl PlayerState {
    pub fn committed_on(&self, column: ColumnId) -> Option<&BidCard> {
        self.bid_cards
            .iter()
            .find(|c| c.state == BidState::Committed && c.column == Some(column))
    }

    /// Coins already promised to committed bids this round.
    pub fn committed_total(&self) -> u32 {
        self.bid_cards
            .iter()
            .filter(|c| c.state == BidState::Committed)
            .map(|c| c.value)
            .sum()
    }

    pub fn can_afford(&self, value: u32) -> bool {
        self.committed_total() + value <= self.coins
    }

    /// Scores only ever grow.
    pub fn add_score(&mut self, delta: u32) {
        self.score = self.score.saturating_add(delta);
    }
}

/// Where in the round the game currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Bidding,
    Resolving,
    Advancing,
    RoundEnd,
    Finished,
}

/// A column winner waiting to move one of their meeples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAdvance {
    pub column: ColumnId,
    pub player_id: PlayerId,
    pub value: u32,
}

/// Full column auction game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionState {
    pub rules: RulesConfig,
    pub board: Board,
    pub players: Vec<PlayerState>,
    pub turn: TurnMachine,
    pub stage: Stage,
    pub round: u32,
    pub turn_number: u32,
    /// Bidding turns completed in the current round.
    pub turns_taken: u32,
    pub round_start: usize,
    pub current_player_index: usize,
    #[serde(default)]
    pub pending_advances: VecDeque<PendingAdvance>,
    #[serde(default)]
    pub result: Option<GameResult>,
}

impl AuctionState {
    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    pub fn current_player(&self) -> Option<&PlayerState> {
        self.players.get(self.current_player_index)
    }

    pub fn bidding_turns_per_round(&self) -> u32 {
        (self.players.len() as u32).saturating_mul(self.rules.turns_per_round)
    }
}
