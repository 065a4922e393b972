//! Greedy bot for the column auction.
//!
//! Bids go where the best reachable cell is worth the most, backed by the
//! strongest affordable card. Advances take whichever move scores most right
//! away, preferring bumps.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::engine::bot_strategy::BotStrategy;
use crate::engine::models::Phase;
use super::board::Location;
use super::plugin::*;
use super::scoring::color_match_delta;
use super::types::{AuctionState, ColumnId};

/// Bonus for reaching a column's top row, in score points.
const TOP_ROW_VALUE: u32 = 4;

#[derive(Debug, Clone, Default)]
pub struct GreedyStrategy {
    /// Coins the bot keeps uncommitted during bidding.
    pub reserve: u32,
}

impl GreedyStrategy {
    pub fn new(reserve: u32) -> Self {
        Self { reserve }
    }

    /// Immediate value of moving `meeple` into `cell` (or the top row).
    fn advance_value(state: &AuctionState, player_id: &str, meeple: usize, cell: Option<usize>) -> u32 {
        let mut board = state.board.clone();
        let Ok(outcome) = board.advance(meeple, cell) else {
            return 0;
        };
        let rank = board.rank_of(outcome.column, outcome.to) as u32;
        let bump = u32::from(outcome.bumped.is_some());
        let color = match (board.faction_at(outcome.column, outcome.to), state.player(player_id)) {
            (Some(faction), Some(player)) => color_match_delta(&board, player, faction),
            _ => 0,
        };
        let top = if outcome.to == Location::Top { TOP_ROW_VALUE } else { 0 };
        rank + bump + color + top
    }

    /// Best advance value available to `player_id` if they win `column`.
    fn column_value(state: &AuctionState, player_id: &str, column: ColumnId) -> u32 {
        state
            .board
            .valid_advances(column, player_id)
            .iter()
            .map(|a| Self::advance_value(state, player_id, a.meeple, a.cell))
            .max()
            .unwrap_or(0)
    }

    fn pick_best(mut scored: Vec<(u32, serde_json::Value)>, rng: &mut StdRng) -> Option<serde_json::Value> {
        let best = scored.iter().map(|(s, _)| *s).max()?;
        scored.retain(|(s, _)| *s == best);
        scored.choose(rng).map(|(_, v)| v.clone())
    }
}

impl BotStrategy<AuctionPlugin> for GreedyStrategy {
    fn choose_action(
        &self,
        state: &AuctionState,
        phase: &Phase,
        player_id: &str,
        plugin: &AuctionPlugin,
        rng: &mut StdRng,
    ) -> serde_json::Value {
        use crate::engine::plugin::GamePlugin;

        let valid = plugin.get_valid_actions(state, phase, player_id);
        let end_turn = serde_json::json!({"action_type": ACTION_END_TURN, "ok": true});

        match phase.name.as_str() {
            PHASE_CHOOSE_ACTION => {
                let Some(player) = state.player(player_id) else {
                    return end_turn;
                };
                let budget = player.coins.saturating_sub(player.committed_total());
                let scored: Vec<(u32, serde_json::Value)> = valid
                    .into_iter()
                    .filter(|a| a["action_type"] == ACTION_COMMIT_BID)
                    .filter_map(|a| {
                        let column = a["column"].as_u64()? as usize;
                        let card = player.bid_cards.iter().find(|c| a["card"] == c.name.as_str())?;
                        if budget.saturating_sub(card.value) < self.reserve {
                            return None;
                        }
                        let worth = Self::column_value(state, player_id, column);
                        if worth == 0 {
                            return None;
                        }
                        Some((worth * 4 + card.value, a))
                    })
                    .collect();
                Self::pick_best(scored, rng).unwrap_or(end_turn)
            }
            PHASE_CONFIRM_END_TURN => serde_json::json!({"action_type": ACTION_CONFIRM}),
            PHASE_ADVANCE_AND_BUMP => {
                let scored: Vec<(u32, serde_json::Value)> = valid
                    .into_iter()
                    .map(|a| {
                        let meeple = a["meeple"].as_u64().unwrap_or_default() as usize;
                        let cell = a["cell"].as_u64().map(|c| c as usize);
                        (Self::advance_value(state, player_id, meeple, cell), a)
                    })
                    .collect();
                Self::pick_best(scored, rng).unwrap_or(serde_json::json!({}))
            }
            _ => valid.into_iter().next().unwrap_or(serde_json::json!({})),
        }
    }
}
