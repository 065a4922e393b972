//! AuctionPlugin implements GamePlugin for the column auction game.
//!
//! Phases seen from outside:
//!
//! * `begin_turn` (auto) runs `BeginTurn.start` on the turn machine.
//! * `choose_action` waits for the current player to `commit_bid` or `end_turn`.
//! * `confirm_end_turn` waits for `confirm` or `cancel` after an early end turn.
//! * `resolve_winners` (auto) resolves every column's bids.
//! * `advance_and_bump` waits for a column winner to `advance` a meeple.
//! * `round_end` (auto) scores ranks, clears bids, pays income, checks game end.
//! * `game_over` is terminal.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::models::*;
use crate::engine::plugin::GamePlugin;
use super::bids::{mark_bid_cards, BidLedger, ColumnOutcome};
use super::board::{Advance, Board, Location};
use super::cards::SessionContext;
use super::rules::RulesConfig;
use super::scoring::{color_match_delta, score_round_end};
use super::turn::{TurnFlow, TurnHooks, TurnMachine, TurnPhase};
use super::types::*;

pub const PHASE_BEGIN_TURN: &str = "begin_turn";
pub const PHASE_CHOOSE_ACTION: &str = "choose_action";
pub const PHASE_CONFIRM_END_TURN: &str = "confirm_end_turn";
pub const PHASE_RESOLVE_WINNERS: &str = "resolve_winners";
pub const PHASE_ADVANCE_AND_BUMP: &str = "advance_and_bump";
pub const PHASE_ROUND_END: &str = "round_end";
pub const PHASE_GAME_OVER: &str = "game_over";

pub const ACTION_COMMIT_BID: &str = "commit_bid";
pub const ACTION_END_TURN: &str = "end_turn";
pub const ACTION_CONFIRM: &str = "confirm";
pub const ACTION_CANCEL: &str = "cancel";
pub const ACTION_ADVANCE: &str = "advance";

pub struct AuctionPlugin {
    context: SessionContext,
}

impl AuctionPlugin {
    pub fn new(context: SessionContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}

impl GamePlugin for AuctionPlugin {
    type State = AuctionState;

    fn game_id(&self) -> &str {
        "column_auction"
    }

    fn display_name(&self) -> &str {
        "Column Auction"
    }

    fn min_players(&self) -> u32 {
        2
    }

    fn max_players(&self) -> u32 {
        5
    }

    fn create_initial_state(
        &self,
        players: &[Player],
        config: &GameConfig,
    ) -> Result<(AuctionState, Phase, Vec<Event>), String> {
        let rules = RulesConfig::from_options(&config.options)?;
        let n = players.len() as u32;
        if n < self.min_players() || n > self.max_players() {
            return Err(format!(
                "{} players is outside the supported range {}..={}",
                n,
                self.min_players(),
                self.max_players()
            ));
        }

        let seed = config.random_seed.unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut column_deck = self.context.catalog.column_deck();
        if column_deck.is_empty() {
            return Err("card catalog has no column cards".into());
        }
        column_deck.shuffle(&mut rng);

        let mut bid_deck = self.context.catalog.bid_deck();
        if bid_deck.is_empty() {
            return Err("card catalog has no bid cards".into());
        }
        bid_deck.shuffle(&mut rng);

        let player_ids: Vec<PlayerId> = players.iter().map(|p| p.player_id.clone()).collect();
        let board = Board::deal(&column_deck, rules.n_columns, rules.n_ranks, &player_ids);

        let mut draw = bid_deck.iter().cycle();
        let player_states: Vec<PlayerState> = players
            .iter()
            .enumerate()
            .map(|(seat, p)| PlayerState {
                player_id: p.player_id.clone(),
                color: self.context.color_for(seat),
                coins: rules.starting_coins,
                score: 0,
                markers: Vec::new(),
                bid_cards: (0..rules.hand_size).filter_map(|_| draw.next().cloned()).collect(),
            })
            .collect();

        let events = vec![Event::global(
            "game_started",
            serde_json::json!({
                "players": player_ids,
                "columns": rules.n_columns,
                "ranks": rules.n_ranks,
                "seed": seed,
            }),
        )];

        let state = AuctionState {
            rules,
            board,
            players: player_states,
            turn: TurnMachine::new(),
            stage: Stage::Bidding,
            round: 1,
            turn_number: 1,
            turns_taken: 0,
            round_start: 0,
            current_player_index: 0,
            pending_advances: VecDeque::new(),
            result: None,
        };
        let phase = phase_for_state(&state);

        tracing::info!(players = players.len(), seed, "created column auction game");
        Ok((state, phase, events))
    }

    fn get_valid_actions(
        &self,
        state: &AuctionState,
        phase: &Phase,
        player_id: &str,
    ) -> Vec<serde_json::Value> {
        if phase.acting_player() != Some(player_id) {
            return vec![];
        }

        match phase.name.as_str() {
            PHASE_CHOOSE_ACTION => {
                let mut actions = vec![];
                if let Some(player) = state.player(player_id) {
                    let mut seen = HashSet::new();
                    for card in player.bid_cards.iter().filter(|c| c.is_clear()) {
                        if !seen.insert(card.name.as_str()) || !player.can_afford(card.value) {
                            continue;
                        }
                        for column in 1..=state.board.columns.len() {
                            if player.committed_on(column).is_none() {
                                actions.push(serde_json::json!({
                                    "action_type": ACTION_COMMIT_BID,
                                    "column": column,
                                    "card": card.name,
                                }));
                            }
                        }
                    }
                }
                actions.push(serde_json::json!({
                    "action_type": ACTION_END_TURN,
                    "ok": true,
                }));
                actions
            }
            PHASE_CONFIRM_END_TURN => vec![
                serde_json::json!({"action_type": ACTION_CONFIRM}),
                serde_json::json!({"action_type": ACTION_CANCEL}),
            ],
            PHASE_ADVANCE_AND_BUMP => match state.pending_advances.front() {
                Some(pending) => state
                    .board
                    .valid_advances(pending.column, player_id)
                    .into_iter()
                    .map(|a| {
                        serde_json::json!({
                            "action_type": ACTION_ADVANCE,
                            "meeple": a.meeple,
                            "cell": a.cell,
                        })
                    })
                    .collect(),
                None => vec![],
            },
            _ => vec![],
        }
    }

    fn validate_action(
        &self,
        state: &AuctionState,
        phase: &Phase,
        action: &Action,
    ) -> Option<String> {
        if state.stage == Stage::Finished {
            return Some("the game is over".into());
        }
        if phase.auto_resolve {
            return Some(format!("the engine is busy with {}", phase.name));
        }
        if !phase.expects(&action.action_type) {
            return Some(match action.action_type.as_str() {
                ACTION_ADVANCE => {
                    "meeple advancement is only legal while a column winner is advancing".into()
                }
                ACTION_CONFIRM | ACTION_CANCEL => "no confirmation is pending".into(),
                _ if phase.name == PHASE_CONFIRM_END_TURN => {
                    "answer the pending confirmation first".into()
                }
                other => format!("{} is not allowed during {}", other, phase.name),
            });
        }
        if phase.acting_player() != Some(action.player_id.as_str()) {
            return Some(format!("it is not {}'s move", action.player_id));
        }

        match action.action_type.as_str() {
            ACTION_COMMIT_BID => validate_commit(state, action),
            ACTION_END_TURN => match action.payload.get("ok") {
                None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(_)) => None,
                Some(_) => Some("end_turn ok must be a boolean".into()),
            },
            ACTION_ADVANCE => validate_advance(state, action),
            _ => None,
        }
    }

    fn apply_action(
        &self,
        state: &AuctionState,
        phase: &Phase,
        action: &Action,
        _players: &[Player],
    ) -> TransitionResult<AuctionState> {
        let mut s = state.clone();
        let mut events = Vec::new();

        let outcome = match phase.name.as_str() {
            PHASE_BEGIN_TURN => drive_turn(&mut s, &mut events, |m, h| m.start(h)),
            PHASE_CHOOSE_ACTION => match action.action_type.as_str() {
                ACTION_COMMIT_BID => apply_commit(&mut s, action, &mut events),
                ACTION_END_TURN => {
                    let ok = action.payload.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
                    drive_turn(&mut s, &mut events, |m, h| m.done(ok, h))
                }
                other => Err(format!("unexpected {} during {}", other, phase.name)),
            },
            PHASE_CONFIRM_END_TURN => match action.action_type.as_str() {
                ACTION_CONFIRM => drive_turn(&mut s, &mut events, |m, h| m.confirm(h)),
                ACTION_CANCEL => drive_turn(&mut s, &mut events, |m, h| m.cancel(h)),
                other => Err(format!("unexpected {} during {}", other, phase.name)),
            },
            PHASE_RESOLVE_WINNERS => {
                apply_resolve_winners(&mut s, &mut events);
                Ok(())
            }
            PHASE_ADVANCE_AND_BUMP => apply_advance(&mut s, action, &mut events),
            PHASE_ROUND_END => apply_round_end(&mut s, &mut events),
            other => Err(format!("no handler for phase {}", other)),
        };

        if let Err(reason) = outcome {
            tracing::warn!(phase = %phase.name, action = %action.action_type, %reason, "action rejected");
            return TransitionResult {
                state: state.clone(),
                events: vec![Event::for_player(
                    "action_rejected",
                    &action.player_id,
                    serde_json::json!({"reason": reason}),
                )],
                next_phase: phase.clone(),
                scores: self.get_scores(state),
                game_over: None,
            };
        }

        if s.stage == Stage::Advancing {
            skip_forfeited_advances(&mut s, &mut events);
        }

        let next_phase = phase_for_state(&s);
        if next_phase.name != phase.name {
            events.push(Event::global(
                "phase_changed",
                serde_json::json!({"phase": next_phase.name}),
            ));
        }

        TransitionResult {
            scores: self.get_scores(&s),
            game_over: s.result.clone(),
            next_phase,
            state: s,
            events,
        }
    }

    fn get_player_view(
        &self,
        state: &AuctionState,
        phase: &Phase,
        player_id: Option<&str>,
    ) -> serde_json::Value {
        let columns: Vec<serde_json::Value> = state
            .board
            .columns
            .iter()
            .map(|c| {
                serde_json::json!({
                    "column": c.id,
                    "cards": c.cards,
                })
            })
            .collect();
        let meeples: Vec<serde_json::Value> = state
            .board
            .meeples
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "owner": m.owner,
                    "column": m.column,
                    "location": m.location.to_key(),
                    "faction": state.board.meeple_faction(m),
                })
            })
            .collect();
        let players: Vec<serde_json::Value> = state
            .players
            .iter()
            .map(|p| {
                let mut view = serde_json::json!({
                    "player_id": p.player_id,
                    "color": p.color,
                    "coins": p.coins,
                    "score": p.score,
                    "markers": p.markers,
                    "committed_columns": p
                        .bid_cards
                        .iter()
                        .filter(|c| !c.is_clear())
                        .filter_map(|c| c.column)
                        .collect::<Vec<_>>(),
                    "hand_size": p.bid_cards.len(),
                });
                if player_id == Some(p.player_id.as_str()) {
                    view["bid_cards"] = serde_json::json!(p.bid_cards);
                }
                view
            })
            .collect();

        serde_json::json!({
            "phase": phase.name,
            "turn_phase": state.turn.phase().name(),
            "stage": state.stage,
            "round": state.round,
            "turn": state.turn_number,
            "current_player": state.current_player().map(|p| p.player_id.clone()),
            "columns": columns,
            "meeples": meeples,
            "players": players,
            "pending_advances": state.pending_advances,
            "result": state.result,
        })
    }

    fn get_scores(&self, state: &AuctionState) -> HashMap<PlayerId, u32> {
        state
            .players
            .iter()
            .map(|p| (p.player_id.clone(), p.score))
            .collect()
    }

    fn encode_state(&self, state: &AuctionState) -> serde_json::Value {
        serde_json::to_value(state).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode AuctionState");
            serde_json::Value::Null
        })
    }

    fn decode_state(&self, game_data: &serde_json::Value) -> Result<AuctionState, String> {
        serde_json::from_value(game_data.clone()).map_err(|e| format!("invalid AuctionState: {}", e))
    }
}

/// The externally visible phase for a state.
pub fn phase_for_state(state: &AuctionState) -> Phase {
    let base = serde_json::json!({
        "round": state.round,
        "turn": state.turn_number,
        "player_index": state.current_player_index,
        "turn_phase": state.turn.phase().name(),
    });

    match state.stage {
        Stage::Bidding => {
            let pid = state
                .current_player()
                .map(|p| p.player_id.as_str())
                .unwrap_or("system");
            match state.turn.phase() {
                TurnPhase::ChooseAction if state.turn.is_awaiting_confirmation() => Phase::awaiting(
                    PHASE_CONFIRM_END_TURN,
                    pid,
                    &[ACTION_CONFIRM, ACTION_CANCEL],
                    base,
                ),
                TurnPhase::ChooseAction => Phase::awaiting(
                    PHASE_CHOOSE_ACTION,
                    pid,
                    &[ACTION_COMMIT_BID, ACTION_END_TURN],
                    base,
                ),
                TurnPhase::BeginTurn | TurnPhase::EndTurn => Phase::automatic(PHASE_BEGIN_TURN, base),
            }
        }
        Stage::Resolving => Phase::automatic(PHASE_RESOLVE_WINNERS, base),
        Stage::Advancing => match state.pending_advances.front() {
            Some(pending) => {
                let mut meta = base;
                meta["column"] = serde_json::json!(pending.column);
                meta["value"] = serde_json::json!(pending.value);
                Phase::awaiting(PHASE_ADVANCE_AND_BUMP, &pending.player_id, &[ACTION_ADVANCE], meta)
            }
            None => Phase::automatic(PHASE_ROUND_END, base),
        },
        Stage::RoundEnd => Phase::automatic(PHASE_ROUND_END, base),
        Stage::Finished => Phase {
            name: PHASE_GAME_OVER.into(),
            expected_actions: vec![],
            auto_resolve: false,
            metadata: base,
        },
    }
}

// ------------------------------------------------------------------ //
//  Turn machine plumbing
// ------------------------------------------------------------------ //

/// Bridges the turn machine's hooks to the game state and event list.
struct TurnScope<'a> {
    state: &'a mut AuctionState,
    events: &'a mut Vec<Event>,
}

impl TurnScope<'_> {
    fn current_pid(&self) -> String {
        self.state
            .current_player()
            .map(|p| p.player_id.clone())
            .unwrap_or_default()
    }
}

impl TurnHooks for TurnScope<'_> {
    fn save_state(&mut self) {
        self.events.push(Event::global(
            "save_requested",
            serde_json::json!({
                "turn": self.state.turn_number,
                "round": self.state.round,
            }),
        ));
    }

    fn enable_end_turn(&mut self) {
        let pid = self.current_pid();
        self.events.push(Event::for_player(
            "turn_started",
            &pid,
            serde_json::json!({"turn": self.state.turn_number, "round": self.state.round}),
        ));
        self.events
            .push(Event::for_player("end_turn_enabled", &pid, serde_json::json!({})));
    }

    fn phase_changed(&mut self, phase: TurnPhase) {
        self.events.push(Event::global(
            "turn_phase_changed",
            serde_json::json!({"phase": phase.name()}),
        ));
    }

    fn request_confirmation(&mut self, message: &str) {
        let pid = self.current_pid();
        self.events.push(Event::for_player(
            "confirmation_requested",
            &pid,
            serde_json::json!({"message": message}),
        ));
    }

    fn end_turn(&mut self) -> TurnFlow {
        let s = &mut *self.state;
        s.turn_number += 1;
        s.turns_taken += 1;
        if s.turns_taken >= s.bidding_turns_per_round() {
            tracing::debug!(round = s.round, "bidding complete");
            s.stage = Stage::Resolving;
            return TurnFlow::Hold;
        }
        s.current_player_index = (s.current_player_index + 1) % s.players.len().max(1);
        TurnFlow::Continue
    }
}

fn drive_turn<F>(state: &mut AuctionState, events: &mut Vec<Event>, f: F) -> Result<(), String>
where
    F: FnOnce(&mut TurnMachine, &mut dyn TurnHooks) -> Result<(), String>,
{
    let mut machine = state.turn;
    let result = {
        let mut scope = TurnScope {
            state: &mut *state,
            events,
        };
        f(&mut machine, &mut scope)
    };
    state.turn = machine;
    result
}

// ------------------------------------------------------------------ //
//  Validation
// ------------------------------------------------------------------ //

fn payload_usize(action: &Action, key: &str) -> Option<usize> {
    action.payload.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}

fn validate_commit(state: &AuctionState, action: &Action) -> Option<String> {
    let Some(column) = payload_usize(action, "column") else {
        return Some("commit_bid needs a numeric column".into());
    };
    if column == 0 || column > state.board.columns.len() {
        return Some(format!(
            "column {} does not exist (1..={})",
            column,
            state.board.columns.len()
        ));
    }
    let Some(name) = action.payload.get("card").and_then(|v| v.as_str()) else {
        return Some("commit_bid needs a card name".into());
    };
    let Some(player) = state.player(&action.player_id) else {
        return Some(format!("unknown player {}", action.player_id));
    };
    let Some(card) = player.bid_cards.iter().find(|c| c.name == name && c.is_clear()) else {
        return Some(format!("no unused bid card {} in hand", name));
    };
    if player.committed_on(column).is_some() {
        return Some(format!("already bid on column {} this round", column));
    }
    if !player.can_afford(card.value) {
        return Some(format!(
            "cannot afford a bid of {} with {} coins ({} already committed)",
            card.value,
            player.coins,
            player.committed_total()
        ));
    }
    None
}

fn validate_advance(state: &AuctionState, action: &Action) -> Option<String> {
    let Some(pending) = state.pending_advances.front() else {
        return Some("no column winner is waiting to advance".into());
    };
    let Some(meeple_id) = payload_usize(action, "meeple") else {
        return Some("advance needs a numeric meeple id".into());
    };
    let Some(meeple) = state.board.meeple(meeple_id) else {
        return Some(format!("unknown meeple {}", meeple_id));
    };
    if meeple.owner != action.player_id {
        return Some(format!("meeple {} belongs to {}", meeple_id, meeple.owner));
    }
    if meeple.column != pending.column {
        return Some(format!(
            "meeple {} is in column {}, but column {} was won",
            meeple_id, meeple.column, pending.column
        ));
    }
    let cell = payload_usize(action, "cell");
    let wanted = Advance {
        meeple: meeple_id,
        cell,
    };
    if !state
        .board
        .valid_advances(pending.column, &action.player_id)
        .contains(&wanted)
    {
        return Some(match cell {
            Some(c) => format!("meeple {} cannot move into cell {}", meeple_id, c),
            None => format!("meeple {} cannot move into the top row", meeple_id),
        });
    }
    None
}

// ------------------------------------------------------------------ //
//  Phase handlers
// ------------------------------------------------------------------ //

fn apply_commit(s: &mut AuctionState, action: &Action, events: &mut Vec<Event>) -> Result<(), String> {
    let column = payload_usize(action, "column").ok_or("commit_bid needs a numeric column")?;
    let name = action
        .payload
        .get("card")
        .and_then(|v| v.as_str())
        .ok_or("commit_bid needs a card name")?;
    let player = s
        .player_mut(&action.player_id)
        .ok_or_else(|| format!("unknown player {}", action.player_id))?;
    let card = player
        .bid_cards
        .iter_mut()
        .find(|c| c.name == name && c.is_clear())
        .ok_or_else(|| format!("no unused bid card {} in hand", name))?;
    card.state = BidState::Committed;
    card.column = Some(column);

    events.push(Event::for_player(
        "bid_committed",
        &action.player_id,
        serde_json::json!({"column": column, "card": name}),
    ));
    drive_turn(s, events, |m, h| m.action_done(h))
}

fn apply_resolve_winners(s: &mut AuctionState, events: &mut Vec<Event>) {
    let ledger = BidLedger::from_players(&s.players);
    let n_columns = s.board.columns.len();

    for (column, outcome) in ledger.resolve_all(n_columns, s.rules.tie_policy) {
        mark_bid_cards(&mut s.players, column, &outcome);

        if outcome == ColumnOutcome::NoBids {
            events.push(Event::global("no_bids", serde_json::json!({"column": column})));
            continue;
        }
        for pid in outcome.cancelled() {
            events.push(Event::for_player("bid_cancelled", pid, serde_json::json!({"column": column})));
        }
        for pid in outcome.outbid() {
            events.push(Event::for_player("bid_outbid", pid, serde_json::json!({"column": column})));
        }

        if let ColumnOutcome::Won { winner, value, .. } = &outcome {
            events.push(Event::for_player(
                "column_won",
                winner,
                serde_json::json!({"column": column, "value": value}),
            ));
            if let Some(player) = s.player_mut(winner) {
                let paid = (*value).min(player.coins);
                player.coins -= paid;
                events.push(Event::for_player(
                    "coins_paid",
                    winner,
                    serde_json::json!({"column": column, "amount": paid, "coins": player.coins}),
                ));
            }
            s.pending_advances.push_back(PendingAdvance {
                column,
                player_id: winner.clone(),
                value: *value,
            });
        }
    }

    tracing::debug!(round = s.round, winners = s.pending_advances.len(), "resolved column bids");
    s.stage = Stage::Advancing;
}

/// Drop pending advances whose winner has no legal move. Moves to round end
/// once the queue is empty.
fn skip_forfeited_advances(s: &mut AuctionState, events: &mut Vec<Event>) {
    while let Some(pending) = s.pending_advances.front().cloned() {
        if !s.board.valid_advances(pending.column, &pending.player_id).is_empty() {
            return;
        }
        events.push(Event::for_player(
            "advance_forfeited",
            &pending.player_id,
            serde_json::json!({"column": pending.column}),
        ));
        s.pending_advances.pop_front();
    }
    s.stage = Stage::RoundEnd;
}

fn apply_advance(s: &mut AuctionState, action: &Action, events: &mut Vec<Event>) -> Result<(), String> {
    let pending = s
        .pending_advances
        .front()
        .cloned()
        .ok_or("no column winner is waiting to advance")?;
    if pending.player_id != action.player_id {
        return Err(format!("column {} was won by {}", pending.column, pending.player_id));
    }
    let meeple_id = payload_usize(action, "meeple").ok_or("advance needs a numeric meeple id")?;
    let owned = s
        .board
        .meeple(meeple_id)
        .map(|m| m.owner == pending.player_id && m.column == pending.column)
        .unwrap_or(false);
    if !owned {
        return Err(format!(
            "meeple {} is not {}'s meeple in column {}",
            meeple_id, pending.player_id, pending.column
        ));
    }

    let moved = s.board.advance(meeple_id, payload_usize(action, "cell"))?;
    s.pending_advances.pop_front();

    events.push(Event::for_player(
        "meeple_advanced",
        &pending.player_id,
        serde_json::json!({
            "meeple": moved.meeple,
            "column": moved.column,
            "from": moved.from.to_key(),
            "to": moved.to.to_key(),
        }),
    ));
    if let Some(bumped) = moved.bumped {
        let owner = s.board.meeples[bumped].owner.clone();
        events.push(Event::for_player(
            "meeple_bumped",
            &owner,
            serde_json::json!({
                "meeple": bumped,
                "column": moved.column,
                "to": moved.from.to_key(),
            }),
        ));
    }

    if moved.to == Location::Top {
        let marker = s
            .board
            .column(moved.column)
            .and_then(|c| c.cards.last())
            .map(|c| c.marker_faction());
        if let (Some(faction), Some(player)) = (marker, s.player_mut(&pending.player_id)) {
            player.markers.push(faction);
            events.push(Event::for_player(
                "marker_gained",
                &pending.player_id,
                serde_json::json!({"faction": faction}),
            ));
        }
    }

    if let Some(faction) = s.board.faction_at(moved.column, moved.to) {
        let delta = s
            .player(&pending.player_id)
            .map(|p| color_match_delta(&s.board, p, faction))
            .unwrap_or(0);
        if let Some(player) = s.player_mut(&pending.player_id) {
            player.add_score(delta);
            events.push(Event::for_player(
                "score_delta",
                &pending.player_id,
                serde_json::json!({
                    "delta": delta,
                    "reason": "color_match",
                    "faction": faction,
                    "score": player.score,
                }),
            ));
        }
    }

    Ok(())
}

fn apply_round_end(s: &mut AuctionState, events: &mut Vec<Event>) -> Result<(), String> {
    let rank_scores = score_round_end(&s.board, &s.players);
    let income = s.rules.income;

    for player in s.players.iter_mut() {
        let delta = rank_scores.get(&player.player_id).copied().unwrap_or(0);
        if delta > 0 {
            player.add_score(delta);
            events.push(Event::for_player(
                "score_delta",
                &player.player_id,
                serde_json::json!({
                    "delta": delta,
                    "reason": "rank",
                    "score": player.score,
                }),
            ));
        }
        for card in player.bid_cards.iter_mut() {
            card.clear();
        }
        player.coins = player.coins.saturating_add(income);
    }

    let scores: HashMap<PlayerId, u32> = s
        .players
        .iter()
        .map(|p| (p.player_id.clone(), p.score))
        .collect();
    events.push(Event::global(
        "round_ended",
        serde_json::json!({"round": s.round, "scores": scores}),
    ));

    let max_score = scores.values().copied().max().unwrap_or(0);
    let reason = if max_score >= s.rules.score_threshold {
        Some("score_threshold")
    } else if s.board.top_row_full() {
        Some("top_row_full")
    } else if s.round >= s.rules.max_rounds {
        Some("max_rounds")
    } else {
        None
    };

    if let Some(reason) = reason {
        let mut winners: Vec<PlayerId> = s
            .players
            .iter()
            .filter(|p| p.score == max_score)
            .map(|p| p.player_id.clone())
            .collect();
        winners.sort();
        tracing::info!(round = s.round, reason, ?winners, "game over");
        events.push(Event::global(
            "game_over",
            serde_json::json!({"reason": reason, "winners": winners, "scores": scores}),
        ));
        s.result = Some(GameResult {
            winners,
            final_scores: scores,
            reason: reason.into(),
        });
        s.stage = Stage::Finished;
        return Ok(());
    }

    s.round += 1;
    s.turns_taken = 0;
    s.round_start = (s.round_start + 1) % s.players.len().max(1);
    s.current_player_index = s.round_start;
    s.stage = Stage::Bidding;
    drive_turn(s, events, |m, h| m.start(h))
}
