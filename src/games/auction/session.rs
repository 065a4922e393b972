//! A running game: plugin, simulation state, and the scenario store the
//! turn machine saves into at the start of every turn.

use crate::engine::models::*;
use crate::engine::plugin::GamePlugin;
use crate::engine::simulator::{apply_action_and_resolve, resolve_auto, SimulationState};
use super::cards::SessionContext;
use super::plugin::{phase_for_state, AuctionPlugin};
use super::scenario::{Scenario, ScenarioError, ScenarioStore};
use super::types::AuctionState;

pub struct GameSession<S: ScenarioStore> {
    plugin: AuctionPlugin,
    sim: SimulationState<AuctionState>,
    store: S,
    saves: usize,
}

impl<S: ScenarioStore> GameSession<S> {
    /// Deal a new game and run it up to the first player decision.
    pub fn start(
        context: SessionContext,
        players: Vec<Player>,
        config: &GameConfig,
        store: S,
    ) -> Result<(Self, Vec<Event>), String> {
        let plugin = AuctionPlugin::new(context);
        let (state, phase, mut events) = plugin.create_initial_state(&players, config)?;
        let mut session = Self {
            plugin,
            sim: SimulationState::new(state, phase, players),
            store,
            saves: 0,
        };
        events.extend(session.settle());
        tracing::info!(
            players = session.sim.players.len(),
            seed = ?config.random_seed,
            phase = %session.sim.phase.name,
            "session started"
        );
        Ok((session, events))
    }

    /// Continue a saved game.
    pub fn resume(context: SessionContext, scenario: &Scenario, store: S) -> Result<(Self, Vec<Event>), ScenarioError> {
        let state = scenario.restore(&context)?;
        let players: Vec<Player> = state
            .players
            .iter()
            .enumerate()
            .map(|(seat, p)| Player {
                player_id: p.player_id.clone(),
                display_name: p.player_id.clone(),
                seat_index: seat as i32,
                is_bot: false,
                bot_id: None,
            })
            .collect();
        let phase = phase_for_state(&state);
        let plugin = AuctionPlugin::new(context);
        let mut sim = SimulationState::new(state, phase, players);
        sim.scores = plugin.get_scores(&sim.state);
        sim.game_over = sim.state.result.clone();
        let mut session = Self {
            plugin,
            sim,
            store,
            saves: 0,
        };
        let events = session.settle();
        tracing::info!(
            round = session.sim.state.round,
            turn = session.sim.state.turn_number,
            phase = %session.sim.phase.name,
            "session resumed"
        );
        Ok((session, events))
    }

    /// Validate and apply one action. Rejected actions leave the game
    /// untouched and return the reason.
    pub fn submit(&mut self, action: &Action) -> Result<Vec<Event>, String> {
        if let Some(reason) = self.plugin.validate_action(&self.sim.state, &self.sim.phase, action) {
            tracing::debug!(player = %action.player_id, action = %action.action_type, %reason, "rejected action");
            return Err(reason);
        }
        let events = apply_action_and_resolve(&self.plugin, &mut self.sim, action);
        self.save_if_requested(&events);
        Ok(events)
    }

    pub fn plugin(&self) -> &AuctionPlugin {
        &self.plugin
    }

    pub fn state(&self) -> &AuctionState {
        &self.sim.state
    }

    pub fn phase(&self) -> &Phase {
        &self.sim.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.sim.players
    }

    pub fn game_over(&self) -> Option<&GameResult> {
        self.sim.game_over.as_ref()
    }

    pub fn valid_actions(&self, player_id: &str) -> Vec<serde_json::Value> {
        self.plugin.get_valid_actions(&self.sim.state, &self.sim.phase, player_id)
    }

    pub fn view(&self, player_id: Option<&str>) -> serde_json::Value {
        self.plugin.get_player_view(&self.sim.state, &self.sim.phase, player_id)
    }

    pub fn scenario(&self) -> Scenario {
        Scenario::capture(&self.sim.state)
    }

    /// Successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tear down the session and its context, handing back the store.
    pub fn close(self) -> S {
        tracing::info!(
            round = self.sim.state.round,
            turn = self.sim.state.turn_number,
            saves = self.saves,
            finished = self.sim.game_over.is_some(),
            "session closed, releasing card catalog"
        );
        self.store
    }

    fn settle(&mut self) -> Vec<Event> {
        let events = resolve_auto(&self.plugin, &mut self.sim);
        self.save_if_requested(&events);
        events
    }

    fn save_if_requested(&mut self, events: &[Event]) {
        if !events.iter().any(|e| e.event_type == "save_requested") {
            return;
        }
        let scenario = Scenario::capture(&self.sim.state);
        match self.store.save(&scenario) {
            Ok(()) => {
                self.saves += 1;
                tracing::debug!(turn = scenario.turn, round = scenario.round, "saved scenario");
            }
            Err(e) => {
                tracing::warn!(error = %e, turn = scenario.turn, "scenario save failed, continuing");
            }
        }
    }
}
