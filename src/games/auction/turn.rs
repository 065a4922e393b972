//! Turn phase machine: `BeginTurn -> ChooseAction -> EndTurn -> BeginTurn`.
//!
//! The machine holds no game data. Everything it needs from the outside
//! world (saving, bookkeeping, UI notifications) goes through [`TurnHooks`],
//! and action completion arrives as an explicit [`TurnMachine::action_done`]
//! call rather than as a side effect of some shared flag being set.

use serde::{Deserialize, Serialize};

pub const UNUSED_ACTION_PROMPT: &str = "You have an unused action. End your turn anyway?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    BeginTurn,
    ChooseAction,
    EndTurn,
}

impl TurnPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::BeginTurn => "BeginTurn",
            TurnPhase::ChooseAction => "ChooseAction",
            TurnPhase::EndTurn => "EndTurn",
        }
    }
}

/// What the machine does after end-of-turn bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFlow {
    /// Start the next turn right away.
    Continue,
    /// Park in `BeginTurn`; someone else calls `start` later.
    Hold,
}

pub trait TurnHooks {
    /// Persist the game state. Called once per `BeginTurn.start`.
    fn save_state(&mut self);
    fn enable_end_turn(&mut self);
    fn phase_changed(&mut self, phase: TurnPhase);
    fn request_confirmation(&mut self, message: &str);
    /// Score finalisation and player rotation.
    fn end_turn(&mut self) -> TurnFlow;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMachine {
    phase: TurnPhase,
    action_done: bool,
    awaiting_confirmation: bool,
}

impl Default for TurnMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnMachine {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::BeginTurn,
            action_done: false,
            awaiting_confirmation: false,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_action_done(&self) -> bool {
        self.action_done
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    /// Run `BeginTurn.start` and whatever it chains into.
    pub fn start(&mut self, hooks: &mut dyn TurnHooks) -> Result<(), String> {
        if self.phase != TurnPhase::BeginTurn {
            return Err(format!("cannot start a turn during {}", self.phase.name()));
        }
        self.run(hooks);
        Ok(())
    }

    /// The player completed the turn's action.
    pub fn action_done(&mut self, hooks: &mut dyn TurnHooks) -> Result<(), String> {
        self.expect_choosing()?;
        if self.action_done {
            return Err("the action for this turn is already done".into());
        }
        self.action_done = true;
        self.run(hooks);
        Ok(())
    }

    /// The player pressed end turn. With an unused action and `ok == false`
    /// this asks for confirmation instead of ending the turn.
    pub fn done(&mut self, ok: bool, hooks: &mut dyn TurnHooks) -> Result<(), String> {
        self.expect_choosing()?;
        if !self.action_done && !ok {
            self.awaiting_confirmation = true;
            hooks.request_confirmation(UNUSED_ACTION_PROMPT);
            return Ok(());
        }
        self.enter(TurnPhase::EndTurn, hooks);
        Ok(())
    }

    /// Confirmation accepted: the action counts as done and the turn ends.
    pub fn confirm(&mut self, hooks: &mut dyn TurnHooks) -> Result<(), String> {
        self.expect_confirmation()?;
        self.awaiting_confirmation = false;
        self.action_done = true;
        self.enter(TurnPhase::EndTurn, hooks);
        Ok(())
    }

    /// Confirmation dismissed: `ChooseAction.start` runs again.
    pub fn cancel(&mut self, hooks: &mut dyn TurnHooks) -> Result<(), String> {
        self.expect_confirmation()?;
        self.awaiting_confirmation = false;
        self.enter(TurnPhase::ChooseAction, hooks);
        Ok(())
    }

    fn expect_choosing(&self) -> Result<(), String> {
        if self.phase != TurnPhase::ChooseAction {
            return Err(format!("no action can be taken during {}", self.phase.name()));
        }
        if self.awaiting_confirmation {
            return Err("a confirmation is pending".into());
        }
        Ok(())
    }

    fn expect_confirmation(&self) -> Result<(), String> {
        if self.phase != TurnPhase::ChooseAction || !self.awaiting_confirmation {
            return Err("no confirmation is pending".into());
        }
        Ok(())
    }

    fn enter(&mut self, phase: TurnPhase, hooks: &mut dyn TurnHooks) {
        self.phase = phase;
        hooks.phase_changed(phase);
        self.run(hooks);
    }

    /// Run the current phase's `start` until the machine has to wait.
    fn run(&mut self, hooks: &mut dyn TurnHooks) {
        loop {
            let next = match self.phase {
                TurnPhase::BeginTurn => {
                    self.action_done = false;
                    self.awaiting_confirmation = false;
                    hooks.save_state();
                    hooks.enable_end_turn();
                    TurnPhase::ChooseAction
                }
                TurnPhase::ChooseAction => {
                    if !self.action_done {
                        return;
                    }
                    TurnPhase::EndTurn
                }
                TurnPhase::EndTurn => {
                    let flow = hooks.end_turn();
                    self.phase = TurnPhase::BeginTurn;
                    hooks.phase_changed(TurnPhase::BeginTurn);
                    if flow == TurnFlow::Hold {
                        return;
                    }
                    continue;
                }
            };
            self.phase = next;
            hooks.phase_changed(next);
        }
    }
}
