//! Async session driver. UI commands arrive on an mpsc channel and run one
//! at a time; events flow back on a second channel.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::models::{Action, Event};
use super::plugin::{ACTION_CANCEL, ACTION_CONFIRM};
use super::scenario::ScenarioStore;
use super::session::GameSession;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone)]
pub enum UiCommand {
    Act(Action),
    Close,
}

pub struct DriverHandle<S> {
    commands: mpsc::Sender<UiCommand>,
    pub events: mpsc::UnboundedReceiver<Event>,
    task: JoinHandle<S>,
}

impl<S> DriverHandle<S> {
    pub async fn act(&self, action: Action) -> Result<(), String> {
        self.commands
            .send(UiCommand::Act(action))
            .await
            .map_err(|_| "session driver has stopped".to_string())
    }

    /// Close the session. Returns the store and any events not yet received.
    pub async fn close(mut self) -> Result<(S, Vec<Event>), String> {
        // The driver may already have stopped on game over.
        let _ = self.commands.send(UiCommand::Close).await;
        let store = self
            .task
            .await
            .map_err(|e| format!("session driver panicked: {}", e))?;
        let mut rest = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            rest.push(event);
        }
        Ok((store, rest))
    }
}

/// Spawn the driver task for `session`. `initial` events (from
/// `GameSession::start`) are delivered first.
pub fn spawn_driver<S>(session: GameSession<S>, initial: Vec<Event>) -> DriverHandle<S>
where
    S: ScenarioStore + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let dismiss_delay = Duration::from_millis(session.state().rules.dismiss_delay_ms);

    let task = tokio::spawn(run(session, initial, dismiss_delay, command_rx, event_tx));

    DriverHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

async fn run<S: ScenarioStore>(
    mut session: GameSession<S>,
    initial: Vec<Event>,
    dismiss_delay: Duration,
    mut commands: mpsc::Receiver<UiCommand>,
    events: mpsc::UnboundedSender<Event>,
) -> S {
    for event in initial {
        if events.send(event).is_err() {
            return session.close();
        }
    }

    while let Some(command) = commands.recv().await {
        let action = match command {
            UiCommand::Close => break,
            UiCommand::Act(action) => action,
        };

        // Confirmation continuations wait for the dialog to be dismissed.
        if action.action_type == ACTION_CONFIRM || action.action_type == ACTION_CANCEL {
            tokio::time::sleep(dismiss_delay).await;
        }

        let out = match session.submit(&action) {
            Ok(out) => out,
            Err(reason) => vec![Event::for_player(
                "action_rejected",
                &action.player_id,
                serde_json::json!({"action_type": action.action_type, "reason": reason}),
            )],
        };
        let receiver_gone = out.into_iter().any(|event| events.send(event).is_err());
        if receiver_gone {
            tracing::info!("event receiver dropped, stopping driver");
            break;
        }
        if session.game_over().is_some() {
            tracing::info!("game over, stopping driver");
            break;
        }
    }

    session.close()
}
