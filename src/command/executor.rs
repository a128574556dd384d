//! Execution engine - runs an action list against the robot, one step at a time

use super::handlers::{self, Step};
use crate::connection::ConnectionManager;
use crate::transport::{Transport, TransportError};
use roverlink_shared::{
    timing, Action, EncodingError, EngineEvent, EngineState, EngineStateMachine, WireCommand,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Configuration for the execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay applied after every queued action
    pub settle_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(timing::SETTLE_DELAY_MS),
        }
    }
}

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not connected to robot")]
    NotConnected,

    #[error("action #{index} {action} cannot be encoded: {source}")]
    Encoding {
        index: usize,
        action: String,
        #[source]
        source: EncodingError,
    },

    #[error("command {command} failed: {source}")]
    Transmission {
        command: WireCommand,
        #[source]
        source: TransportError,
    },
}

/// How a call to [`ExecutionEngine::run`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every action executed
    Completed { executed: usize },
    /// Cancel observed between actions
    Cancelled { executed: usize },
    /// Another session was already active; nothing was done
    Rejected,
}

/// State of one run of the queue
#[derive(Debug, Clone)]
pub struct ExecutionSession {
    pub queue: Vec<Action>,
    pub cursor: usize,
    pub cancelled: bool,
}

/// Read-only view of the active session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub cursor: usize,
    pub total: usize,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct EngineSlot {
    fsm: EngineStateMachine,
    session: Option<ExecutionSession>,
}

type SharedSlot = Arc<Mutex<EngineSlot>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, EngineSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Next {
    Action(usize, Action),
    Cancelled,
    Exhausted,
}

/// Owns the session for the duration of a run
///
/// Dropping the guard tears the session down and returns the engine to Idle,
/// whether the run completed, failed, or its future was dropped.
struct SessionGuard {
    slot: SharedSlot,
    exit: EngineEvent,
}

impl SessionGuard {
    /// Open a session, or `None` if one is already active
    fn open(slot: &SharedSlot, queue: Vec<Action>) -> Option<Self> {
        let mut guard = lock(slot);
        if !guard.fsm.process_event(EngineEvent::RunRequested).is_success() {
            return None;
        }
        guard.session = Some(ExecutionSession {
            queue,
            cursor: 0,
            cancelled: false,
        });
        Some(Self {
            slot: slot.clone(),
            exit: EngineEvent::Failed,
        })
    }

    fn next(&self) -> Next {
        let guard = lock(&self.slot);
        match guard.session.as_ref() {
            Some(session) if session.cancelled => Next::Cancelled,
            Some(session) => match session.queue.get(session.cursor) {
                Some(action) => Next::Action(session.cursor, action.clone()),
                None => Next::Exhausted,
            },
            None => Next::Exhausted,
        }
    }

    fn advance(&self) {
        if let Some(session) = lock(&self.slot).session.as_mut() {
            session.cursor += 1;
        }
    }

    fn finish(mut self, exit: EngineEvent) {
        self.exit = exit;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut guard = lock(&self.slot);
        guard.session = None;
        if let Err(e) = guard.fsm.process_event(self.exit).into_result() {
            error!("Session teardown rejected: {}", e);
        }
    }
}

/// Executes action lists against the connected robot
pub struct ExecutionEngine {
    transport: Arc<dyn Transport>,
    connection: Arc<ConnectionManager>,
    config: EngineConfig,
    slot: SharedSlot,
}

impl ExecutionEngine {
    /// Create a new idle engine
    pub fn new(
        transport: Arc<dyn Transport>,
        connection: Arc<ConnectionManager>,
        config: EngineConfig,
    ) -> Self {
        Self {
            transport,
            connection,
            config,
            slot: Arc::new(Mutex::new(EngineSlot::default())),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.slot).fsm.is_running()
    }

    pub fn state(&self) -> EngineState {
        lock(&self.slot).fsm.state()
    }

    /// Progress of the active session, if any
    pub fn progress(&self) -> Option<SessionProgress> {
        lock(&self.slot)
            .session
            .as_ref()
            .map(|session| SessionProgress {
                cursor: session.cursor,
                total: session.queue.len(),
                cancelled: session.cancelled,
            })
    }

    /// Run `actions` in order
    ///
    /// Returns [`RunOutcome::Rejected`] immediately if a run is already in
    /// progress. Cancellation is only observed between actions; waits inside
    /// an action always run to completion.
    pub async fn run(&self, actions: Vec<Action>) -> Result<RunOutcome, EngineError> {
        let total = actions.len();
        let session = match SessionGuard::open(&self.slot, actions) {
            Some(session) => session,
            None => {
                warn!("Run requested while another run is active, ignoring");
                return Ok(RunOutcome::Rejected);
            }
        };

        if !self.connection.is_connected().await {
            error!("Run aborted: not connected to robot");
            return Err(EngineError::NotConnected);
        }

        info!("Run started: {} action(s)", total);
        let mut executed = 0;

        loop {
            let (index, action) = match session.next() {
                Next::Action(index, action) => (index, action),
                Next::Cancelled => {
                    info!("Run cancelled after {}/{} action(s)", executed, total);
                    session.finish(EngineEvent::CancelSettled);
                    return Ok(RunOutcome::Cancelled { executed });
                }
                Next::Exhausted => break,
            };

            let steps = handlers::plan(&action).map_err(|source| {
                error!("Action #{} {} rejected: {}", index, action, source);
                EngineError::Encoding {
                    index,
                    action: action.to_string(),
                    source,
                }
            })?;

            debug!(
                "Executing action #{} {} ({} command(s))",
                index,
                action,
                handlers::transmissions(&steps)
            );

            for step in steps {
                match step {
                    Step::Transmit(command) => self.transmit(&command).await?,
                    Step::Wait(duration) => tokio::time::sleep(duration).await,
                }
            }

            executed += 1;
            session.advance();
            tokio::time::sleep(self.config.settle_delay).await;
        }

        info!("Run completed: {} action(s)", executed);
        session.finish(EngineEvent::Completed);
        Ok(RunOutcome::Completed { executed })
    }

    /// Request cancellation and halt the robot
    ///
    /// Marks the active session cancelled (if any) and sends a Stop command
    /// straight away, without waiting for the queue to unwind.
    pub async fn cancel(&self) -> Result<(), EngineError> {
        if let Some(session) = lock(&self.slot).session.as_mut() {
            if !session.cancelled {
                info!(
                    "Cancel requested at action {}/{}",
                    session.cursor,
                    session.queue.len()
                );
            }
            session.cancelled = true;
        }

        if !self.connection.is_connected().await {
            debug!("Cancel: not connected, no stop sent");
            return Ok(());
        }

        self.transmit(&WireCommand::stop()).await
    }

    /// Send one command, failing if the connection has gone away
    async fn transmit(&self, command: &WireCommand) -> Result<(), EngineError> {
        let endpoint = self
            .connection
            .endpoint()
            .await
            .ok_or(EngineError::NotConnected)?;

        debug!("-> {}", command);

        match self.transport.send_command(&endpoint, command).await {
            Ok(reply) => {
                if let Some(reply) = reply {
                    debug!("<- {}", reply.trim());
                }
                Ok(())
            }
            Err(source) => {
                error!("Command {} failed: {}", command, source);
                Err(EngineError::Transmission {
                    command: *command,
                    source,
                })
            }
        }
    }
}
