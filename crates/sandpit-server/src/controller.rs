//! The preview state machine.
//!
//! One controller drives one boundary through the cycle
//! `select -> prepare -> load -> outcome`. It is not thread-safe by itself;
//! [`crate::runner`] serialises every event through a single task.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sandpit_sandbox::{PipelineError, SandboxPipeline, SourceArtifact, REMEDIATION_HINTS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::boundary::Boundary;
use crate::bridge::{BridgeMessage, ExecutionId, ExecutionOutcome, OutcomeKind};
use crate::handles::{ExecutionHandle, HandleStore};

/// Observable preview state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreviewState {
    /// Nothing selected
    Idle,

    /// Selected source is not a component
    Unsupported,

    /// Document loaded, waiting for its outcome
    Executing { execution: ExecutionId },

    Success {
        execution: ExecutionId,
        at: DateTime<Utc>,
    },

    /// Relayed runtime error, or a document that could not be built
    /// (`execution` is `None` then).
    Error {
        execution: Option<ExecutionId>,
        message: String,
        at: DateTime<Utc>,
    },
}

impl PreviewState {
    pub fn is_executing(&self) -> bool {
        matches!(self, Self::Executing { .. })
    }
}

/// When a live handle gets released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
    /// As soon as the execution reports its outcome
    #[default]
    OnOutcome,

    /// A fixed delay after loading, whether or not an outcome arrived
    FixedDelay(Duration),
}

/// Schedules delayed releases for [`ReleasePolicy::FixedDelay`].
///
/// When a timer fires, whoever owns the controller must call
/// [`PreviewController::release_due`] with the scheduled execution.
pub trait ReleaseTimer: Send {
    fn schedule(&mut self, execution: ExecutionId, delay: Duration);
    fn cancel(&mut self, execution: ExecutionId);
}

/// Timer for controllers that never release on a delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimer;

impl ReleaseTimer for NoTimer {
    fn schedule(&mut self, execution: ExecutionId, _delay: Duration) {
        tracing::warn!("No release timer configured, execution {} keeps its handle", execution);
    }

    fn cancel(&mut self, _execution: ExecutionId) {}
}

/// Inputs a controller reacts to.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// New selection; `None` clears it
    Select(Option<SourceArtifact>),

    /// Re-run the current selection
    Refresh,

    /// Raw message posted by a sandbox
    Bridge(Value),

    /// A fixed-delay release timer fired
    ReleaseDue(ExecutionId),

    /// Tear the controller down
    Shutdown,
}

/// Status snapshot shown by the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    #[serde(flatten)]
    pub state: PreviewState,

    pub filename: Option<String>,
    pub identity: Option<String>,

    /// Remediation hints, only present with a relayed execution error
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

#[derive(Debug)]
struct LiveExecution {
    id: ExecutionId,
    handle: ExecutionHandle,
    released: bool,
}

/// Drives one boundary through preview cycles.
pub struct PreviewController {
    pipeline: SandboxPipeline,
    store: HandleStore,
    boundary: Box<dyn Boundary>,
    timer: Box<dyn ReleaseTimer>,
    policy: ReleasePolicy,
    source: Option<SourceArtifact>,
    identity: Option<String>,
    state: PreviewState,
    live: Option<LiveExecution>,
    last_execution: ExecutionId,
    torn_down: bool,
}

impl PreviewController {
    /// Create an idle controller releasing handles on outcome.
    pub fn new(pipeline: SandboxPipeline, store: HandleStore, boundary: Box<dyn Boundary>) -> Self {
        Self {
            pipeline,
            store,
            boundary,
            timer: Box::new(NoTimer),
            policy: ReleasePolicy::OnOutcome,
            source: None,
            identity: None,
            state: PreviewState::Idle,
            live: None,
            last_execution: ExecutionId::new(0),
            torn_down: false,
        }
    }

    /// Use a different release policy and the timer backing it.
    pub fn with_release_policy(mut self, policy: ReleasePolicy, timer: Box<dyn ReleaseTimer>) -> Self {
        self.policy = policy;
        self.timer = timer;
        self
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn source(&self) -> Option<&SourceArtifact> {
        self.source.as_ref()
    }

    /// Identity of the component currently previewed.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn store(&self) -> &HandleStore {
        &self.store
    }

    pub fn release_policy(&self) -> ReleasePolicy {
        self.policy
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Handle of the current execution while it is still live.
    pub fn live_handle(&self) -> Option<&ExecutionHandle> {
        self.live
            .as_ref()
            .filter(|live| !live.released)
            .map(|live| &live.handle)
    }

    pub fn view(&self) -> StatusView {
        let hints = match &self.state {
            PreviewState::Error {
                execution: Some(_), ..
            } => REMEDIATION_HINTS.iter().map(|h| h.to_string()).collect(),
            _ => Vec::new(),
        };

        StatusView {
            state: self.state.clone(),
            filename: self.source.as_ref().map(|s| s.filename.clone()),
            identity: self.identity.clone(),
            hints,
        }
    }

    /// Dispatch one event.
    pub fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Select(artifact) => self.select(artifact),
            ControllerEvent::Refresh => self.refresh(),
            ControllerEvent::Bridge(raw) => {
                self.on_message(&raw);
            }
            ControllerEvent::ReleaseDue(execution) => self.release_due(execution),
            ControllerEvent::Shutdown => self.teardown(),
        }
    }

    /// Replace the selection and run it. Empty or absent source goes idle.
    pub fn select(&mut self, artifact: Option<SourceArtifact>) {
        if self.torn_down {
            return;
        }

        match artifact.filter(|a| !a.text.is_empty()) {
            Some(artifact) => {
                tracing::info!("Selected {}", artifact.filename);
                self.source = Some(artifact);
                self.run();
            }
            None => {
                self.source = None;
                self.identity = None;
                self.retire_live();
                self.boundary.clear();
                self.set_state(PreviewState::Idle);
            }
        }
    }

    /// Re-run the current selection with a fresh handle and execution id.
    pub fn refresh(&mut self) {
        if self.torn_down {
            return;
        }
        if self.source.is_none() {
            tracing::debug!("Refresh ignored, nothing selected");
            return;
        }
        self.run();
    }

    /// Feed a raw bridge message. Returns whether it changed the state.
    pub fn on_message(&mut self, raw: &Value) -> bool {
        match BridgeMessage::parse(raw) {
            Some(message) => self.accept(message.into_outcome(Utc::now())),
            None => {
                tracing::trace!("Ignoring unrecognised message");
                false
            }
        }
    }

    /// Apply an outcome if it belongs to the current execution.
    pub fn accept(&mut self, outcome: ExecutionOutcome) -> bool {
        if self.torn_down {
            return false;
        }

        let PreviewState::Executing { execution } = self.state else {
            tracing::debug!("Ignoring outcome outside an execution");
            return false;
        };

        if let Some(claimed) = outcome.execution {
            if claimed != execution {
                tracing::debug!("Ignoring stale outcome from execution {}", claimed);
                return false;
            }
        }

        if self.policy == ReleasePolicy::OnOutcome {
            if let Some(live) = self.live.as_mut() {
                release(live, &self.store, self.timer.as_mut(), self.boundary.as_mut());
            }
        }

        let state = match outcome.kind {
            OutcomeKind::Success => {
                tracing::info!("Execution {} succeeded", execution);
                PreviewState::Success {
                    execution,
                    at: outcome.at,
                }
            }
            OutcomeKind::Error { message } => {
                tracing::warn!("Execution {} failed: {}", execution, message);
                PreviewState::Error {
                    execution: Some(execution),
                    message,
                    at: outcome.at,
                }
            }
        };
        self.set_state(state);

        true
    }

    /// Release the handle of `execution` if it is still live.
    pub fn release_due(&mut self, execution: ExecutionId) {
        match self.live.as_mut() {
            Some(live) if live.id == execution => {
                release(live, &self.store, self.timer.as_mut(), self.boundary.as_mut())
            }
            _ => tracing::trace!("Release timer for {} outlived its execution", execution),
        }
    }

    /// Release everything this controller holds and stop reacting to events.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.retire_live();
        self.boundary.clear();
        self.torn_down = true;
        tracing::debug!("Preview controller torn down");
    }

    fn run(&mut self) {
        let Some(artifact) = self.source.as_ref() else {
            return;
        };

        match self.pipeline.prepare(artifact) {
            Ok(prepared) => {
                self.retire_live();

                self.last_execution = self.last_execution.next();
                let execution = self.last_execution;
                let handle = self.store.create(&prepared.document);

                self.boundary.load(execution, &handle);
                if let ReleasePolicy::FixedDelay(delay) = self.policy {
                    self.timer.schedule(execution, delay);
                }

                tracing::info!("Executing {} as execution {}", prepared.identity, execution);

                self.live = Some(LiveExecution {
                    id: execution,
                    handle,
                    released: false,
                });
                self.identity = Some(prepared.identity);
                self.set_state(PreviewState::Executing { execution });
            }
            Err(PipelineError::Unsupported) => {
                tracing::info!("{} is not a component", artifact.filename);
                self.identity = None;
                self.retire_live();
                self.boundary.clear();
                self.set_state(PreviewState::Unsupported);
            }
            Err(e @ PipelineError::Build(_)) => {
                tracing::error!("Failed to build sandbox for {}: {}", artifact.filename, e);
                self.identity = None;
                self.retire_live();
                self.boundary.clear();
                self.set_state(PreviewState::Error {
                    execution: None,
                    message: e.to_string(),
                    at: Utc::now(),
                });
            }
        }
    }

    /// Drop the live execution, releasing its handle if still held.
    fn retire_live(&mut self) {
        if let Some(mut live) = self.live.take() {
            release(&mut live, &self.store, self.timer.as_mut(), self.boundary.as_mut());
        }
    }

    fn set_state(&mut self, state: PreviewState) {
        tracing::debug!("Preview state {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

impl Drop for PreviewController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn release(
    live: &mut LiveExecution,
    store: &HandleStore,
    timer: &mut dyn ReleaseTimer,
    boundary: &mut dyn Boundary,
) {
    if live.released {
        return;
    }
    timer.cancel(live.id);
    store.release(&live.handle);
    boundary.released(live.id);
    live.released = true;
}
