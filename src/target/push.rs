//! Push target lifecycle
//!
//! All methods run on the control thread. `start` and `stop` only initiate a
//! transition; completion arrives later as an [`OutputEvent`] applied through
//! [`PushTarget::apply`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::host::HostEvent;

use super::config::TargetConfig;
use super::output::{OutputContext, OutputEvent, OutputEventKind, OutputHandle};
use super::state::{TargetState, TargetStatus};
use super::TargetId;

/// One configured outbound streaming session
///
/// Invariant: an output handle exists iff the state is `Starting`,
/// `Streaming` or `Stopping`.
pub struct PushTarget {
    id: TargetId,
    config: TargetConfig,
    state: TargetState,
    last_error: Option<Error>,
    streaming_since: Option<Instant>,
    output: Option<OutputHandle>,
    /// Bumped on every start so late events from an earlier attempt are ignored
    generation: u64,
    ctx: Arc<OutputContext>,
}

impl PushTarget {
    /// Create an idle target from an already validated config
    pub(crate) fn new(id: TargetId, config: TargetConfig, ctx: Arc<OutputContext>) -> Self {
        Self {
            id,
            config,
            state: TargetState::Idle,
            last_error: None,
            streaming_since: None,
            output: None,
            generation: 0,
            ctx,
        }
    }

    /// Build an idle target from a persisted configuration record
    pub(crate) fn from_config(id: TargetId, value: &Value, ctx: Arc<OutputContext>) -> Result<Self> {
        let config = TargetConfig::from_value(value)?;
        Ok(Self::new(id, config, ctx))
    }

    /// Serialize the configuration; runtime state is never included
    pub fn to_config(&self) -> Value {
        self.config.to_value()
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Whether an output handle is currently held
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Current state, last error and streaming start time
    pub fn status(&self) -> TargetStatus {
        TargetStatus {
            state: self.state,
            last_error: self.last_error.clone(),
            streaming_since: self.streaming_since,
        }
    }

    /// Replace the configuration after validating it
    ///
    /// On error the previous configuration is kept. A running output keeps
    /// its settings until the next start.
    pub fn configure(&mut self, config: TargetConfig) -> Result<()> {
        config.validate()?;

        if self.state.has_output() {
            tracing::info!(
                target = %self.id,
                state = ?self.state,
                "Configuration changed, applies on next start"
            );
        }

        self.config = config;
        Ok(())
    }

    /// Start pushing
    ///
    /// Only acts in `Idle` or `Error`; anywhere else it is a no-op so a
    /// target never holds two connections to the same endpoint. Returns
    /// whether a new attempt was made.
    pub fn start(&mut self) -> bool {
        if !self.state.can_start() {
            tracing::debug!(target = %self.id, state = ?self.state, "Start ignored");
            return false;
        }

        self.generation += 1;
        self.last_error = None;
        self.streaming_since = None;

        match self.ctx.factory.create(&self.config) {
            Ok(output) => {
                self.output = Some(OutputHandle::spawn(
                    &self.ctx,
                    output,
                    self.id,
                    self.generation,
                ));
                self.state = TargetState::Starting;

                tracing::info!(
                    target = %self.id,
                    name = %self.config.name,
                    server = %self.config.server,
                    generation = self.generation,
                    "Push target starting"
                );
            }
            Err(err) => {
                tracing::warn!(target = %self.id, error = %err, "Failed to create output");
                self.state = TargetState::Error;
                self.last_error = Some(err);
            }
        }

        true
    }

    /// Stop pushing
    ///
    /// Always converges to `Idle`, including while a connect is still in
    /// flight. A no-op when already `Idle` or `Stopping`.
    pub fn stop(&mut self) {
        match self.state {
            TargetState::Idle | TargetState::Stopping => {
                tracing::debug!(target = %self.id, state = ?self.state, "Stop ignored");
            }
            TargetState::Error => {
                self.state = TargetState::Idle;
                tracing::info!(target = %self.id, "Push target reset");
            }
            TargetState::Starting | TargetState::Streaming => {
                self.streaming_since = None;
                match self.output.as_mut() {
                    Some(handle) => {
                        handle.request_stop();
                        self.state = TargetState::Stopping;
                    }
                    None => self.state = TargetState::Idle,
                }
                tracing::info!(target = %self.id, "Push target stopping");
            }
        }
    }

    /// Apply progress reported by this target's output task
    pub(crate) fn apply(&mut self, event: OutputEvent) {
        if event.generation != self.generation {
            tracing::debug!(
                target = %self.id,
                generation = event.generation,
                current = self.generation,
                "Stale output event ignored"
            );
            return;
        }

        match (self.state, event.kind) {
            (TargetState::Starting, OutputEventKind::Connected) => {
                self.state = TargetState::Streaming;
                self.streaming_since = Some(Instant::now());
                tracing::info!(target = %self.id, "Push target streaming");
            }
            (TargetState::Starting | TargetState::Streaming, OutputEventKind::Failed(err)) => {
                tracing::warn!(target = %self.id, error = %err, "Push target failed");
                self.output = None;
                self.streaming_since = None;
                self.state = TargetState::Error;
                self.last_error = Some(err);
            }
            (TargetState::Stopping, OutputEventKind::Failed(err)) => {
                tracing::debug!(target = %self.id, error = %err, "Failure while stopping");
                self.release();
            }
            (state, OutputEventKind::Released) if state.has_output() => {
                self.release();
            }
            (state, kind) => {
                tracing::debug!(target = %self.id, ?state, ?kind, "Output event ignored");
            }
        }
    }

    /// React to a host lifecycle event
    ///
    /// Runs inside the router's fan-out, so it only initiates transitions.
    pub fn on_event(&mut self, event: &HostEvent) {
        match event {
            HostEvent::StreamingStarted if self.config.sync_start => {
                self.start();
            }
            HostEvent::StreamingStopped if self.config.sync_start => {
                self.stop();
            }
            HostEvent::FinishedLoading if self.config.resume_pending => {
                self.config.resume_pending = false;
                tracing::info!(target = %self.id, "Resuming after restart");
                self.start();
            }
            HostEvent::Exit => {
                self.config.resume_pending =
                    self.config.resume_after_restart && self.state.is_live();
                self.stop();
            }
            _ => {}
        }
    }

    /// Stop and hand over the output task so the caller can await it
    pub(crate) fn into_release_task(mut self) -> Option<tokio::task::JoinHandle<()>> {
        self.stop();
        self.output.take().map(OutputHandle::into_task)
    }

    fn release(&mut self) {
        self.output = None;
        self.streaming_since = None;
        self.state = TargetState::Idle;
        tracing::info!(target = %self.id, "Push target stopped");
    }
}

impl std::fmt::Debug for PushTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushTarget")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}
