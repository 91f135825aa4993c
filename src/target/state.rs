//! Target runtime state

use std::time::{Duration, Instant};

use crate::error::Error;

/// Lifecycle state of a push target
///
/// ```text
///            start()             connected
///   Idle ───────────► Starting ───────────► Streaming
///    ▲  ▲                │ failed              │ failed
///    │  │ stop()         ▼                     ▼
///    │  └──────────── Error ◄──────────────────┘
///    │
///    └──── Stopping ◄── stop() (from Starting / Streaming)
///           released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No output; may be started
    Idle,
    /// Output created, connecting
    Starting,
    /// Connected and pushing media
    Streaming,
    /// Stop requested, waiting for the output to release
    Stopping,
    /// Last attempt failed; may be started again
    Error,
}

impl TargetState {
    /// Whether an output handle exists in this state
    pub fn has_output(self) -> bool {
        matches!(
            self,
            TargetState::Starting | TargetState::Streaming | TargetState::Stopping
        )
    }

    /// Whether `start()` would begin a new attempt
    pub fn can_start(self) -> bool {
        matches!(self, TargetState::Idle | TargetState::Error)
    }

    /// Connecting or connected
    pub fn is_live(self) -> bool {
        matches!(self, TargetState::Starting | TargetState::Streaming)
    }
}

/// Snapshot returned by `PushTarget::status`
#[derive(Debug, Clone, PartialEq)]
pub struct TargetStatus {
    /// Current state
    pub state: TargetState,
    /// Diagnostic of the last failed attempt
    pub last_error: Option<Error>,
    /// When the target reached `Streaming`
    pub streaming_since: Option<Instant>,
}

impl TargetStatus {
    /// Time spent streaming so far
    pub fn uptime(&self) -> Option<Duration> {
        self.streaming_since.map(|since| since.elapsed())
    }
}
