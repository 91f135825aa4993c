//! Push targets
//!
//! A push target is one configured outbound stream: its settings, its
//! runtime state, and (while active) the output pushing media to the remote
//! endpoint.

pub mod config;
pub mod output;
pub mod push;
pub mod state;

pub use config::TargetConfig;
pub use output::{Output, OutputEvent, OutputEventKind, OutputFactory, Reporter};
pub use push::PushTarget;
pub use state::{TargetState, TargetStatus};

/// Opaque handle to a target inside its registry
///
/// Allocated by the registry and never persisted; a handle stops resolving
/// once its target is removed or replaced by a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "target-{}", self.0)
    }
}
