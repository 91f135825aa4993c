//! Host lifecycle events

use crate::error::Result;

/// A notification from the host application about a global state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    StreamingStarting,
    /// The host's own main stream went live
    StreamingStarted,
    StreamingStopping,
    StreamingStopped,
    RecordingStarted,
    RecordingStopped,
    /// The host finished loading its UI and modules
    FinishedLoading,
    ProfileChanging,
    /// Another profile became active; its stored configuration applies
    ProfileChanged,
    /// The host is exiting; configuration is persisted after fan-out
    Exit,
    /// Any other host event, passed to targets unchanged
    Other(u32),
}

/// Receives host events on whatever thread the host delivers them
pub trait HostListener: Send + Sync {
    /// Handle one event; the host waits for this call to return
    fn on_event(&self, event: HostEvent) -> Result<()>;
}
