//! Host integration
//!
//! The host delivers lifecycle events one at a time on its own thread. The
//! [`EventRouter`] moves each event onto the control thread, hands it to
//! every target in registry order, and then does the registry-level work:
//! persist on exit, reload on profile change.

pub mod event;
pub mod router;

pub use event::{HostEvent, HostListener};
pub use router::EventRouter;
