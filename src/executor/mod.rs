//! Cross-thread executor
//!
//! Host callbacks arrive on threads the host owns. Registry and target state
//! belong to a single control thread, so anything a callback wants to change
//! is wrapped in a closure and queued to that thread.
//!
//! ```text
//!   host thread ──┐
//!   tokio worker ─┼──► ControlExecutor::run_in_control_thread(task)
//!   host thread ──┘              │  (unbounded FIFO)
//!                                ▼
//!                  ControlLoop::turn(&mut state)   [control thread]
//! ```
//!
//! The executor is an ordinary value shared through `Arc`; it is designated
//! once, at module load, and shut down at unload.

pub mod control;

pub use control::{ControlExecutor, ControlLoop, ControlTask};
