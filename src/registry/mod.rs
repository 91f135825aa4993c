//! Push target registry
//!
//! The registry is the ordered list of configured targets plus the bulk
//! operations on it. It lives on the control thread and is handed to every
//! task the control executor runs.
//!
//! # Architecture
//!
//! ```text
//!            host thread                    control thread
//!       ┌───────────────────┐        ┌──────────────────────────┐
//!       │ EventRouter       │ task   │ TargetRegistry           │
//!       │   on_event() ─────┼───────►│   targets: Vec<Target>   │
//!       └───────────────────┘        │   retiring: Vec<Target>  │
//!                                    └────────────┬─────────────┘
//!                                                 │ start/stop
//!         ┌───────────────────────┬───────────────┴───────┐
//!         ▼                       ▼                       ▼
//!    [output task]           [output task]           [output task]
//!    connect/run             connect/run             connect/run
//!         │                       │                       │
//!         └──► OutputEvent ──► executor ──► on_output_event()
//! ```
//!
//! # Persistence
//!
//! `save` and `load` work on a [`ConfigDocument`]; only configuration is
//! stored, never runtime state. Loading replaces every target and skips
//! entries that do not validate.

pub mod config;
pub mod document;
pub mod draft;
pub mod store;

pub use config::RegistryConfig;
pub use document::ConfigDocument;
pub use draft::EditDraft;
pub use store::TargetRegistry;
