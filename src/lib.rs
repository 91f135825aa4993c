//! Multi-target RTMP push coordinator
//!
//! Keeps a list of outbound push targets next to a host application's own
//! stream, starts and stops them independently, reacts to the host's
//! lifecycle events and persists the target list per profile.
//!
//! # Threads
//!
//! Targets and the registry are owned by one designated control thread.
//! The host calls [`HostListener::on_event`] from its own threads; the
//! [`EventRouter`] marshals each call through the [`ControlExecutor`] and
//! waits for it. Outputs connect and disconnect on tokio tasks and report
//! back through the same executor, so `start` and `stop` never block.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use multi_rtmp::{
//!     ControlExecutor, EventRouter, FileConfigStore, HostEvent, HostListener, OutputFactory,
//!     RegistryConfig, TargetRegistry,
//! };
//!
//! async fn run(factory: Arc<dyn OutputFactory>) -> multi_rtmp::Result<()> {
//!     let executor = Arc::new(ControlExecutor::new());
//!     let mut control = executor.designate()?;
//!
//!     let store = Arc::new(FileConfigStore::new("/var/lib/host", "default")?);
//!     let router = EventRouter::new(Arc::clone(&executor), store);
//!     let mut registry = TargetRegistry::new(
//!         RegistryConfig::default(),
//!         Arc::clone(&executor),
//!         factory,
//!         tokio::runtime::Handle::current(),
//!     );
//!     router.load_initial(&mut registry)?;
//!
//!     // Hand `router` to the host, which calls `on_event` from its threads
//!     let host = router.clone();
//!     std::thread::spawn(move || host.on_event(HostEvent::StreamingStarted));
//!
//!     control.run(&mut registry).await;
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod executor;
pub mod host;
pub mod persist;
pub mod registry;
pub mod target;

pub use error::{Error, Result};
pub use executor::{ControlExecutor, ControlLoop};
pub use host::{EventRouter, HostEvent, HostListener};
pub use persist::{ConfigStore, FileConfigStore, MemoryConfigStore, StoreScope};
pub use registry::{ConfigDocument, EditDraft, RegistryConfig, TargetRegistry};
pub use target::{
    Output, OutputFactory, PushTarget, TargetConfig, TargetId, TargetState, TargetStatus,
};
