//! Push target registry implementation
//!
//! The registry owns every configured target, in display order, and is only
//! ever touched from the control thread. Output tasks report back through
//! the control executor, which hands the events to
//! [`TargetRegistry::on_output_event`].

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::executor::ControlExecutor;
use crate::host::HostEvent;
use crate::target::output::OutputContext;
use crate::target::{
    OutputEvent, OutputFactory, PushTarget, Reporter, TargetConfig, TargetId, TargetStatus,
};

use super::config::RegistryConfig;
use super::document::ConfigDocument;
use super::draft::EditDraft;

/// Ordered collection of push targets
pub struct TargetRegistry {
    /// Live targets in registry order
    targets: Vec<PushTarget>,

    /// Removed targets whose output has not reported release yet
    retiring: Vec<PushTarget>,

    next_id: u64,

    ctx: Arc<OutputContext>,

    config: RegistryConfig,
}

impl TargetRegistry {
    /// Create an empty registry
    ///
    /// Outputs run on `runtime`; their progress is posted back through
    /// `executor`, whose control loop must be driven with this registry as
    /// its state.
    pub fn new(
        config: RegistryConfig,
        executor: Arc<ControlExecutor<TargetRegistry>>,
        factory: Arc<dyn OutputFactory>,
        runtime: Handle,
    ) -> Self {
        let reporter: Reporter = Arc::new(move |event: OutputEvent| {
            let target = event.target;
            let posted = executor.run_in_control_thread(move |registry: &mut TargetRegistry| {
                registry.on_output_event(event)
            });
            // Expected once the executor is shut down and outputs are released
            if !posted {
                tracing::debug!(target = %target, "Output event dropped, control thread not ready");
            }
        });

        let ctx = OutputContext {
            runtime,
            factory,
            reporter,
            connect_timeout: config.connect_timeout,
        };

        Self {
            targets: Vec::new(),
            retiring: Vec::new(),
            next_id: 1,
            ctx: Arc::new(ctx),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Validate `config` and append a new idle target
    pub fn add(&mut self, config: TargetConfig) -> Result<TargetId> {
        config.validate()?;

        let id = self.allocate_id();
        tracing::info!(target = %id, name = %config.name, "Push target added");
        self.targets.push(PushTarget::new(id, config, Arc::clone(&self.ctx)));
        Ok(id)
    }

    /// Stop and remove a target
    ///
    /// A target that is still releasing its output is kept aside until the
    /// release completes. Returns `false` for an unknown id.
    pub fn remove(&mut self, id: TargetId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        let target = self.targets.remove(index);
        self.retire(target);
        tracing::info!(target = %id, "Push target removed");
        true
    }

    pub fn get(&self, id: TargetId) -> Option<&PushTarget> {
        self.targets.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut PushTarget> {
        self.targets.iter_mut().find(|t| t.id() == id)
    }

    /// Targets in registry order
    pub fn iter(&self) -> impl Iterator<Item = &PushTarget> {
        self.targets.iter()
    }

    pub fn ids(&self) -> Vec<TargetId> {
        self.targets.iter().map(PushTarget::id).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of removed targets still waiting for their output to release
    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    pub fn status(&self, id: TargetId) -> Option<TargetStatus> {
        self.get(id).map(PushTarget::status)
    }

    /// Start one target; `Ok(false)` if it was already active
    pub fn start(&mut self, id: TargetId) -> Result<bool> {
        let target = self.get_mut(id).ok_or(Error::UnknownTarget(id))?;
        Ok(target.start())
    }

    pub fn stop(&mut self, id: TargetId) -> Result<()> {
        let target = self.get_mut(id).ok_or(Error::UnknownTarget(id))?;
        target.stop();
        Ok(())
    }

    /// Start every target
    ///
    /// Each target starts independently; one failing to connect does not
    /// affect the others. Returns how many new attempts were made.
    pub fn start_all(&mut self) -> usize {
        let started = self
            .targets
            .iter_mut()
            .map(PushTarget::start)
            .filter(|started| *started)
            .count();
        tracing::info!(started, total = self.targets.len(), "Start all");
        started
    }

    /// Stop every target
    pub fn stop_all(&mut self) {
        for target in &mut self.targets {
            target.stop();
        }
        tracing::info!(total = self.targets.len(), "Stop all");
    }

    /// Snapshot every target's configuration in registry order
    pub fn save(&self) -> ConfigDocument {
        ConfigDocument::new(self.targets.iter().map(PushTarget::to_config).collect())
    }

    /// Replace all targets with the ones described by `document`
    ///
    /// Existing targets are stopped and retired. Entries that fail to parse
    /// or validate are skipped. Returns the number of targets loaded.
    pub fn load(&mut self, document: &ConfigDocument) -> usize {
        for target in std::mem::take(&mut self.targets) {
            self.retire(target);
        }

        for (index, entry) in document.targets.iter().enumerate() {
            let id = self.allocate_id();
            match PushTarget::from_config(id, entry, Arc::clone(&self.ctx)) {
                Ok(target) => self.targets.push(target),
                Err(err) => {
                    tracing::warn!(index, error = %err, "Skipping malformed target entry");
                }
            }
        }

        tracing::info!(
            loaded = self.targets.len(),
            entries = document.targets.len(),
            "Configuration loaded"
        );
        self.targets.len()
    }

    /// Load from a stored blob
    ///
    /// An absent or unreadable blob leaves the registry empty.
    pub fn load_blob(&mut self, blob: Option<&[u8]>) -> usize {
        let document = match blob.map(ConfigDocument::decode) {
            Some(Ok(document)) => document,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "Discarding stored configuration");
                ConfigDocument::default()
            }
            None => {
                tracing::debug!("No stored configuration");
                ConfigDocument::default()
            }
        };

        self.load(&document)
    }

    /// Hand a host event to every target in registry order
    pub fn dispatch(&mut self, event: &HostEvent) {
        tracing::debug!(?event, targets = self.targets.len(), "Dispatching host event");
        for target in &mut self.targets {
            target.on_event(event);
        }
    }

    /// Open an edit of an existing target's configuration
    pub fn begin_edit(&self, id: TargetId) -> Option<EditDraft> {
        self.get(id).map(|target| EditDraft::edit(id, target.config().clone()))
    }

    /// Open a draft for a target that does not exist yet
    pub fn new_draft(&self) -> EditDraft {
        EditDraft::create(TargetConfig::default())
    }

    /// Apply a draft
    ///
    /// New drafts are appended, edits reconfigure their target. Invalid
    /// drafts change nothing. Returns the id of the affected target.
    pub fn commit(&mut self, draft: EditDraft) -> Result<TargetId> {
        match draft.target() {
            None => self.add(draft.config),
            Some(id) => {
                let target = self.get_mut(id).ok_or(Error::UnknownTarget(id))?;
                target.configure(draft.config)?;
                Ok(id)
            }
        }
    }

    /// Stop everything and wait for the outputs to release
    ///
    /// Outputs that take longer than `stop_timeout` are aborted.
    pub async fn shutdown(mut self) {
        let targets: Vec<PushTarget> = self
            .targets
            .drain(..)
            .chain(self.retiring.drain(..))
            .collect();

        let tasks: Vec<(TargetId, JoinHandle<()>)> = targets
            .into_iter()
            .filter_map(|target| {
                let id = target.id();
                target.into_release_task().map(|task| (id, task))
            })
            .collect();

        tracing::info!(outputs = tasks.len(), "Registry shutting down");

        for (id, mut task) in tasks {
            if tokio::time::timeout(self.config.stop_timeout, &mut task)
                .await
                .is_err()
            {
                tracing::warn!(target = %id, "Output did not release in time, aborting");
                task.abort();
            }
        }
    }

    /// Apply an output event to its target, live or retiring
    pub(crate) fn on_output_event(&mut self, event: OutputEvent) {
        if let Some(target) = self.get_mut(event.target) {
            target.apply(event);
            return;
        }

        let Some(index) = self.retiring.iter().position(|t| t.id() == event.target) else {
            tracing::debug!(target = %event.target, "Output event for unknown target");
            return;
        };

        self.retiring[index].apply(event);
        if !self.retiring[index].has_output() {
            let target = self.retiring.remove(index);
            tracing::debug!(target = %target.id(), "Retired target released");
        }
    }

    fn retire(&mut self, mut target: PushTarget) {
        target.stop();
        if target.has_output() {
            self.retiring.push(target);
        }
    }

    fn position(&self, id: TargetId) -> Option<usize> {
        self.targets.iter().position(|t| t.id() == id)
    }

    fn allocate_id(&mut self) -> TargetId {
        let id = TargetId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

impl std::fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("targets", &self.targets)
            .field("retiring", &self.retiring.len())
            .finish()
    }
}
