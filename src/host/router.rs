//! Host event routing

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::executor::ControlExecutor;
use crate::persist::{read_document, ConfigStore};
use crate::registry::{EditDraft, TargetRegistry};
use crate::target::TargetId;

use super::event::{HostEvent, HostListener};

/// Routes host events to the registry on the control thread
///
/// Cheap to clone; every clone shares the executor and the store.
#[derive(Clone)]
pub struct EventRouter {
    executor: Arc<ControlExecutor<TargetRegistry>>,
    store: Arc<dyn ConfigStore>,
    delivery_timeout: Duration,
}

impl EventRouter {
    pub fn new(executor: Arc<ControlExecutor<TargetRegistry>>, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            executor,
            store,
            delivery_timeout: Duration::from_secs(5),
        }
    }

    /// Set how long a host thread waits for the control thread
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Handle one event on the control thread
    ///
    /// Every target sees the event first, in registry order. `Exit` then
    /// persists the configuration (so resume markers set during the fan-out
    /// are saved) and `ProfileChanged` loads the new profile's targets.
    pub fn route(&self, registry: &mut TargetRegistry, event: HostEvent) -> Result<()> {
        registry.dispatch(&event);

        match event {
            HostEvent::Exit => self.persist(registry),
            HostEvent::ProfileChanged => self.reload(registry).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Save the registry and commit it to the store
    pub fn persist(&self, registry: &TargetRegistry) -> Result<()> {
        let result = registry
            .save()
            .encode()
            .and_then(|blob| self.store.commit(blob));

        match &result {
            Ok(()) => tracing::info!(targets = registry.len(), "Configuration saved"),
            Err(err) => tracing::error!(error = %err, "Failed to save configuration"),
        }
        result
    }

    /// Apply a confirmed edit draft and save right away
    ///
    /// A rejected draft changes nothing and nothing is saved. A commit that
    /// succeeds but cannot be saved returns `PersistFailed`; the edit stays
    /// applied in memory.
    pub fn commit_draft(
        &self,
        registry: &mut TargetRegistry,
        draft: EditDraft,
    ) -> Result<TargetId> {
        let id = registry.commit(draft)?;
        self.persist(registry)?;
        Ok(id)
    }

    /// Replace the registry with the active profile's stored targets
    ///
    /// A store that cannot be read leaves the registry untouched.
    pub fn reload(&self, registry: &mut TargetRegistry) -> Result<usize> {
        let blob = read_document(self.store.as_ref()).map_err(|err| {
            tracing::error!(error = %err, "Failed to read configuration");
            err
        })?;
        Ok(registry.load_blob(blob.as_deref()))
    }

    /// Initial load when the module starts; same path as a profile change
    pub fn load_initial(&self, registry: &mut TargetRegistry) -> Result<usize> {
        self.reload(registry)
    }
}

impl HostListener for EventRouter {
    fn on_event(&self, event: HostEvent) -> Result<()> {
        let router = self.clone();

        // Waiting here would deadlock the loop; queue behind earlier tasks instead
        if self.executor.is_control_thread() {
            let queued = self.executor.run_in_control_thread(move |registry| {
                if let Err(err) = router.route(registry, event) {
                    tracing::error!(?event, error = %err, "Host event handling failed");
                }
            });
            return if queued {
                Ok(())
            } else {
                Err(Error::ControlThreadNotReady)
            };
        }

        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let queued = self.executor.run_in_control_thread(move |registry| {
            let _ = done_tx.send(router.route(registry, event));
        });
        if !queued {
            tracing::warn!(?event, "Host event dropped, control thread not ready");
            return Err(Error::ControlThreadNotReady);
        }

        match done_rx.recv_timeout(self.delivery_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?event, timeout = ?self.delivery_timeout, "Host event not handled in time");
                Err(Error::DeliveryTimeout)
            }
            // The loop dropped the task without running it
            Err(RecvTimeoutError::Disconnected) => Err(Error::ControlThreadNotReady),
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("delivery_timeout", &self.delivery_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use bytes::Bytes;
    use serde_json::{json, Value};
    use tokio::runtime::Handle;
    use tokio_test::assert_ok;

    use super::*;
    use crate::executor::ControlLoop;
    use crate::persist::MemoryConfigStore;
    use crate::registry::{ConfigDocument, RegistryConfig};
    use crate::target::output::testing::ScriptedFactory;
    use crate::target::{TargetConfig, TargetState};

    struct Fixture {
        executor: Arc<ControlExecutor<TargetRegistry>>,
        control: ControlLoop<TargetRegistry>,
        registry: TargetRegistry,
        store: Arc<MemoryConfigStore>,
        router: EventRouter,
    }

    fn fixture() -> Fixture {
        let executor = Arc::new(ControlExecutor::new());
        let control = executor.designate().unwrap();
        let registry = TargetRegistry::new(
            RegistryConfig::default(),
            Arc::clone(&executor),
            Arc::new(ScriptedFactory::default()),
            Handle::current(),
        );
        let store = Arc::new(MemoryConfigStore::new("default"));
        let router = EventRouter::new(Arc::clone(&executor), store.clone());

        Fixture {
            executor,
            control,
            registry,
            store,
            router,
        }
    }

    fn saved_targets(store: &MemoryConfigStore) -> Vec<Value> {
        let blob = store.profile_blob("default").unwrap();
        ConfigDocument::decode(&blob).unwrap().targets
    }

    #[tokio::test]
    async fn test_exit_from_host_thread_saves_after_fan_out() {
        let mut f = fixture();
        let id = f
            .registry
            .add(TargetConfig::new("a", "rtmp://ok.example/live").resume_after_restart(true))
            .unwrap();
        f.registry.start(id).unwrap();
        f.control
            .run_until(&mut f.registry, |r| {
                r.status(id).unwrap().state == TargetState::Streaming
            })
            .await;

        let router = f.router.clone();
        let host = thread::spawn(move || router.on_event(HostEvent::Exit));

        // Run tasks until the host call has been answered
        while !host.is_finished() {
            tokio::select! {
                _ = f.control.turn(&mut f.registry) => {}
                _ = tokio::time::sleep(Duration::from_millis(5)) => {}
            }
        }
        assert_ok!(host.join().unwrap());

        let saved = saved_targets(&f.store);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["resume-pending"], Value::Bool(true));
        assert!(!f.registry.status(id).unwrap().state.is_live());
    }

    #[tokio::test]
    async fn test_event_on_control_thread_is_queued() {
        let mut f = fixture();
        f.registry
            .add(TargetConfig::new("a", "rtmp://ok.example/live"))
            .unwrap();

        assert_ok!(f.router.on_event(HostEvent::Exit));
        assert!(f.store.profile_blob("default").is_none());

        assert_eq!(f.control.run_pending(&mut f.registry), 1);
        assert_eq!(saved_targets(&f.store).len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_surfaced() {
        let mut f = fixture();
        f.store.set_read_only(true);

        let result = f.router.route(&mut f.registry, HostEvent::Exit);
        assert!(matches!(result, Err(Error::PersistFailed(_))));
    }

    #[tokio::test]
    async fn test_profile_change_reloads() {
        let mut f = fixture();
        let legacy = ConfigDocument::new(vec![
            json!({"name": "one", "server": "rtmp://ok.example/live"}),
            json!({"name": "two", "server": "rtmp://ok.example/live"}),
        ]);
        f.store.set_legacy(legacy.encode().unwrap());

        assert_eq!(f.router.load_initial(&mut f.registry), Ok(2));

        let profile = ConfigDocument::new(vec![
            json!({"name": "three", "server": "rtmps://ok.example/live"}),
        ]);
        f.store.set_profile("other");
        f.store.commit(profile.encode().unwrap()).unwrap();

        assert_ok!(f.router.route(&mut f.registry, HostEvent::ProfileChanged));
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.registry.iter().next().unwrap().config().name, "three");

        // Blank profile blob falls back to legacy
        f.store.set_profile("blank");
        f.store.commit(Bytes::from_static(b" ")).unwrap();
        assert_ok!(f.router.route(&mut f.registry, HostEvent::ProfileChanged));
        assert_eq!(f.registry.len(), 2);
    }

    #[tokio::test]
    async fn test_confirmed_draft_survives_profile_switch() {
        let mut f = fixture();

        let mut draft = f.registry.new_draft();
        draft.config = TargetConfig::new("added", "rtmp://ok.example/live").key("k");
        let id = f.router.commit_draft(&mut f.registry, draft).unwrap();
        assert_eq!(f.registry.ids(), vec![id]);
        assert_eq!(saved_targets(&f.store).len(), 1);

        f.store.set_profile("other");
        assert_ok!(f.router.route(&mut f.registry, HostEvent::ProfileChanged));
        assert!(f.registry.is_empty());

        f.store.set_profile("default");
        assert_ok!(f.router.route(&mut f.registry, HostEvent::ProfileChanged));
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.registry.iter().next().unwrap().config().name, "added");
    }

    #[tokio::test]
    async fn test_rejected_draft_is_not_saved() {
        let mut f = fixture();

        let mut draft = f.registry.new_draft();
        draft.config = TargetConfig::new("bad", "ftp://nope");
        assert!(matches!(
            f.router.commit_draft(&mut f.registry, draft),
            Err(Error::InvalidConfig(_))
        ));
        assert!(f.registry.is_empty());
        assert!(f.store.profile_blob("default").is_none());
    }

    #[tokio::test]
    async fn test_commit_draft_surfaces_save_failure() {
        let mut f = fixture();
        f.store.set_read_only(true);

        let mut draft = f.registry.new_draft();
        draft.config = TargetConfig::new("added", "rtmp://ok.example/live");
        assert!(matches!(
            f.router.commit_draft(&mut f.registry, draft),
            Err(Error::PersistFailed(_))
        ));
        assert_eq!(f.registry.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_executor_rejects() {
        let f = fixture();
        f.executor.shutdown();

        let router = f.router.clone();
        let result = thread::spawn(move || router.on_event(HostEvent::StreamingStarted))
            .join()
            .unwrap();
        assert_eq!(result, Err(Error::ControlThreadNotReady));
    }

    #[test]
    fn test_not_designated() {
        let executor = Arc::new(ControlExecutor::new());
        let router = EventRouter::new(executor, Arc::new(MemoryConfigStore::new("default")));
        assert_eq!(
            router.on_event(HostEvent::FinishedLoading),
            Err(Error::ControlThreadNotReady)
        );
    }

    #[test]
    fn test_delivery_timeout() {
        let executor = Arc::new(ControlExecutor::new());
        let _control = executor.designate().unwrap();
        let router = EventRouter::new(executor, Arc::new(MemoryConfigStore::new("default")))
            .delivery_timeout(Duration::from_millis(20));

        // Nobody drives the loop
        let result = thread::spawn(move || router.on_event(HostEvent::Other(7)))
            .join()
            .unwrap();
        assert_eq!(result, Err(Error::DeliveryTimeout));
    }
}
