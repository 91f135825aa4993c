//! Headless host driving a few push targets
//!
//! Run with: cargo run --example headless_host -- [CONFIG_DIR]
//!
//! A stand-in host thread plays the part of the streaming application: it
//! starts its main stream, lets it run for a moment and exits. Targets with
//! `sync-start` follow the main stream; the target list (with resume
//! markers) is saved under CONFIG_DIR on exit and loaded again on the next
//! run.
//!
//! Outputs here only log; a real host plugs in its encoder and RTMP
//! transport through `OutputFactory`.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use multi_rtmp::{
    ControlExecutor, EventRouter, FileConfigStore, HostEvent, HostListener, Output,
    OutputFactory, RegistryConfig, TargetConfig, TargetRegistry,
};

/// Output that pretends to connect after a short delay
struct LoggingOutput {
    url: String,
}

#[async_trait]
impl Output for LoggingOutput {
    async fn connect(&mut self) -> multi_rtmp::Result<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        tracing::info!(url = %self.url, "Connected");
        Ok(())
    }

    async fn disconnect(&mut self) {
        tracing::info!(url = %self.url, "Disconnected");
    }
}

struct LoggingFactory;

impl OutputFactory for LoggingFactory {
    fn create(&self, config: &TargetConfig) -> multi_rtmp::Result<Box<dyn Output>> {
        Ok(Box::new(LoggingOutput {
            url: config.publish_url(),
        }))
    }
}

fn host_thread(router: EventRouter, executor: Arc<ControlExecutor<TargetRegistry>>) {
    let events = [
        HostEvent::FinishedLoading,
        HostEvent::StreamingStarting,
        HostEvent::StreamingStarted,
    ];
    for event in events {
        if let Err(e) = router.on_event(event) {
            eprintln!("Event {:?} failed: {}", event, e);
        }
    }

    thread::sleep(Duration::from_secs(1));

    for event in [HostEvent::StreamingStopping, HostEvent::StreamingStopped, HostEvent::Exit] {
        if let Err(e) = router.on_event(event) {
            eprintln!("Event {:?} failed: {}", event, e);
        }
    }

    executor.shutdown();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multi_rtmp=debug".parse()?),
        )
        .init();

    let config_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("multi-rtmp-demo"));

    let executor = Arc::new(ControlExecutor::new());
    let mut control = executor.designate()?;

    let store = Arc::new(FileConfigStore::new(&config_dir, "default")?);
    let router = EventRouter::new(Arc::clone(&executor), store);

    let mut registry = TargetRegistry::new(
        RegistryConfig::default().connect_timeout(Duration::from_secs(5)),
        Arc::clone(&executor),
        Arc::new(LoggingFactory),
        tokio::runtime::Handle::current(),
    );

    if router.load_initial(&mut registry)? == 0 {
        println!("No saved targets in {}, adding two", config_dir.display());
        let configs = [
            TargetConfig::new("Backup", "rtmp://backup.example.com/live")
                .key("backup_key")
                .sync_start(true),
            TargetConfig::new("Second platform", "rtmps://live.example.net/app")
                .key("second_key")
                .sync_start(true)
                .resume_after_restart(true),
        ];
        // Same path as confirming the "new target" dialog: commit, then save
        for config in configs {
            let mut draft = registry.new_draft();
            draft.config = config;
            router.commit_draft(&mut registry, draft)?;
        }
    }

    for target in registry.iter() {
        println!("{} -> {}", target.config().name, target.config().server);
    }

    let host = {
        let router = router.clone();
        let executor = Arc::clone(&executor);
        thread::spawn(move || host_thread(router, executor))
    };

    control.run(&mut registry).await;
    registry.shutdown().await;

    if host.join().is_err() {
        eprintln!("Host thread panicked");
    }
    Ok(())
}
