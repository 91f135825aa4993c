//! Opaque per-target outputs
//!
//! The encoder/muxer/transport is not part of this crate. A target only sees
//! an [`Output`] created by an [`OutputFactory`], and drives it from a tokio
//! task so that `start`/`stop` never block the control thread:
//!
//! ```text
//!   PushTarget::start ──► factory.create() ──► spawn(drive)
//!                                                 │ connect() / run()
//!                                                 ▼
//!                     Reporter ◄── OutputEvent { Connected | Failed | Released }
//!                        │
//!                        └──► control thread ──► PushTarget::apply
//! ```
//!
//! The task owns the output for its whole life and always calls
//! `disconnect()` before dropping it, so an output is never torn down while
//! a connect is still using it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

use super::config::TargetConfig;
use super::TargetId;

/// A live connection to one remote endpoint
#[async_trait]
pub trait Output: Send {
    /// Establish the connection; resolves once media can flow
    async fn connect(&mut self) -> Result<()>;

    /// Resolves when the established stream ends on its own
    ///
    /// `Ok` is a clean end (remote closed), `Err` a failure. The default
    /// never ends.
    async fn run(&mut self) -> Result<()> {
        std::future::pending().await
    }

    /// Release the connection; called exactly once, also after a failure
    async fn disconnect(&mut self);
}

/// Creates outputs for targets
pub trait OutputFactory: Send + Sync {
    /// Create an unconnected output for `config`
    fn create(&self, config: &TargetConfig) -> Result<Box<dyn Output>>;
}

/// Progress reported by an output task
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEventKind {
    /// `connect()` succeeded
    Connected,
    /// Connect failed, timed out, or the stream broke
    Failed(Error),
    /// The output was disconnected and dropped
    Released,
}

/// An output event tagged with the start attempt it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEvent {
    pub target: TargetId,
    pub generation: u64,
    pub kind: OutputEventKind,
}

/// Sink for output events, called from tokio worker threads
pub type Reporter = Arc<dyn Fn(OutputEvent) + Send + Sync>;

/// Everything a target needs to create and drive outputs
pub(crate) struct OutputContext {
    pub(crate) runtime: Handle,
    pub(crate) factory: Arc<dyn OutputFactory>,
    pub(crate) reporter: Reporter,
    pub(crate) connect_timeout: Duration,
}

/// The target's handle on a running output task
pub(crate) struct OutputHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl OutputHandle {
    pub(crate) fn spawn(
        ctx: &OutputContext,
        output: Box<dyn Output>,
        target: TargetId,
        generation: u64,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = ctx.runtime.spawn(drive(
            output,
            stop_rx,
            target,
            generation,
            ctx.connect_timeout,
            Arc::clone(&ctx.reporter),
        ));

        Self {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    /// Ask the task to disconnect; later calls are no-ops
    pub(crate) fn request_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub(crate) fn into_task(mut self) -> JoinHandle<()> {
        self.request_stop();
        self.task
    }
}

async fn drive(
    mut output: Box<dyn Output>,
    mut stop_rx: oneshot::Receiver<()>,
    target: TargetId,
    generation: u64,
    connect_timeout: Duration,
    reporter: Reporter,
) {
    let report = |kind| {
        reporter(OutputEvent {
            target,
            generation,
            kind,
        })
    };

    // A dropped stop sender (target destroyed) counts as a stop request
    let connected = tokio::select! {
        result = tokio::time::timeout(connect_timeout, output.connect()) => Some(result),
        _ = &mut stop_rx => None,
    };

    match connected {
        None => {
            tracing::debug!(target = %target, generation, "Stop requested while connecting");
            output.disconnect().await;
            report(OutputEventKind::Released);
            return;
        }
        Some(Err(_elapsed)) => {
            output.disconnect().await;
            report(OutputEventKind::Failed(Error::ConnectFailed(format!(
                "no connection after {:?}",
                connect_timeout
            ))));
            return;
        }
        Some(Ok(Err(err))) => {
            output.disconnect().await;
            report(OutputEventKind::Failed(err));
            return;
        }
        Some(Ok(Ok(()))) => report(OutputEventKind::Connected),
    }

    let ended = tokio::select! {
        result = output.run() => Some(result),
        _ = &mut stop_rx => None,
    };

    output.disconnect().await;

    match ended {
        Some(Err(err)) => report(OutputEventKind::Failed(err)),
        Some(Ok(())) | None => report(OutputEventKind::Released),
    }
}
