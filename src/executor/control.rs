//! Control thread designation and task dispatch

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A unit of work executed on the control thread with access to its state
pub type ControlTask<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Dispatches closures to the designated control thread
///
/// Tasks submitted before designation are dropped and the call reports
/// `false`; callers should treat that as "not ready yet". After designation
/// every task runs exactly once on the control thread, in submission order
/// for any single submitting thread. There is no result channel: a caller
/// that needs an answer sends its own completion signal from inside the task.
pub struct ControlExecutor<S> {
    thread: OnceLock<ThreadId>,
    tx: Mutex<Option<mpsc::UnboundedSender<ControlTask<S>>>>,
}

impl<S> ControlExecutor<S> {
    /// Create an executor with no control thread designated
    pub fn new() -> Self {
        Self {
            thread: OnceLock::new(),
            tx: Mutex::new(None),
        }
    }

    /// Designate the calling thread as the control thread
    ///
    /// Returns the loop that must be driven on this thread. Fails if a
    /// thread was already designated.
    pub fn designate(&self) -> Result<ControlLoop<S>> {
        let current = thread::current().id();
        self.thread
            .set(current)
            .map_err(|_| Error::ControlThreadAlreadyDesignated)?;

        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender() = Some(tx);

        tracing::info!(thread = ?current, "Control thread designated");

        Ok(ControlLoop {
            rx,
            _not_send: PhantomData,
        })
    }

    /// Queue `task` for execution on the control thread
    ///
    /// Returns `false` (and drops the task) when no control thread is
    /// designated, the executor was shut down, or its loop is gone.
    pub fn run_in_control_thread<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let sender = self.sender();
        match sender.as_ref() {
            Some(tx) => tx.send(Box::new(task)).is_ok(),
            None => {
                tracing::debug!("Control thread not ready, task dropped");
                false
            }
        }
    }

    /// Whether tasks are currently accepted
    pub fn is_ready(&self) -> bool {
        self.sender().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Whether the caller is running on the designated control thread
    pub fn is_control_thread(&self) -> bool {
        self.thread.get() == Some(&thread::current().id())
    }

    /// Stop accepting tasks
    ///
    /// Tasks already queued are still delivered to the loop; the loop's
    /// `run` returns once they are drained.
    pub fn shutdown(&self) {
        if self.sender().take().is_some() {
            tracing::info!("Control executor shut down");
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<ControlTask<S>>>> {
        // A panicking task never holds this lock, so poisoning carries no torn state
        match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<S> Default for ControlExecutor<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of the executor, pinned to the control thread
///
/// Not `Send`: it can only be driven by the thread that designated itself.
pub struct ControlLoop<S> {
    rx: mpsc::UnboundedReceiver<ControlTask<S>>,
    _not_send: PhantomData<*const ()>,
}

impl<S> ControlLoop<S> {
    /// Run every task queued right now without waiting
    ///
    /// Returns the number of tasks executed.
    pub fn run_pending(&mut self, state: &mut S) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.rx.try_recv() {
            task(state);
            executed += 1;
        }
        executed
    }

    /// Wait for the next task and run it
    ///
    /// Returns `false` once the executor is shut down and the queue is empty.
    pub async fn turn(&mut self, state: &mut S) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task(state);
                true
            }
            None => false,
        }
    }

    /// Run tasks until `done` holds for the state
    ///
    /// Returns `false` if the executor shut down first.
    pub async fn run_until<F>(&mut self, state: &mut S, mut done: F) -> bool
    where
        F: FnMut(&S) -> bool,
    {
        while !done(state) {
            if !self.turn(state).await {
                return false;
            }
        }
        true
    }

    /// Run tasks until the executor is shut down
    pub async fn run(&mut self, state: &mut S) {
        while self.turn(state).await {}
        tracing::debug!("Control loop drained");
    }
}
