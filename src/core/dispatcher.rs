//! Background event loop lifecycle.
//!
//! A [`Dispatcher`] owns at most one thread running a single-threaded tokio
//! runtime. Every transport callback runs on that thread, one at a time.
//! Liveness is defined by the pair of handles kept under one lock: the
//! thread handle and the loop control installed by the thread once its
//! runtime is up. The thread clears them itself when the loop exits, so a
//! loop that dies is observed as "not running" by every waiter.

use std::future::Future;
use std::io;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::DispatcherConfig;
use crate::DispatcherError;
use crate::Result;

/// Handle to the running event loop, used to schedule work on the
/// dispatcher thread.
#[derive(Debug, Clone)]
pub struct EventLoop(Handle);

impl EventLoop {
    pub fn spawn<F>(
        &self,
        future: F,
    ) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.0.spawn(future)
    }

    pub fn handle(&self) -> &Handle {
        &self.0
    }
}

struct LoopControl {
    event_loop: EventLoop,
    shutdown_tx: watch::Sender<()>,
}

#[derive(Default)]
struct DispatcherHandles {
    thread: Option<JoinHandle<()>>,
    control: Option<LoopControl>,
    /// Bumped by every start and stop; a loop thread only touches the
    /// handles while its own generation is current.
    generation: u64,
}

pub struct Dispatcher {
    config: DispatcherConfig,
    handles: Arc<Mutex<DispatcherHandles>>,
    /// Serializes `start` calls without holding `handles` during the wait
    start_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            handles: Arc::new(Mutex::new(DispatcherHandles::default())),
            start_lock: Mutex::new(()),
        }
    }

    /// Starts the event loop and waits for it without condition.
    pub fn start(&self) -> Result<()> {
        self.start_while(|| true)
    }

    /// Starts the event loop if it is not already running.
    ///
    /// Waits up to `start_timeout` for the loop to report running, checking
    /// `keep_waiting` every `start_poll_interval`. An abandoned or expired
    /// wait is not an error: the next blocking wait on a request observes
    /// the missing loop as a disconnection.
    pub fn start_while<F>(
        &self,
        keep_waiting: F,
    ) -> Result<()>
    where
        F: Fn() -> bool,
    {
        let _start = self.start_lock.lock();
        if self.is_running() {
            debug!("[Dispatcher] event loop already running");
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let generation = {
            let mut handles = self.handles.lock();
            if let Some(stale) = handles.thread.take() {
                reap(stale);
            }
            handles.generation += 1;
            handles.generation
        };

        let shared = self.handles.clone();
        let thread = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_event_loop(shared, generation, ready_tx))
            .map_err(|e| {
                error!("[Dispatcher] failed to spawn event loop thread: {:?}", e);
                DispatcherError::Spawn(e)
            })?;
        {
            let mut handles = self.handles.lock();
            if handles.generation == generation {
                handles.thread = Some(thread);
            }
        }

        let poll_interval = self.config.start_poll_interval();
        let deadline = Instant::now() + self.config.start_timeout();
        loop {
            if !keep_waiting() {
                warn!("[Dispatcher] stop waiting for event loop, caller no longer connecting");
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    "[Dispatcher] event loop not running after {:?}",
                    self.config.start_timeout()
                );
                return Ok(());
            }
            match ready_rx.recv_timeout(poll_interval.min(remaining)) {
                Ok(Ok(())) => {
                    debug!("[Dispatcher] event loop ready");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    error!("[Dispatcher] failed to build event loop: {:?}", e);
                    return Err(DispatcherError::Build(e).into());
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!("[Dispatcher] wait for event loop");
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("[Dispatcher] event loop exited before reporting ready");
                    return Ok(());
                }
            }
        }
    }

    /// Asks the event loop to exit and waits for its thread, unless called
    /// from that thread. Safe to call when not running.
    pub fn stop(&self) {
        let (thread, control) = {
            let mut handles = self.handles.lock();
            handles.generation += 1;
            (handles.thread.take(), handles.control.take())
        };

        if let Some(control) = control {
            info!("[Dispatcher] stopping event loop");
            let _ = control.shutdown_tx.send(());
        }

        if let Some(thread) = thread {
            if thread.thread().id() == thread::current().id() {
                debug!("[Dispatcher] stop requested from the event loop, detaching thread");
            } else if thread.join().is_err() {
                error!("[Dispatcher] event loop thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        let handles = self.handles.lock();
        handles.thread.is_some() && handles.control.is_some()
    }

    /// Handle of the running loop, `None` when not running.
    pub fn event_loop(&self) -> Option<EventLoop> {
        let handles = self.handles.lock();
        match (&handles.thread, &handles.control) {
            (Some(_), Some(control)) => Some(control.event_loop.clone()),
            _ => None,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reap(thread: JoinHandle<()>) {
    if thread.is_finished() {
        if thread.join().is_err() {
            error!("[Dispatcher] previous event loop thread panicked");
        }
    } else {
        debug!("[Dispatcher] detaching superseded event loop thread");
    }
}

/// Clears the handles when the loop thread leaves, panics included.
struct ExitGuard {
    handles: Arc<Mutex<DispatcherHandles>>,
    generation: u64,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let mut handles = self.handles.lock();
        if handles.generation == self.generation {
            handles.control = None;
            // Dropping our own handle detaches the thread
            handles.thread = None;
        }
    }
}

fn run_event_loop(
    handles: Arc<Mutex<DispatcherHandles>>,
    generation: u64,
    ready_tx: mpsc::Sender<io::Result<()>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let (shutdown_tx, mut shutdown_rx) = watch::channel(());
    {
        let mut guard = handles.lock();
        if guard.generation != generation {
            debug!("[Dispatcher] event loop superseded before start");
            return;
        }
        guard.control = Some(LoopControl {
            event_loop: EventLoop(runtime.handle().clone()),
            shutdown_tx,
        });
    }
    let _exit = ExitGuard { handles, generation };
    let _ = ready_tx.send(Ok(()));

    info!("[Dispatcher] event loop START");
    runtime.block_on(async move {
        let _ = shutdown_rx.changed().await;
    });
    info!("[Dispatcher] event loop EXIT");
}
