use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::Dispatcher;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Connection state register tied to the dispatcher it governs.
///
/// Moving to [`ConnectionState::Disconnected`] stops the dispatcher. Writes
/// are totally ordered by the state lock; the dispatcher is stopped after the
/// lock is released so a callback reporting link loss on the loop thread
/// never waits on a caller holding it.
pub struct Link {
    state: Mutex<ConnectionState>,
    dispatcher: Arc<Dispatcher>,
}

impl Link {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            dispatcher,
        }
    }

    pub fn get_state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn set_state(
        &self,
        new_state: ConnectionState,
    ) {
        let old_state = std::mem::replace(&mut *self.state.lock(), new_state);
        debug!("[ConnState] {:?} => {:?}", old_state, new_state);

        if new_state == ConnectionState::Disconnected && self.dispatcher.is_running() {
            self.dispatcher.stop();
        }
    }

    /// Connected with a live event loop, the precondition of every request.
    pub fn is_connected(&self) -> bool {
        self.get_state() == ConnectionState::Connected && self.dispatcher.is_running()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Starts the dispatcher, waiting for it only while the link is still
    /// connecting. A start failure leaves the link disconnected.
    pub fn start_dispatcher(&self) -> Result<()> {
        self.dispatcher
            .start_while(|| self.get_state() == ConnectionState::Connecting)
            .inspect_err(|_| self.set_state(ConnectionState::Disconnected))
    }
}
