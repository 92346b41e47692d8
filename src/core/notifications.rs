//! Routing of server-initiated value updates.
//!
//! The transport runs one [`NotificationHandler`] on the event loop for every
//! notification or indication. The handler built here looks the value handle
//! up in the [`NotificationRegistry`] and calls the subscriber, then confirms
//! indications. Subscriber callbacks run on the event loop: they must not
//! block, and must not call back into blocking client operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use uuid::Uuid;

use crate::AttTransport;
use crate::GattNotification;
use crate::NotificationHandler;
use crate::NotificationKind;
use crate::ValueUpdate;

/// Callback of one subscription
pub type NotifyCallback = Arc<dyn Fn(&GattNotification) + Send + Sync>;

/// One subscribed characteristic.
#[derive(Clone)]
pub struct Subscription {
    pub uuid: Uuid,
    pub kind: NotificationKind,
    /// Value handle the peer reports updates for
    pub value_handle: u16,
    /// Client Characteristic Configuration descriptor written to subscribe
    pub ccc_handle: u16,
    pub callback: NotifyCallback,
}

impl std::fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("uuid", &self.uuid)
            .field("kind", &self.kind)
            .field("value_handle", &self.value_handle)
            .field("ccc_handle", &self.ccc_handle)
            .finish()
    }
}

#[derive(Default)]
struct Subscriptions {
    by_handle: HashMap<u16, Subscription>,
    /// Whether the transport holds our handler for the current connection
    handler_installed: bool,
}

/// Subscriptions of the current connection, keyed by value handle.
#[derive(Default)]
pub struct NotificationRegistry {
    inner: Mutex<Subscriptions>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the subscription for its value handle.
    pub fn insert(
        &self,
        subscription: Subscription,
    ) -> Option<Subscription> {
        debug!(
            "[Notif] subscribe {} at {:#06x} ({:?})",
            subscription.uuid, subscription.value_handle, subscription.kind
        );
        self.inner
            .lock()
            .by_handle
            .insert(subscription.value_handle, subscription)
    }

    pub fn remove(
        &self,
        value_handle: u16,
    ) -> Option<Subscription> {
        self.inner.lock().by_handle.remove(&value_handle)
    }

    pub fn get(
        &self,
        value_handle: u16,
    ) -> Option<Subscription> {
        self.inner.lock().by_handle.get(&value_handle).cloned()
    }

    /// Subscriptions made for characteristics of type `uuid`
    pub fn find_by_uuid(
        &self,
        uuid: &Uuid,
    ) -> Vec<Subscription> {
        let mut found: Vec<Subscription> = self
            .inner
            .lock()
            .by_handle
            .values()
            .filter(|s| s.uuid == *uuid)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.value_handle);
        found
    }

    /// Characteristic type subscribed at `value_handle`
    pub fn uuid_of(
        &self,
        value_handle: u16,
    ) -> Option<Uuid> {
        self.inner.lock().by_handle.get(&value_handle).map(|s| s.uuid)
    }

    /// All subscriptions, in handle order
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut all: Vec<Subscription> = self.inner.lock().by_handle.values().cloned().collect();
        all.sort_by_key(|s| s.value_handle);
        all
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true exactly once per connection: the caller then installs
    /// the handler on the transport.
    pub fn claim_handler_install(&self) -> bool {
        let mut inner = self.inner.lock();
        !std::mem::replace(&mut inner.handler_installed, true)
    }

    /// Forgets every subscription; the link they belonged to is gone.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        if !inner.by_handle.is_empty() {
            debug!("[Notif] dropping {} subscription(s)", inner.by_handle.len());
        }
        inner.by_handle.clear();
        inner.handler_installed = false;
    }

    /// Hands `update` to its subscriber. Returns false when nobody
    /// subscribed to that handle.
    pub fn dispatch(
        &self,
        update: ValueUpdate,
    ) -> bool {
        // The callback runs without the lock so it may inspect the registry
        let Some(subscription) = self.get(update.handle) else {
            debug!("[Notif] no subscriber for {:#06x}", update.handle);
            return false;
        };
        if subscription.kind != update.kind {
            trace!(
                "[Notif] {:?} at {:#06x}, subscribed for {:?}",
                update.kind,
                update.handle,
                subscription.kind
            );
        }
        let notification = GattNotification {
            kind: update.kind,
            uuid: subscription.uuid,
            handle: update.handle,
            data: update.value,
        };
        (subscription.callback)(&notification);
        true
    }
}

/// Handler installed on the transport: routes updates to `registry` and
/// confirms every indication, subscribed or not, once it was delivered.
pub(crate) fn notification_handler<P: AttTransport>(
    registry: Weak<NotificationRegistry>,
    transport: Weak<P>,
) -> NotificationHandler {
    Box::new(move |update| {
        let kind = update.kind;
        if let Some(registry) = registry.upgrade() {
            registry.dispatch(update);
        }
        if kind == NotificationKind::Indication {
            if let Some(transport) = transport.upgrade() {
                if !transport.confirm_indication() {
                    warn!("[Notif] unable to confirm indication");
                }
            }
        }
    })
}
