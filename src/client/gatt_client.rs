use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::GattClientBuilder;
use crate::constants::*;
use crate::core::characteristics_callback;
use crate::core::connect_callback;
use crate::core::exchange_mtu_callback;
use crate::core::included_callback;
use crate::core::notification_handler;
use crate::core::primary_all_callback;
use crate::core::primary_by_uuid_callback;
use crate::core::read_by_handle_callback;
use crate::core::read_by_uuid_callback;
use crate::core::spawn_descriptor_walk;
use crate::core::write_callback;
use crate::is_valid_address;
use crate::uuid_from_u16;
use crate::AddressType;
use crate::AttTransport;
use crate::BridgeConfig;
use crate::CCC_DISABLED;
use crate::CCC_UUID;
use crate::ClientError;
use crate::Completer;
use crate::CompletionContext;
use crate::ConnectRequest;
use crate::ConnectionState;
use crate::Dispatcher;
use crate::GattCharacteristic;
use crate::GattDescriptor;
use crate::GattError;
use crate::GattIncluded;
use crate::GattNotification;
use crate::GattPrimary;
use crate::GattValue;
use crate::HandleRange;
use crate::HangupHandler;
use crate::Link;
use crate::NotificationKind;
use crate::NotificationRegistry;
use crate::Result;
use crate::SecurityLevel;
use crate::Subscription;
use crate::WaitPolicy;
use crate::WriteType;

/// Runs after every successful connect; its result becomes the result of
/// [`GattClient::connect`].
pub type ConnectHook = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Per-connection parameters that outlive a single request.
#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    pub(crate) destination: Option<String>,
    pub(crate) address_type: AddressType,
    pub(crate) security: SecurityLevel,
    /// Negotiated ATT_MTU, `None` until exchanged on this connection
    pub(crate) mtu: Option<u16>,
}

/// Synchronous GATT client.
///
/// Every operation dispatches one request (or one descriptor walk) on the
/// event loop and blocks the caller until the matching callback delivered
/// its outcome, the event loop died, or the callback timeout elapsed. At
/// most one request is outstanding per call; concurrent calls from several
/// threads each get their own completion context.
///
/// Lookups scoped to a primary service search its handle range; passing
/// `None` searches the whole attribute space.
pub struct GattClient<P: AttTransport> {
    transport: Arc<P>,
    link: Arc<Link>,
    config: BridgeConfig,
    session: Arc<Mutex<Session>>,
    notifications: Arc<NotificationRegistry>,
    on_connect: Option<ConnectHook>,
}

impl<P: AttTransport> GattClient<P> {
    pub fn new(
        transport: P,
        config: BridgeConfig,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(config.dispatcher.clone()));
        Self::with_link(Arc::new(transport), Arc::new(Link::new(dispatcher)), config, None)
    }

    pub fn builder(transport: P) -> GattClientBuilder<P> {
        GattClientBuilder::new(transport)
    }

    pub(crate) fn with_link(
        transport: Arc<P>,
        link: Arc<Link>,
        config: BridgeConfig,
        on_connect: Option<ConnectHook>,
    ) -> Self {
        let session = Session {
            security: config.connection.security_level,
            address_type: config.connection.address_type,
            ..Session::default()
        };
        Self {
            transport,
            link,
            config,
            session: Arc::new(Mutex::new(session)),
            notifications: Arc::new(NotificationRegistry::new()),
            on_connect,
        }
    }

    /// Replaces the hook run after each successful connect.
    pub fn set_connect_hook(
        &mut self,
        hook: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) {
        self.on_connect = Some(Box::new(hook));
    }

    pub fn state(&self) -> ConnectionState {
        self.link.get_state()
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// ATT_MTU negotiated on the current connection, if any
    pub fn mtu(&self) -> Option<u16> {
        self.session.lock().mtu
    }

    /// Address of the last peer a connection was attempted to
    pub fn peer(&self) -> Option<String> {
        self.session.lock().destination.clone()
    }

    fn policy(&self) -> WaitPolicy {
        self.config.completion.wait_policy()
    }

    // -
    // Session

    /// Connects to `address` (`XX:XX:XX:XX:XX:XX`).
    ///
    /// `address_type` defaults to the configured one. The event loop is
    /// started before the link is opened so the transport can schedule the
    /// connect callback on it.
    ///
    /// # Errors
    /// - [`ClientError::AlreadyConnected`] unless disconnected
    /// - [`ClientError::InvalidAddress`] on a malformed address
    /// - [`ClientError::ConnectFailed`] when the transport refused to start
    /// - [`GattError::Disconnected`] / [`GattError::NoCallback`] when the
    ///   link did not come up
    /// - whatever the connect hook returns
    pub fn connect(
        &self,
        address: &str,
        address_type: Option<AddressType>,
    ) -> Result<()> {
        if self.link.get_state() != ConnectionState::Disconnected {
            warn!("[GattClient] already connected to a device");
            return Err(ClientError::AlreadyConnected.into());
        }
        if !is_valid_address(address) {
            warn!("[GattClient] invalid address: {}", address);
            return Err(ClientError::InvalidAddress(address.to_string()).into());
        }

        let request = {
            let mut session = self.session.lock();
            session.destination = Some(address.to_string());
            session.address_type = address_type.unwrap_or(self.config.connection.address_type);
            ConnectRequest {
                source: self.config.connection.source.clone(),
                destination: address.to_string(),
                address_type: session.address_type,
                security: session.security,
                psm: self.config.connection.psm,
                mtu: session.mtu,
            }
        };

        info!("[GattClient] attempting to connect to {}", address);
        self.notifications.clear();
        self.link.set_state(ConnectionState::Connecting);
        self.link.start_dispatcher()?;

        let Some(event_loop) = self.link.dispatcher().event_loop() else {
            warn!("[GattClient] event loop did not start");
            self.link.set_state(ConnectionState::Disconnected);
            return Err(GattError::Disconnected("event loop is not running").into());
        };

        let (mut ctx, completer) = CompletionContext::pair();
        let on_hangup = hangup_handler(
            Arc::downgrade(&self.link),
            Arc::downgrade(&self.session),
            Arc::downgrade(&self.notifications),
        );
        if let Err(e) = self.transport.connect(
            event_loop,
            &request,
            on_hangup,
            connect_callback(self.link.clone(), completer),
        ) {
            warn!("[GattClient] connect to {} failed: {}", address, e);
            self.link.set_state(ConnectionState::Disconnected);
            return Err(ClientError::ConnectFailed(e).into());
        }

        if let Err(e) = ctx.wait(&self.link, &self.policy()) {
            warn!("[GattClient] connect callback error: {}", e);
            self.link.set_state(ConnectionState::Disconnected);
            return Err(e);
        }
        info!("[GattClient] connected to {}", address);

        match &self.on_connect {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    /// Closes the link and stops the event loop. Safe to call when not
    /// connected.
    pub fn disconnect(&self) {
        if self.link.get_state() != ConnectionState::Disconnected {
            self.transport.disconnect();
            self.session.lock().mtu = None;
            self.notifications.clear();
            self.link.set_state(ConnectionState::Disconnected);
        }
        info!("[GattClient] disconnected");

        let dispatcher = self.link.dispatcher();
        if dispatcher.is_running() {
            dispatcher.stop();
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.link.is_connected() {
            debug!("[GattClient] link is {:?}, refusing request", self.link.get_state());
            return Err(GattError::Disconnected("not connected").into());
        }
        Ok(())
    }

    /// Dispatches one request and blocks for its outcome.
    fn request<T>(
        &self,
        name: &'static str,
        dispatch: impl FnOnce(Completer<T>) -> bool,
    ) -> Result<T> {
        self.ensure_connected()?;

        let (mut ctx, completer) = CompletionContext::pair();
        if !dispatch(completer) {
            warn!("[GattClient] unable to send {} request", name);
            return Err(GattError::SendRequest(name).into());
        }
        debug!("[GattClient] {} request sent", name);
        ctx.wait(&self.link, &self.policy())
    }

    fn search_range(primary: Option<&GattPrimary>) -> Result<HandleRange> {
        primary.map_or(Ok(HandleRange::ALL), GattPrimary::handle_range)
    }

    // -
    // Services

    /// All primary services, or those of type `uuid`.
    pub fn primaries(
        &self,
        uuid: Option<Uuid>,
    ) -> Result<Vec<GattPrimary>> {
        match uuid {
            Some(uuid) => self.request(REQ_PRIMARY_BY_UUID, |c| {
                self.transport
                    .discover_primary_by_uuid(uuid, primary_by_uuid_callback(uuid, c))
            }),
            None => self.request(REQ_PRIMARY_ALL, |c| {
                self.transport.discover_primary_all(primary_all_callback(c))
            }),
        }
    }

    /// The primary service of type `uuid`, which must be unique.
    pub fn primary(
        &self,
        uuid: Uuid,
    ) -> Result<GattPrimary> {
        unique("primary service", self.primaries(Some(uuid))?)
    }

    pub fn included(
        &self,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattIncluded>> {
        let range = Self::search_range(primary)?;
        self.request(REQ_INCLUDED, |c| self.transport.find_included(range, included_callback(c)))
    }

    // -
    // Characteristics

    /// Characteristics of type `uuid`, or all of them when `uuid` is `None`.
    pub fn characteristics(
        &self,
        uuid: Option<Uuid>,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattCharacteristic>> {
        let range = Self::search_range(primary)?;
        self.request(REQ_CHARACTERISTICS, |c| {
            self.transport
                .discover_characteristics(range, uuid, characteristics_callback(c))
        })
    }

    /// The characteristic of type `uuid`, which must be unique.
    pub fn characteristic(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<GattCharacteristic> {
        unique("characteristic", self.characteristics(Some(uuid), primary)?)
    }

    // -
    // Descriptors

    /// Descriptors of `start`, from the handle after its declaration up to
    /// the one before `end` (or the end of `primary` / of the attribute
    /// space). Bounding the walk only saves requests: the walk also stops
    /// at the next declaration.
    pub fn descriptors_by_char(
        &self,
        start: &GattCharacteristic,
        end: Option<&GattCharacteristic>,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattDescriptor>> {
        let start_handle = start.handle.checked_add(1).ok_or(ClientError::InvalidHandle)?;
        let mut end_handle = end.map_or(MAX_HANDLE, |c| c.handle.saturating_sub(1));
        if let Some(primary) = primary {
            end_handle = end_handle.min(primary.range.end);
        }
        if start_handle > end_handle {
            return Err(ClientError::HandleOrder {
                start: start_handle,
                end: end_handle,
            }
            .into());
        }

        let range = HandleRange {
            start: start_handle,
            end: end_handle,
        };
        self.request(REQ_FIND_INFO, |c| match self.link.dispatcher().event_loop() {
            Some(event_loop) => {
                spawn_descriptor_walk(&event_loop, self.transport.clone(), range, c);
                true
            }
            None => false,
        })
    }

    /// Descriptors of the unique characteristic of type `char_uuid`.
    pub fn descriptors(
        &self,
        char_uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattDescriptor>> {
        let characteristic = self.characteristic(char_uuid, primary)?;
        self.descriptors_by_char(&characteristic, None, primary)
    }

    pub fn descriptor_by_char(
        &self,
        start: &GattCharacteristic,
        end: Option<&GattCharacteristic>,
        primary: Option<&GattPrimary>,
        desc_uuid: Uuid,
    ) -> Result<GattDescriptor> {
        find_descriptor(self.descriptors_by_char(start, end, primary)?, desc_uuid)
    }

    pub fn descriptor(
        &self,
        char_uuid: Uuid,
        primary: Option<&GattPrimary>,
        desc_uuid: Uuid,
    ) -> Result<GattDescriptor> {
        find_descriptor(self.descriptors(char_uuid, primary)?, desc_uuid)
    }

    // -
    // Reads

    pub fn read_by_handle(
        &self,
        handle: u16,
    ) -> Result<GattValue> {
        self.ensure_connected()?;
        if handle == INVALID_HANDLE {
            return Err(ClientError::InvalidHandle.into());
        }
        self.request(REQ_READ_BY_HANDLE, |c| {
            self.transport.read_by_handle(handle, read_by_handle_callback(handle, c))
        })
    }

    /// Values of every characteristic of type `uuid`, in a single request.
    /// Values longer than what fits in one response come back truncated; use
    /// [`GattClient::read_char_all_blob`] for those.
    pub fn read_char_all(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattValue>> {
        let range = Self::search_range(primary)?;
        self.request(REQ_READ_BY_UUID, |c| {
            self.transport.read_by_uuid(range, uuid, read_by_uuid_callback(uuid, c))
        })
    }

    pub fn read_char(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<GattValue> {
        unique("characteristic", self.read_char_all(uuid, primary)?)
    }

    /// Like [`GattClient::read_char`], going through discovery and a read by
    /// handle.
    pub fn read_char_blob(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<GattValue> {
        let characteristic = self.characteristic(uuid, primary)?;
        self.read_char_by_char(&characteristic)
    }

    pub fn read_char_all_blob(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattValue>> {
        self.characteristics(Some(uuid), primary)?
            .iter()
            .map(|c| self.read_char_by_char(c))
            .collect()
    }

    pub fn read_char_by_char(
        &self,
        characteristic: &GattCharacteristic,
    ) -> Result<GattValue> {
        let mut value = self.read_by_handle(characteristic.value_handle)?;
        value.uuid = Some(characteristic.uuid);
        Ok(value)
    }

    pub fn read_desc(
        &self,
        char_uuid: Uuid,
        primary: Option<&GattPrimary>,
        desc_uuid: Uuid,
    ) -> Result<GattValue> {
        let descriptor = self.descriptor(char_uuid, primary, desc_uuid)?;
        self.read_desc_by_desc(&descriptor)
    }

    pub fn read_all_desc(
        &self,
        char_uuid: Uuid,
        primary: Option<&GattPrimary>,
    ) -> Result<Vec<GattValue>> {
        self.descriptors(char_uuid, primary)?
            .iter()
            .map(|d| self.read_desc_by_desc(d))
            .collect()
    }

    pub fn read_desc_by_desc(
        &self,
        descriptor: &GattDescriptor,
    ) -> Result<GattValue> {
        let mut value = self.read_by_handle(descriptor.handle)?;
        value.uuid = Some(descriptor.uuid);
        Ok(value)
    }

    pub fn read_desc_by_char(
        &self,
        start: &GattCharacteristic,
        end: Option<&GattCharacteristic>,
        primary: Option<&GattPrimary>,
        desc_uuid: Uuid,
    ) -> Result<GattValue> {
        let descriptor = self.descriptor_by_char(start, end, primary, desc_uuid)?;
        self.read_desc_by_desc(&descriptor)
    }

    // -
    // Writes

    /// Writes `value` at `handle`.
    ///
    /// [`WriteType::Request`] blocks for the peer's acknowledgement;
    /// [`WriteType::Command`] returns once the command is queued.
    ///
    /// # Errors
    /// - [`ClientError::InvalidHandle`] for handle 0
    /// - [`ClientError::InvalidValue`] for an empty value
    /// - [`GattError::SendRequest`] when the transport refused the request
    pub fn write_by_handle(
        &self,
        handle: u16,
        value: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        self.ensure_connected()?;
        if handle == INVALID_HANDLE {
            return Err(ClientError::InvalidHandle.into());
        }
        if value.is_empty() {
            return Err(ClientError::InvalidValue.into());
        }

        match write_type {
            WriteType::Request => self.request(REQ_WRITE, |c| {
                self.transport.write_request(handle, value, write_callback(c))
            }),
            WriteType::Command => {
                if !self.transport.write_command(handle, value) {
                    warn!("[GattClient] unable to send {} request", REQ_WRITE_CMD);
                    return Err(GattError::SendRequest(REQ_WRITE_CMD).into());
                }
                Ok(())
            }
        }
    }

    pub fn write_char(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
        value: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        let characteristic = self.characteristic(uuid, primary)?;
        self.write_char_by_char(&characteristic, value, write_type)
    }

    pub fn write_char_by_char(
        &self,
        characteristic: &GattCharacteristic,
        value: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        self.write_by_handle(characteristic.value_handle, value, write_type)
    }

    /// Descriptor writes are always acknowledged.
    pub fn write_desc(
        &self,
        char_uuid: Uuid,
        primary: Option<&GattPrimary>,
        desc_uuid: Uuid,
        value: &[u8],
    ) -> Result<()> {
        let descriptor = self.descriptor(char_uuid, primary, desc_uuid)?;
        self.write_desc_by_desc(&descriptor, value)
    }

    pub fn write_desc_by_desc(
        &self,
        descriptor: &GattDescriptor,
        value: &[u8],
    ) -> Result<()> {
        self.write_by_handle(descriptor.handle, value, WriteType::Request)
    }

    pub fn write_desc_by_char(
        &self,
        start: &GattCharacteristic,
        end: Option<&GattCharacteristic>,
        primary: Option<&GattPrimary>,
        desc_uuid: Uuid,
        value: &[u8],
    ) -> Result<()> {
        let descriptor = self.descriptor_by_char(start, end, primary, desc_uuid)?;
        self.write_desc_by_desc(&descriptor, value)
    }

    // -
    // Link parameters

    /// Raises or lowers the link security level.
    ///
    /// On BR/EDR links the level is only recorded and applies to the next
    /// connection, reported as [`ClientError::ReconnectionNeeded`].
    pub fn change_security_level(
        &self,
        level: SecurityLevel,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.session.lock().security = level;

        if !self.config.connection.is_le() {
            info!("[GattClient] change will take effect on reconnection");
            return Err(ClientError::ReconnectionNeeded.into());
        }

        self.transport.set_security_level(level).map_err(|e| {
            warn!("[GattClient] failed to change security level: {}", e);
            ClientError::Security(e)
        })?;
        debug!("[GattClient] security level set to {:?}", level);
        Ok(())
    }

    /// Exchanges the ATT_MTU, once per connection, LE only.
    ///
    /// Returns the MTU in use afterwards, `min(server, mtu)`.
    pub fn change_mtu(
        &self,
        mtu: u16,
    ) -> Result<u16> {
        self.ensure_connected()?;
        if !self.config.connection.is_le() {
            return Err(ClientError::LeOnly.into());
        }
        if self.session.lock().mtu.is_some() {
            return Err(ClientError::MtuAlreadyExchanged.into());
        }
        if mtu < ATT_DEFAULT_LE_MTU {
            return Err(ClientError::InvalidMtu {
                requested: mtu,
                minimum: ATT_DEFAULT_LE_MTU,
            }
            .into());
        }

        let negotiated = self.request(REQ_EXCHANGE_MTU, |c| {
            self.transport
                .exchange_mtu(mtu, exchange_mtu_callback(self.transport.clone(), mtu, c))
        })?;
        self.session.lock().mtu = Some(negotiated);
        info!("[GattClient] MTU exchanged: {}", negotiated);
        Ok(negotiated)
    }

    // -
    // Notifications

    /// Subscribes to the unique characteristic of type `uuid`.
    pub fn add_notif(
        &self,
        uuid: Uuid,
        primary: Option<&GattPrimary>,
        kind: NotificationKind,
        callback: impl Fn(&GattNotification) + Send + Sync + 'static,
    ) -> Result<()> {
        let characteristic = self.characteristic(uuid, primary)?;
        self.add_notif_by_char(&characteristic, None, primary, kind, callback)
    }

    /// Subscribes to `start` by writing its Client Characteristic
    /// Configuration descriptor. `end` and `primary` only bound the search
    /// for that descriptor, as in [`GattClient::descriptors_by_char`].
    ///
    /// `callback` runs on the event loop for every update of the value; it
    /// must not block. Indications are confirmed once it returned.
    /// Subscriptions last until removed or until the link goes down.
    ///
    /// # Errors
    /// - [`ClientError::NotNotifiable`] / [`ClientError::NotIndicable`] when
    ///   the characteristic properties do not allow `kind`
    /// - [`ClientError::NotFound`] without a configuration descriptor
    pub fn add_notif_by_char(
        &self,
        start: &GattCharacteristic,
        end: Option<&GattCharacteristic>,
        primary: Option<&GattPrimary>,
        kind: NotificationKind,
        callback: impl Fn(&GattNotification) + Send + Sync + 'static,
    ) -> Result<()> {
        self.ensure_connected()?;
        if !start.supports(kind) {
            return Err(match kind {
                NotificationKind::Notification => ClientError::NotNotifiable,
                NotificationKind::Indication => ClientError::NotIndicable,
            }
            .into());
        }
        let ccc = self.descriptor_by_char(start, end, primary, uuid_from_u16(CCC_UUID))?;

        if self.notifications.claim_handler_install() {
            self.transport.set_notification_handler(notification_handler(
                Arc::downgrade(&self.notifications),
                Arc::downgrade(&self.transport),
            ));
        }
        // Registered first: the peer may push as soon as the write lands
        self.notifications.insert(Subscription {
            uuid: start.uuid,
            kind,
            value_handle: start.value_handle,
            ccc_handle: ccc.handle,
            callback: Arc::new(callback),
        });
        if let Err(e) = self.write_desc_by_desc(&ccc, &kind.ccc_value()) {
            warn!("[GattClient] subscription to {} failed: {}", start.uuid, e);
            self.notifications.remove(start.value_handle);
            return Err(e);
        }
        info!("[GattClient] subscribed to {} ({:?})", start.uuid, kind);
        Ok(())
    }

    /// Characteristic type subscribed at `value_handle`, if any.
    pub fn notif_uuid(
        &self,
        value_handle: u16,
    ) -> Option<Uuid> {
        self.notifications.uuid_of(value_handle)
    }

    /// Current subscriptions, in handle order.
    pub fn notif_list(&self) -> Vec<Subscription> {
        self.notifications.subscriptions()
    }

    /// Removes every subscription made for characteristics of type `uuid`.
    pub fn remove_notif(
        &self,
        uuid: Uuid,
    ) -> Result<()> {
        let subscriptions = self.notifications.find_by_uuid(&uuid);
        if subscriptions.is_empty() {
            return Err(ClientError::NotFound("notification").into());
        }
        self.unsubscribe_all(subscriptions)
    }

    pub fn remove_notif_by_char(
        &self,
        characteristic: &GattCharacteristic,
    ) -> Result<()> {
        let subscription = self
            .notifications
            .get(characteristic.value_handle)
            .ok_or(ClientError::NotFound("notification"))?;
        self.unsubscribe(subscription)
    }

    /// Removes every subscription. Without a link they are only forgotten.
    pub fn remove_all_notif(&self) -> Result<()> {
        if !self.link.is_connected() {
            self.notifications.clear();
            return Ok(());
        }
        self.unsubscribe_all(self.notifications.subscriptions())
    }

    /// The subscription is forgotten even when disabling it on the peer fails.
    fn unsubscribe(
        &self,
        subscription: Subscription,
    ) -> Result<()> {
        self.notifications.remove(subscription.value_handle);
        debug!("[GattClient] unsubscribe from {}", subscription.uuid);
        self.write_by_handle(subscription.ccc_handle, &CCC_DISABLED, WriteType::Request)
    }

    /// Reports the first failure after trying every subscription.
    fn unsubscribe_all(
        &self,
        subscriptions: Vec<Subscription>,
    ) -> Result<()> {
        let mut outcome = Ok(());
        for subscription in subscriptions {
            if let Err(e) = self.unsubscribe(subscription) {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        outcome
    }
}

impl<P: AttTransport> Drop for GattClient<P> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Link-loss handler: forget the negotiated MTU and the subscriptions, then
/// mark the link down.
fn hangup_handler(
    link: Weak<Link>,
    session: Weak<Mutex<Session>>,
    notifications: Weak<NotificationRegistry>,
) -> HangupHandler {
    Box::new(move || {
        warn!("[GattClient] connection lost");
        if let Some(session) = session.upgrade() {
            session.lock().mtu = None;
        }
        if let Some(notifications) = notifications.upgrade() {
            notifications.clear();
        }
        if let Some(link) = link.upgrade() {
            link.set_state(ConnectionState::Disconnected);
        }
    })
}

fn unique<T>(
    what: &'static str,
    mut found: Vec<T>,
) -> Result<T> {
    match found.len() {
        0 => Err(ClientError::NotFound(what).into()),
        1 => Ok(found.remove(0)),
        _ => Err(ClientError::NotUnique(what).into()),
    }
}

fn find_descriptor(
    descriptors: Vec<GattDescriptor>,
    uuid: Uuid,
) -> Result<GattDescriptor> {
    descriptors
        .into_iter()
        .find(|d| d.uuid == uuid)
        .ok_or_else(|| ClientError::NotFound("descriptor").into())
}
