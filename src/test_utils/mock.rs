use std::sync::Arc;

use parking_lot::Mutex;

use crate::test_utils::enable_logger;
use crate::test_utils::test_config;
use crate::GattClient;
use crate::HangupHandler;
use crate::MockAttTransport;

pub const MOCK_PEER: &str = "00:1A:7D:DA:71:13";

/// Slot receiving the hang-up handler installed by `connect`
pub type HangupSlot = Arc<Mutex<Option<HangupHandler>>>;

/// Expects one connect that succeeds on the event loop.
pub fn expect_connect_ok(transport: &mut MockAttTransport) -> HangupSlot {
    let slot: HangupSlot = Arc::new(Mutex::new(None));
    let installed = slot.clone();
    transport
        .expect_connect()
        .times(1)
        .returning(move |event_loop, _request, on_hangup, callback| {
            *installed.lock() = Some(on_hangup);
            event_loop.spawn(async move { callback(Ok(())) });
            Ok(())
        });
    slot
}

/// Builds a client around `transport` and connects it to [`MOCK_PEER`].
///
/// `transport` must already expect the connect, see [`expect_connect_ok`].
/// Any number of disconnects is accepted, the client disconnects on drop.
pub fn connected_client(
    mut transport: MockAttTransport,
    callback_timeout_in_ms: u64,
) -> GattClient<MockAttTransport> {
    enable_logger();
    transport.expect_disconnect().return_const(());
    let client = GattClient::builder(transport)
        .set_config(test_config(callback_timeout_in_ms))
        .build()
        .expect("config should be valid");
    client.connect(MOCK_PEER, None).expect("connect should succeed");
    client
}
