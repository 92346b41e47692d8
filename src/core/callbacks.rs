//! Result assembly.
//!
//! Each constructor turns a [`Completer`] into the callback the transport
//! invokes on the event loop. A callback builds the caller-visible payload
//! from the decoded response, or the error describing why it could not, and
//! completes exactly once. Partially built payloads are dropped on error.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use uuid::Uuid;

use crate::att::ecode_to_str;
use crate::att::ATT_ECODE_ATTR_NOT_FOUND;
use crate::constants::*;
use crate::is_declaration;
use crate::AttTransport;
use crate::CharacteristicRecord;
use crate::Completer;
use crate::ConnectCallback;
use crate::ConnectionState;
use crate::DiscoveryCallback;
use crate::GattCharacteristic;
use crate::GattDescriptor;
use crate::GattError;
use crate::GattIncluded;
use crate::GattPrimary;
use crate::GattValue;
use crate::HandleRange;
use crate::HandleValue;
use crate::IncludeRecord;
use crate::InfoEntry;
use crate::Link;
use crate::ResponseCallback;
use crate::Result;
use crate::ServiceRecord;

pub(crate) fn check_status(
    request: &'static str,
    status: u8,
) -> Result<()> {
    if status == ATT_STATUS_SUCCESS {
        return Ok(());
    }
    let reason = ecode_to_str(status);
    warn!("[Callback] {} failed: {} ({:#04x})", request, reason, status);
    Err(GattError::RequestFailed {
        request,
        status,
        reason,
    }
    .into())
}

fn decoded<T>(
    request: &'static str,
    body: Option<T>,
) -> Result<T> {
    body.ok_or_else(|| GattError::Protocol(format!("malformed {request} response")).into())
}

fn record_range(
    start: u16,
    end: u16,
) -> Result<HandleRange> {
    if start > end {
        return Err(GattError::Protocol(format!(
            "inverted handle range {start:#06x}..{end:#06x} in response"
        ))
        .into());
    }
    Ok(HandleRange { start, end })
}

/// Builds one payload per record, failing as a whole on the first bad one.
fn assemble<R, T>(
    what: &'static str,
    records: Vec<R>,
    mut build: impl FnMut(R) -> Result<T>,
) -> Result<Vec<T>> {
    let mut payload = Vec::new();
    payload
        .try_reserve_exact(records.len())
        .map_err(|_| GattError::Allocation(what))?;
    for record in records {
        payload.push(build(record)?);
    }
    Ok(payload)
}

pub(crate) fn connect_callback(
    link: Arc<Link>,
    completer: Completer<()>,
) -> ConnectCallback {
    Box::new(move |result| match result {
        Ok(()) => {
            link.set_state(ConnectionState::Connected);
            completer.succeed(());
        }
        Err(e) => {
            // The loop is stopped before the waiter wakes up, so the waiter
            // reports a disconnection; the reason only reaches the log.
            warn!("[Callback] {} failed: {}", REQ_CONNECT, e);
            link.set_state(ConnectionState::Disconnected);
            completer.fail(GattError::Disconnected("link could not be opened"));
        }
    })
}

pub(crate) fn primary_all_callback(completer: Completer<Vec<GattPrimary>>) -> DiscoveryCallback<ServiceRecord> {
    Box::new(move |status, services| {
        trace!("[Callback] primary all: {} record(s)", services.len());
        let outcome = check_status(REQ_PRIMARY_ALL, status).and_then(|_| {
            assemble("primary service list", services, |service| {
                Ok(GattPrimary {
                    uuid: service.uuid,
                    changed: service.changed,
                    range: record_range(service.start, service.end)?,
                })
            })
        });
        completer.complete(outcome);
    })
}

/// Ranges come back without their type; `uuid` is the one that was searched.
pub(crate) fn primary_by_uuid_callback(
    uuid: Uuid,
    completer: Completer<Vec<GattPrimary>>,
) -> DiscoveryCallback<HandleRange> {
    Box::new(move |status, ranges| {
        let outcome = check_status(REQ_PRIMARY_BY_UUID, status).and_then(|_| {
            assemble("primary service list", ranges, |range| {
                Ok(GattPrimary {
                    uuid,
                    changed: false,
                    range: record_range(range.start, range.end)?,
                })
            })
        });
        completer.complete(outcome);
    })
}

pub(crate) fn included_callback(completer: Completer<Vec<GattIncluded>>) -> DiscoveryCallback<IncludeRecord> {
    Box::new(move |status, includes| {
        let outcome = check_status(REQ_INCLUDED, status).and_then(|_| {
            assemble("included service list", includes, |include| {
                Ok(GattIncluded {
                    uuid: include.uuid,
                    handle: include.handle,
                    range: record_range(include.start, include.end)?,
                })
            })
        });
        completer.complete(outcome);
    })
}

pub(crate) fn characteristics_callback(
    completer: Completer<Vec<GattCharacteristic>>
) -> DiscoveryCallback<CharacteristicRecord> {
    Box::new(move |status, characteristics| {
        let outcome = check_status(REQ_CHARACTERISTICS, status).and_then(|_| {
            assemble("characteristic list", characteristics, |c| {
                Ok(GattCharacteristic {
                    uuid: c.uuid,
                    handle: c.handle,
                    properties: c.properties,
                    value_handle: c.value_handle,
                })
            })
        });
        completer.complete(outcome);
    })
}

/// The value is tagged with the handle it was read from. The buffer moves
/// into the payload untouched, so nothing is left to release on any path.
pub(crate) fn read_by_handle_callback(
    handle: u16,
    completer: Completer<GattValue>,
) -> ResponseCallback<Vec<u8>> {
    Box::new(move |status, body| {
        let outcome = check_status(REQ_READ_BY_HANDLE, status)
            .and_then(|_| decoded(REQ_READ_BY_HANDLE, body))
            .map(|data| GattValue {
                uuid: None,
                handle,
                data,
            });
        completer.complete(outcome);
    })
}

pub(crate) fn read_by_uuid_callback(
    uuid: Uuid,
    completer: Completer<Vec<GattValue>>,
) -> ResponseCallback<Vec<HandleValue>> {
    Box::new(move |status, body| {
        let outcome = check_status(REQ_READ_BY_UUID, status)
            .and_then(|_| decoded(REQ_READ_BY_UUID, body))
            .and_then(|values| {
                assemble("value list", values, |v| {
                    Ok(GattValue {
                        uuid: Some(uuid),
                        handle: v.handle,
                        data: v.value,
                    })
                })
            });
        completer.complete(outcome);
    })
}

pub(crate) fn write_callback(completer: Completer<()>) -> ResponseCallback<()> {
    Box::new(move |status, body| {
        let outcome = check_status(REQ_WRITE, status).and_then(|_| decoded(REQ_WRITE, body));
        completer.complete(outcome);
    })
}

/// Settles on `min(server, requested)` and applies it to the channel.
pub(crate) fn exchange_mtu_callback<P: AttTransport>(
    transport: Arc<P>,
    requested: u16,
    completer: Completer<u16>,
) -> ResponseCallback<u16> {
    Box::new(move |status, body| {
        let outcome = check_status(REQ_EXCHANGE_MTU, status)
            .and_then(|_| decoded(REQ_EXCHANGE_MTU, body))
            .and_then(|server_mtu| {
                let mtu = server_mtu.min(requested);
                if !transport.set_mtu(mtu) {
                    return Err(GattError::Protocol(format!("unable to set new MTU value {mtu}")).into());
                }
                debug!("[Callback] MTU set to {}", mtu);
                Ok(mtu)
            });
        completer.complete(outcome);
    })
}

// -
// Descriptor discovery

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageStep {
    /// Request the next page starting at this handle
    Next(u16),
    Done,
}

/// Accumulates Find Information pages of one descriptor walk.
#[derive(Debug)]
pub(crate) struct DescriptorPager {
    end: u16,
    found: Vec<GattDescriptor>,
    last_handle: Option<u16>,
    pages: usize,
}

impl DescriptorPager {
    pub(crate) fn new(end: u16) -> Self {
        Self {
            end,
            found: Vec::new(),
            last_handle: None,
            pages: 0,
        }
    }

    /// Absorbs one response and decides whether the walk goes on.
    ///
    /// The walk ends on an empty page, on the first service, include or
    /// characteristic declaration, on the first handle past the end of the
    /// range, or when the last handle reaches that end. Entries past the end
    /// are never kept.
    ///
    /// `Attribute Not Found` after at least one page is how a BLE server
    /// signals that nothing is left in the range: it ends the walk with the
    /// descriptors found so far. On the first page it fails the walk.
    pub(crate) fn absorb(
        &mut self,
        status: u8,
        body: Option<Vec<InfoEntry>>,
    ) -> Result<PageStep> {
        if status == ATT_ECODE_ATTR_NOT_FOUND && self.pages > 0 {
            debug!("[Callback] no attribute past {:?}, end of descriptors", self.last_handle);
            return Ok(PageStep::Done);
        }
        check_status(REQ_FIND_INFO, status)?;
        let entries = decoded(REQ_FIND_INFO, body)?;
        self.pages += 1;

        if entries.is_empty() {
            debug!("[Callback] empty find information page");
            return Ok(PageStep::Done);
        }

        self.found
            .try_reserve(entries.len())
            .map_err(|_| GattError::Allocation("descriptor list"))?;
        for entry in entries {
            if let Some(previous) = self.last_handle {
                if entry.handle <= previous {
                    return Err(GattError::Protocol(format!(
                        "find information handle {:#06x} after {:#06x}",
                        entry.handle, previous
                    ))
                    .into());
                }
            }
            if entry.handle > self.end {
                debug!("[Callback] {:#06x} past the end of the range, end of descriptors", entry.handle);
                return Ok(PageStep::Done);
            }
            self.last_handle = Some(entry.handle);

            if is_declaration(&entry.uuid) {
                debug!("[Callback] reach end of descriptor list at {:#06x}", entry.handle);
                return Ok(PageStep::Done);
            }
            self.found.push(GattDescriptor {
                uuid: entry.uuid,
                handle: entry.handle,
            });
        }

        match self.last_handle {
            Some(last) if last != MAX_HANDLE && last < self.end => Ok(PageStep::Next(last + 1)),
            _ => Ok(PageStep::Done),
        }
    }

    pub(crate) fn into_descriptors(self) -> Vec<GattDescriptor> {
        self.found
    }
}

/// Walks the descriptors of `range`, one Find Information request per page.
///
/// Runs on the event loop; only the outcome of the whole walk is reported.
pub(crate) async fn discover_descriptors<P: AttTransport>(
    transport: Arc<P>,
    range: HandleRange,
) -> Result<Vec<GattDescriptor>> {
    let mut pager = DescriptorPager::new(range.end);
    let mut start = range.start;

    loop {
        let (page_tx, page_rx) = oneshot::channel();
        let page = HandleRange { start, end: range.end };
        trace!("[Callback] find information {:#06x}..{:#06x}", page.start, page.end);

        let callback: ResponseCallback<Vec<InfoEntry>> = Box::new(move |status, body| {
            let _ = page_tx.send((status, body));
        });
        if !transport.discover_descriptors(page, callback) {
            warn!("[Callback] unable to send {} request", REQ_FIND_INFO);
            return Err(GattError::SendRequest(REQ_FIND_INFO).into());
        }

        let (status, body) = page_rx
            .await
            .map_err(|_| GattError::Disconnected("find information response dropped"))?;
        match pager.absorb(status, body)? {
            PageStep::Next(next) => start = next,
            PageStep::Done => return Ok(pager.into_descriptors()),
        }
    }
}

pub(crate) fn spawn_descriptor_walk<P: AttTransport>(
    event_loop: &crate::EventLoop,
    transport: Arc<P>,
    range: HandleRange,
    completer: Completer<Vec<GattDescriptor>>,
) {
    event_loop.spawn(async move {
        completer.complete(discover_descriptors(transport, range).await);
    });
}
