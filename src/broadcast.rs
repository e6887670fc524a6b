//! Broadcast fan-out.
//!
//! Each frame is sequenced and encoded once, then handed to every
//! registered [`Subscriber`]. Delivery is fire-and-forget: a sink that
//! fails is logged and unregistered, never retried, and the failure never
//! reaches the ingestion caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, error, warn};

use crate::app::frames::{Frame, FrameBody};
use crate::app::ports::Subscriber;
use crate::config::WireFormat;
use crate::error::{Error, Result};

/// Handle returned by registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

pub struct Broadcaster {
    format: WireFormat,
    next_id: u64,
    next_seq: u64,
    sinks: BTreeMap<SubscriberId, Box<dyn Subscriber>>,
}

impl Broadcaster {
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            next_id: 0,
            next_seq: 0,
            sinks: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn encode(&mut self, body: FrameBody, sent_at: DateTime<Utc>) -> Result<Vec<u8>> {
        let frame = Frame {
            seq: self.next_seq,
            sent_at,
            body,
        };
        self.next_seq += 1;
        frame.encode(self.format)
    }

    /// Register `sink` and push it the initial frame.
    ///
    /// A sink that fails its initial delivery is never registered.
    pub fn register(
        &mut self,
        mut sink: Box<dyn Subscriber>,
        initial: FrameBody,
        now: DateTime<Utc>,
    ) -> Result<SubscriberId> {
        let bytes = self.encode(initial, now)?;
        sink.deliver(&bytes).map_err(|e| {
            warn!("subscriber refused initial frame: {e}");
            Error::Delivery(e)
        })?;
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.sinks.insert(id, sink);
        debug!("subscriber {id:?} registered ({} total)", self.sinks.len());
        Ok(id)
    }

    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        let removed = self.sinks.remove(&id).is_some();
        if removed {
            debug!("subscriber {id:?} unregistered ({} left)", self.sinks.len());
        }
        removed
    }

    /// Deliver `body` to every sink; returns how many took it.
    pub fn broadcast(&mut self, body: FrameBody, now: DateTime<Utc>) -> usize {
        if self.sinks.is_empty() {
            return 0;
        }
        let kind = body.kind();
        let bytes = match self.encode(body, now) {
            Ok(b) => b,
            Err(e) => {
                error!("dropping {kind} frame: {e}");
                return 0;
            }
        };

        let before = self.sinks.len();
        self.sinks.retain(|id, sink| match sink.deliver(&bytes) {
            Ok(()) => true,
            Err(e) => {
                warn!("subscriber {id:?} dropped: {e}");
                false
            }
        });
        let delivered = self.sinks.len();
        debug!("{kind} frame delivered to {delivered}/{before} subscribers");
        delivered
    }
}
