//! The fixed table of live buses.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use super::config::BusConfig;
use super::topic::Bus;
use crate::alloc::Pool;
use crate::error::{Error, Result};
use crate::message::types::PayloadBuf;
use crate::util::{ActorId, BusId};

/// Fixed array of bus slots plus the monotonic id counter.
pub(crate) struct BusTable {
    slots: Box<[Option<Bus>]>,
    next_raw_id: u32,
}

impl BusTable {
    pub fn new(max_buses: usize) -> Self {
        let mut slots = Vec::with_capacity(max_buses);
        slots.resize_with(max_buses, || None);
        Self {
            slots: slots.into_boxed_slice(),
            next_raw_id: 0,
        }
    }

    /// Validate the config and claim a slot.
    pub fn create(&mut self, cfg: BusConfig) -> Result<BusId> {
        cfg.validate()?;
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::nomem("bus table full"))?;
        self.next_raw_id = self.next_raw_id.wrapping_add(1);
        if self.next_raw_id == 0 {
            self.next_raw_id = 1;
        }
        let id = BusId::from_raw(self.next_raw_id);
        self.slots[slot] = Some(Bus::new(id, cfg));
        debug!(%id, ?cfg, "bus created");
        Ok(id)
    }

    /// Tear down a bus; forbidden while subscribers remain.
    pub fn destroy(&mut self, id: BusId, bufs: &mut Pool<PayloadBuf>) -> Result<()> {
        let slot = self
            .find(id)
            .ok_or(Error::invalid("unknown bus id"))?;
        let bus = self.slots[slot]
            .as_mut()
            .ok_or(Error::invalid("unknown bus id"))?;
        if bus.subscriber_count() > 0 {
            return Err(Error::invalid("bus still has subscribers"));
        }
        bus.drain(bufs);
        self.slots[slot] = None;
        debug!(%id, "bus destroyed");
        Ok(())
    }

    pub fn get(&self, id: BusId) -> Option<&Bus> {
        self.find(id).and_then(|i| self.slots[i].as_ref())
    }

    pub fn get_mut(&mut self, id: BusId) -> Option<&mut Bus> {
        let slot = self.find(id)?;
        self.slots[slot].as_mut()
    }

    /// Drop `actor`'s subscription on every bus (death cleanup).
    pub fn unsubscribe_everywhere(&mut self, actor: ActorId) {
        for bus in self.slots.iter_mut().flatten() {
            if bus.is_subscribed(actor) {
                let _ = bus.unsubscribe(actor);
            }
        }
    }

    fn find(&self, id: BusId) -> Option<usize> {
        if !id.is_valid() {
            return None;
        }
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|b| b.id == id))
    }
}
