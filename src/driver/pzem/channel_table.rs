//! output channel table of one meter
//! - one slot per channel, bound at configuration time and never rebound
//! - unbound slots are normal, dispatch skips them

use super::entity::{Channel, Phase, PhaseQuantity, TotalQuantity, CHANNEL_COUNT};
use super::traits::ReadingSink;
use crate::common::error::DriverError;
use crate::{trace, warn};

const LOG_TAG: &str = "channel_table";

pub type SinkBox = Box<dyn ReadingSink + Send>;

pub struct ChannelTable {
    slots: Vec<Option<SinkBox>>,
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            slots: (0..CHANNEL_COUNT).map(|_| None).collect(),
        }
    }

    pub fn bind(&mut self, channel: Channel, sink: SinkBox) -> Result<(), DriverError> {
        let slot = &mut self.slots[channel.index()];
        if slot.is_some() {
            return Err(DriverError(format!("channel {} already bound", channel)));
        }
        *slot = Some(sink);
        Ok(())
    }

    pub fn set_phase_sink(&mut self, quantity: PhaseQuantity, phase: Phase, sink: SinkBox) -> Result<(), DriverError> {
        self.bind(Channel::Phase(phase, quantity), sink)
    }

    pub fn set_total_sink(&mut self, quantity: TotalQuantity, sink: SinkBox) -> Result<(), DriverError> {
        self.bind(Channel::Total(quantity), sink)
    }

    pub fn is_bound(&self, channel: Channel) -> bool {
        self.slots[channel.index()].is_some()
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// publish a reading, already in the channel's unit
    /// returns true when a sink received the value
    pub fn dispatch(&self, channel: Channel, value: Option<f32>) -> bool {
        match (&self.slots[channel.index()], value) {
            (Some(sink), Some(value)) => match sink.publish(value) {
                Ok(_) => true,
                Err(e) => {
                    warn!(LOG_TAG, "sink of {} failed: {}", channel, e);
                    false
                }
            },
            (Some(_), None) => {
                trace!(LOG_TAG, "{} invalid this cycle, skipped", channel);
                false
            }
            (None, _) => false,
        }
    }
}
