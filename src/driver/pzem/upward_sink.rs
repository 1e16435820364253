use std::sync::mpsc::Sender;

use super::entity::Channel;
use super::traits::ReadingSink;
use crate::common::error::DriverError;
use crate::entity::dto::reading_dto::ReadingDto;

/// sink that reports readings to the upward channel
pub struct UpwardSink {
    device_id: String,
    channel: Channel,
    report_tx: Sender<ReadingDto>,
}

impl UpwardSink {
    pub fn new(device_id: &str, channel: Channel, report_tx: Sender<ReadingDto>) -> Self {
        Self {
            device_id: device_id.to_string(),
            channel,
            report_tx,
        }
    }
}

impl ReadingSink for UpwardSink {
    fn publish(&self, value: f32) -> Result<(), DriverError> {
        self.report_tx
            .send(ReadingDto {
                device_id: self.device_id.clone(),
                channel: self.channel.key(),
                unit: self.channel.unit().to_string(),
                accuracy_decimals: self.channel.accuracy_decimals(),
                state_class: self.channel.state_class(),
                value,
            })
            .map_err(|e| DriverError(format!("UpwardSink cannot send to upward channel, exception: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::pzem::entity::{Phase, PhaseQuantity, StateClass};
    use std::sync::mpsc;

    #[test]
    fn test_publish() {
        let (tx, rx) = mpsc::channel();
        let sink = UpwardSink::new("pzem_main", Channel::Phase(Phase::A, PhaseQuantity::ActivePower), tx);
        sink.publish(1.5).unwrap();

        let reading = rx.recv().unwrap();
        assert_eq!(reading.device_id, "pzem_main");
        assert_eq!(reading.channel, "active_power_a");
        assert_eq!(reading.unit, "kW");
        assert_eq!(reading.accuracy_decimals, 3);
        assert_eq!(reading.state_class, StateClass::Measurement);
        assert_eq!(reading.value, 1.5);
    }

    #[test]
    fn test_publish_closed_channel() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let sink = UpwardSink::new("pzem_main", Channel::Phase(Phase::A, PhaseQuantity::Voltage), tx);
        assert!(sink.publish(230.0).is_err());
    }

    #[test]
    fn test_publish_energy_is_total_increasing() {
        let (tx, rx) = mpsc::channel();
        let sink = UpwardSink::new("pzem_main", Channel::Phase(Phase::B, PhaseQuantity::ReactiveEnergy), tx);
        sink.publish(12.5).unwrap();

        let reading = rx.recv().unwrap();
        assert_eq!(reading.unit, "kVarh");
        assert_eq!(reading.state_class, StateClass::TotalIncreasing);
    }
}
