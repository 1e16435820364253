use std::sync::mpsc;
use std::thread;

use crate::entity::dto::reading_dto::ReadingDto;
use crate::{info, warn};

const LOG_TAG: &'static str = "reporting_thread";

/// upward reporting thread
/// writes every reading as a json line, exits when all senders are dropped
pub fn reporting_thread(reading_rx: mpsc::Receiver<ReadingDto>) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut reported = 0;
        loop {
            match reading_rx.recv() {
                Ok(reading) => {
                    match serde_json::to_string(&reading) {
                        Ok(line) => info!(LOG_TAG, "{}", line),
                        Err(e) => warn!(LOG_TAG, "cannot serialize reading {:?}: {}", reading, e),
                    }
                    reported += 1;
                }
                Err(e) => {
                    info!(LOG_TAG, "report thread exiting: reading channel closed, msg: {}", e);
                    return reported;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::driver::pzem::entity::StateClass;

    #[test]
    fn test_report_until_closed() {
        let _ = init_logger();
        let (tx, rx) = mpsc::channel();
        let handle = reporting_thread(rx);
        for value in [230.1, 229.8] {
            tx.send(ReadingDto {
                device_id: "pzem_main".to_string(),
                channel: "voltage_a".to_string(),
                unit: "V".to_string(),
                accuracy_decimals: 1,
                state_class: StateClass::Measurement,
                value,
            })
            .unwrap();
        }
        drop(tx);
        assert_eq!(handle.join().unwrap(), 2);
    }

    #[test]
    fn test_reading_json() {
        let reading = ReadingDto {
            device_id: "pzem_main".to_string(),
            channel: "total_active_energy".to_string(),
            unit: "kWh".to_string(),
            accuracy_decimals: 3,
            state_class: StateClass::TotalIncreasing,
            value: 1.5,
        };
        let line = serde_json::to_string(&reading).unwrap();
        assert_eq!(
            line,
            r#"{"device_id":"pzem_main","channel":"total_active_energy","unit":"kWh","accuracy_decimals":3,"state_class":"total_increasing","value":1.5}"#
        );
    }
}
