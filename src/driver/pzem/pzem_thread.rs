//! pzem bus thread loop
//! - set up every meter on the bus, one after the other
//! - poll each meter at its own interval, meters never interleave on the bus
//! - commands are executed between two cycles, never inside one

use tokio::sync::mpsc::Receiver;
use tokio::time::{sleep_until, Duration, Instant};

use super::pzem_device::PzemDevice;
use crate::common::error::DriverError;
use crate::entity::dto::meter_command_dto::{MeterActionEnum, MeterCommandDto};
use crate::{debug, error, info, warn};

const LOG_TAG: &str = "pzem_thread";
// wake up interval when no meter is mounted
const IDLE_WAKE_SECS: u64 = 3600;

#[derive(Debug)]
pub enum PzemThreadCommand {
    Meter(MeterCommandDto),
    // stop polling and leave the thread
    Stop,
}

pub async fn run_loop(
    bus_name: &str,
    mut devices: Vec<PzemDevice>,
    mut command_rx: Receiver<PzemThreadCommand>,
) -> Result<(), DriverError> {
    for device in devices.iter_mut() {
        if let Err(e) = device.setup().await {
            error!(LOG_TAG, "bus {}, meter {} setup failed, polling anyway: {}", bus_name, device.device_id(), e);
        }
    }
    info!(LOG_TAG, "bus {}, {} meter(s) set up, start polling", bus_name, devices.len());

    let mut next_due: Vec<Instant> = vec![Instant::now(); devices.len()];

    loop {
        let wake = next_due
            .iter()
            .min()
            .copied()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(IDLE_WAKE_SECS));

        tokio::select! {
            command_opt = command_rx.recv() => {
                match command_opt {
                    Some(PzemThreadCommand::Meter(command)) => execute_command(bus_name, &mut devices, command).await,
                    Some(PzemThreadCommand::Stop) => {
                        info!(LOG_TAG, "bus {}, stop command received, quitting", bus_name);
                        return Ok(())
                    }
                    None => {
                        warn!(LOG_TAG, "bus {}, command channel closed, quitting", bus_name);
                        return Ok(())
                    }
                }
            }

            _ = sleep_until(wake) => {
                let now = Instant::now();
                for (device, due) in devices.iter_mut().zip(next_due.iter_mut()) {
                    if *due <= now {
                        device.update().await;
                        *due = now + device.update_interval();
                    }
                }
            }
        }
    }
}

async fn execute_command(bus_name: &str, devices: &mut [PzemDevice], command: MeterCommandDto) {
    debug!(LOG_TAG, "bus {}, command: {:?}", bus_name, command);
    if let MeterActionEnum::SetSoftwareAddress(address) = command.action {
        // addresses stay unique on one bus
        if let Some(holder) = devices
            .iter()
            .find(|device| device.device_id() != command.device_id && device.address() == address)
        {
            error!(
                LOG_TAG,
                "bus {}, meter {} cannot take address {}, already used by {}",
                bus_name, command.device_id, address, holder.device_id()
            );
            return;
        }
    }
    match devices.iter_mut().find(|device| device.device_id() == command.device_id) {
        Some(device) => {
            if device.execute(&command.action).await {
                info!(LOG_TAG, "bus {}, meter {} {:?} done", bus_name, command.device_id, command.action);
            } else {
                error!(LOG_TAG, "bus {}, meter {} {:?} failed", bus_name, command.device_id, command.action);
            }
        }
        None => {
            warn!(LOG_TAG, "bus {}, no meter with device_id {}, command ignored", bus_name, command.device_id);
        }
    }
}
