//! Pzem bus device class
//! Multiple pzem meters can be mounted on one rs-485 bus, each answering on its own address.
//! function:
//! - Maintain a thread: a tokio environment runs in the thread for meter scheduling
//! - every meter is polled at its own interval, the meters of one bus are polled one after the other
//! - address and energy commands are relayed to the thread and executed between cycles

use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc::{self, Sender};

use super::pzem_device::PzemDevice;
use super::pzem_thread::{run_loop, PzemThreadCommand};
use super::shared_transport::SharedTransport;
use crate::common::error::DriverError;
use crate::entity::dto::meter_command_dto::MeterCommandDto;
use crate::{error, info};

const LOG_TAG: &str = "pzem_bus";
const COMMAND_BUFFER: usize = 32;

pub struct PzemBus {
    name: String,
    transport: Arc<SharedTransport>,
    // meters waiting for the thread to start
    meters: Vec<PzemDevice>,
    // sender to send command to the bus thread
    command_tx: Option<Sender<PzemThreadCommand>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl PzemBus {
    pub fn new(name: &str, transport: Arc<SharedTransport>) -> Self {
        Self {
            name: name.to_string(),
            transport,
            meters: Vec::new(),
            command_tx: None,
            thread_handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> Arc<SharedTransport> {
        self.transport.clone()
    }

    pub fn meter_count(&self) -> usize {
        self.meters.len()
    }

    /// mount a meter, only before the thread starts
    /// addresses and de/re pins must be unique on one bus
    pub fn add_meter(&mut self, meter: PzemDevice) -> Result<(), DriverError> {
        if self.command_tx.is_some() {
            return Err(DriverError(format!("PzemBus {} already started, cannot add meter {}", self.name, meter.device_id())));
        }
        for mounted in self.meters.iter() {
            if mounted.device_id() == meter.device_id() {
                return Err(DriverError(format!("PzemBus {} duplicated device_id {}", self.name, meter.device_id())));
            }
            if mounted.address() == meter.address() {
                return Err(DriverError(format!(
                    "PzemBus {} address {} used by both {} and {}",
                    self.name, meter.address(), mounted.device_id(), meter.device_id()
                )));
            }
            if meter.de_re_pin().is_some() && mounted.de_re_pin() == meter.de_re_pin() {
                return Err(DriverError(format!(
                    "PzemBus {} de/re pin {:?} driven by both {} and {}",
                    self.name, meter.de_re_pin(), mounted.device_id(), meter.device_id()
                )));
            }
        }
        info!(LOG_TAG, "meter mounted, bus: {}, device_id: {}, address: {}", self.name, meter.device_id(), meter.address());
        self.meters.push(meter);
        Ok(())
    }

    /// start the bus thread, meters are moved into it
    pub fn start(&mut self) -> Result<(), DriverError> {
        if self.command_tx.is_some() {
            return Err(DriverError(format!("PzemBus {} already started", self.name)));
        }
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let meters = std::mem::take(&mut self.meters);
        let bus_name = self.name.clone();

        let handle = thread::Builder::new()
            .name(format!("pzem-{}", self.name))
            .spawn(move || {
                let rt = match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(LOG_TAG, "bus {}, cannot init tokio runtime: {}", bus_name, e);
                        return;
                    }
                };
                if let Err(e) = rt.block_on(run_loop(bus_name.as_str(), meters, command_rx)) {
                    error!(LOG_TAG, "bus {}, thread exited with error: {}", bus_name, e);
                }
            })
            .map_err(|e| DriverError(format!("PzemBus {} cannot spawn thread: {}", self.name, e)))?;

        self.command_tx = Some(command_tx);
        self.thread_handle = Some(handle);
        Ok(())
    }

    /// handle to stop the bus thread from outside any runtime, e.g. a signal handler
    pub fn stopper(&self) -> Option<BusStopper> {
        self.command_tx.as_ref().map(|tx| BusStopper {
            bus_name: self.name.clone(),
            command_tx: tx.clone(),
        })
    }

    pub fn send_command(&self, command: MeterCommandDto) -> Result<(), DriverError> {
        self.send_command_to_thread(PzemThreadCommand::Meter(command))
    }

    pub fn stop(&self) -> Result<(), DriverError> {
        self.send_command_to_thread(PzemThreadCommand::Stop)
    }

    /// wait for the bus thread to finish
    pub fn join(&mut self) -> Result<(), DriverError> {
        match self.thread_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DriverError(format!("PzemBus {} thread panicked", self.name))),
            None => Ok(()),
        }
    }

    /// private function, send command to bus thread
    fn send_command_to_thread(&self, command: PzemThreadCommand) -> Result<(), DriverError> {
        match self.command_tx.as_ref() {
            Some(tx) => tx
                .try_send(command)
                .map_err(|e| DriverError(format!("PzemBus {} send_command_to_thread error: {}", self.name, e))),
            None => Err(DriverError(format!("PzemBus {} send_command_to_thread command_tx is None", self.name))),
        }
    }
}

pub struct BusStopper {
    bus_name: String,
    command_tx: Sender<PzemThreadCommand>,
}

impl BusStopper {
    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    /// waits for room when the command queue is full, must not be called inside a tokio runtime
    pub fn stop(&self) -> Result<(), DriverError> {
        self.command_tx
            .blocking_send(PzemThreadCommand::Stop)
            .map_err(|e| DriverError(format!("PzemBus {} stop error: {}", self.bus_name, e)))
    }
}
