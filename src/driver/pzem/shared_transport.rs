//! Shared serial transport
//! One physical rs-485 bus, shared by handle between every meter wired to it.
//! - the line is opened by the first meter that runs setup, later meters reuse it
//! - the first caller's line settings win, a different setting from a later caller is reported, not applied
//! - exchanges lock the line, only one request/response is in flight on the bus
//! - never closed, lives as long as the process

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};

use super::prelude::*;
use super::traits::SerialLine;
use crate::common::error::DriverError;
use crate::{debug, info, warn};

const LOG_TAG: &str = "shared_transport";
const DUMMY_BUFFER_SIZE: usize = 256;
const SERIAL_TIMEOUT_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Framing {
    pub const EIGHT_N_ONE: Framing = Framing {
        data_bits: DataBits::Eight,
        parity: Parity::None,
        stop_bits: StopBits::One,
    };
}

/// line settings of one bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineConfig {
    pub port: String,
    pub baud_rate: u32,
    pub framing: Framing,
    pub rx_pin: PinSize,
    pub tx_pin: PinSize,
}

impl LineConfig {
    /// 9600 8N1, the only setting the meter talks
    pub fn pzem(port: &str, rx_pin: PinSize, tx_pin: PinSize) -> Self {
        Self {
            port: port.to_string(),
            baud_rate: PZEM_BAUD_RATE,
            framing: Framing::EIGHT_N_ONE,
            rx_pin,
            tx_pin,
        }
    }
}

/// opens the physical line
pub trait LineOpener: Send + Sync {
    fn open(&self, config: &LineConfig) -> Result<Box<dyn SerialLine>, DriverError>;
}

/// real serial port through tokio-serial
pub struct TokioSerialOpener;

impl LineOpener for TokioSerialOpener {
    fn open(&self, config: &LineConfig) -> Result<Box<dyn SerialLine>, DriverError> {
        // uart pin routing is done by the board, the pins are only logged
        debug!(LOG_TAG, "opening {} rx={} tx={}", config.port, config.rx_pin, config.tx_pin);
        let port = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .data_bits(config.framing.data_bits)
            .parity(config.framing.parity)
            .stop_bits(config.framing.stop_bits)
            .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open_native_async()
            .map_err(|e| {
                DriverError(format!(
                    "cannot open serial port: {}, baud_rate: {}, err: {}",
                    config.port, config.baud_rate, e
                ))
            })?;
        Ok(Box::new(port))
    }
}

/// in-memory line for dummy mode, nothing is ever received
pub struct DummyOpener;

impl LineOpener for DummyOpener {
    fn open(&self, config: &LineConfig) -> Result<Box<dyn SerialLine>, DriverError> {
        info!(LOG_TAG, "dummy mode, serial port {} will not be open", config.port);
        let (line, _) = tokio::io::duplex(DUMMY_BUFFER_SIZE);
        Ok(Box::new(line))
    }
}

/// result of `ensure_open`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    // this call opened the line
    Opened,
    // already open with the same settings
    Reused,
    // already open, the requested settings were ignored
    Mismatch { active: LineConfig },
}

pub struct SharedTransport {
    name: String,
    opener: Box<dyn LineOpener>,
    initialized: AtomicBool,
    active: OnceLock<LineConfig>,
    line: Mutex<Option<Box<dyn SerialLine>>>,
}

impl SharedTransport {
    pub fn new(name: &str, opener: Box<dyn LineOpener>) -> Self {
        Self {
            name: name.to_string(),
            opener,
            initialized: AtomicBool::new(false),
            active: OnceLock::new(),
            line: Mutex::new(None),
        }
    }

    pub fn serial(name: &str) -> Self {
        Self::new(name, Box::new(TokioSerialOpener))
    }

    pub fn dummy(name: &str) -> Self {
        Self::new(name, Box::new(DummyOpener))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn active_config(&self) -> Option<&LineConfig> {
        self.active.get()
    }

    /// open the line once, later calls are no-ops
    pub async fn ensure_open(&self, config: &LineConfig) -> Result<OpenOutcome, DriverError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(self.check_reuse(config));
        }

        let line = match self.opener.open(config) {
            Ok(line) => line,
            Err(e) => {
                // let the next meter retry
                self.initialized.store(false, Ordering::Release);
                return Err(e);
            }
        };
        *self.line.lock().await = Some(line);
        let _ = self.active.set(config.clone());

        info!(
            LOG_TAG,
            "bus {} open, port: {}, baud_rate: {}, rx: {}, tx: {}",
            self.name, config.port, config.baud_rate, config.rx_pin, config.tx_pin
        );
        Ok(OpenOutcome::Opened)
    }

    fn check_reuse(&self, config: &LineConfig) -> OpenOutcome {
        match self.active.get() {
            Some(active) if active != config => {
                warn!(
                    LOG_TAG,
                    "bus {} already open with {:?}, ignoring requested {:?}",
                    self.name, active, config
                );
                OpenOutcome::Mismatch { active: active.clone() }
            }
            _ => {
                debug!(LOG_TAG, "bus {} already open, reusing", self.name);
                OpenOutcome::Reused
            }
        }
    }

    /// exclusive access to the line for one request/response exchange
    pub async fn lock_line(&self) -> Result<MutexGuard<'_, Option<Box<dyn SerialLine>>>, DriverError> {
        let guard = self.line.lock().await;
        if guard.is_none() {
            return Err(DriverError(format!("bus {} not initialized", self.name)));
        }
        Ok(guard)
    }
}
