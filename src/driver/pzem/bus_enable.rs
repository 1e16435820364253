//! rs-485 direction control (DE/RE)
//! this driver only parks the line in receive mode at setup,
//! the meter client toggles it around every transmit burst

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::prelude::*;
use super::traits::PinDriver;
use crate::common::error::DriverError;
use crate::{debug, info};

const LOG_TAG: &str = "bus_enable";
const SYSFS_GPIO_PATH: &str = "/sys/class/gpio";
const EXPORT_SETTLE_MS: u64 = 100;
// low level: receiver enabled, driver off
const RECEIVE_LEVEL: bool = false;

/// gpio through the legacy sysfs interface
pub struct SysfsPinDriver {
    base_path: PathBuf,
}

impl SysfsPinDriver {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
        }
    }

    fn pin_path(&self, pin: u32) -> PathBuf {
        self.base_path.join(format!("gpio{}", pin))
    }

    async fn ensure_exported(&self, pin: u32) -> Result<(), DriverError> {
        if self.pin_path(pin).exists() {
            return Ok(());
        }
        tokio::fs::write(self.base_path.join("export"), pin.to_string())
            .await
            .map_err(|e| DriverError(format!("cannot export gpio {}: {}", pin, e)))?;
        // sysfs creates the directory asynchronously
        tokio::time::sleep(Duration::from_millis(EXPORT_SETTLE_MS)).await;
        Ok(())
    }
}

impl Default for SysfsPinDriver {
    fn default() -> Self {
        Self::new(SYSFS_GPIO_PATH)
    }
}

#[async_trait]
impl PinDriver for SysfsPinDriver {
    async fn set_output(&self, pin: u32) -> Result<(), DriverError> {
        self.ensure_exported(pin).await?;
        tokio::fs::write(self.pin_path(pin).join("direction"), "out")
            .await
            .map_err(|e| DriverError(format!("cannot set gpio {} direction: {}", pin, e)))
    }

    async fn write(&self, pin: u32, high: bool) -> Result<(), DriverError> {
        let value = if high { "1" } else { "0" };
        tokio::fs::write(self.pin_path(pin).join("value"), value)
            .await
            .map_err(|e| DriverError(format!("cannot write gpio {}: {}", pin, e)))
    }
}

/// gpio sink for dummy mode
pub struct DummyPinDriver;

#[async_trait]
impl PinDriver for DummyPinDriver {
    async fn set_output(&self, pin: u32) -> Result<(), DriverError> {
        debug!(LOG_TAG, "dummy mode, gpio {} set to output", pin);
        Ok(())
    }

    async fn write(&self, pin: u32, high: bool) -> Result<(), DriverError> {
        debug!(LOG_TAG, "dummy mode, gpio {} write {}", pin, high);
        Ok(())
    }
}

pub struct BusEnableController {
    pin: Option<u32>,
    driver: Arc<dyn PinDriver>,
}

impl BusEnableController {
    /// a negative pin means the bus has no direction control
    pub fn new(pin: PinSize, driver: Arc<dyn PinDriver>) -> Self {
        Self {
            pin: u32::try_from(pin).ok(),
            driver,
        }
    }

    pub fn pin(&self) -> Option<u32> {
        self.pin
    }

    /// set the pin as output and park it in receive mode
    /// returns the pin to hand over to the meter client
    pub async fn configure(&self) -> Result<Option<u32>, DriverError> {
        let pin = match self.pin {
            Some(pin) => pin,
            None => return Ok(None),
        };
        self.driver.set_output(pin).await?;
        self.driver.write(pin, RECEIVE_LEVEL).await?;
        info!(LOG_TAG, "de/re pin {} configured, receive mode", pin);
        Ok(Some(pin))
    }
}
