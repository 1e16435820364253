//! meter factory
//! turns the bus settings into started-ready buses with their meters and channel sinks

use std::env;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use crate::common::error::DriverError;
use crate::common::setting::{BusSettings, MeterSettings};
use crate::driver::pzem::bus_enable::{BusEnableController, DummyPinDriver, SysfsPinDriver};
use crate::driver::pzem::dummy_client::DummyMeterClient;
use crate::driver::pzem::entity::{Channel, GridConfig};
use crate::driver::pzem::prelude::*;
use crate::driver::pzem::pzem_bus::PzemBus;
use crate::driver::pzem::pzem_device::PzemDevice;
use crate::driver::pzem::shared_transport::{DummyOpener, LineConfig, LineOpener, SharedTransport, TokioSerialOpener};
use crate::driver::pzem::traits::{MeterClient, PinDriver};
use crate::driver::pzem::upward_sink::UpwardSink;
use crate::entity::dto::reading_dto::ReadingDto;
use crate::{debug, info};

const LOG_TAG: &str = "meter_factory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Real,
    // no serial port and no gpio, meters are simulated
    Dummy,
}

impl RunMode {
    pub fn from_env() -> Self {
        match env::var("mode") {
            Ok(mode) if mode == "dummy" => RunMode::Dummy,
            _ => RunMode::Real,
        }
    }
}

/// makes the protocol client of one meter
pub trait ClientFactory {
    fn make(&self, transport: &Arc<SharedTransport>, address: MeterAddrSize) -> Box<dyn MeterClient>;
}

pub struct DummyClientFactory;

impl ClientFactory for DummyClientFactory {
    fn make(&self, _transport: &Arc<SharedTransport>, address: MeterAddrSize) -> Box<dyn MeterClient> {
        Box::new(DummyMeterClient::new(address))
    }
}

pub struct MeterFactory {
    mode: RunMode,
    client_factory: Box<dyn ClientFactory>,
    pin_driver: Arc<dyn PinDriver>,
    report_tx: Sender<ReadingDto>,
}

impl MeterFactory {
    pub fn new(mode: RunMode, client_factory: Box<dyn ClientFactory>, report_tx: Sender<ReadingDto>) -> Self {
        let pin_driver: Arc<dyn PinDriver> = match mode {
            RunMode::Dummy => Arc::new(DummyPinDriver),
            RunMode::Real => Arc::new(SysfsPinDriver::default()),
        };
        Self {
            mode,
            client_factory,
            pin_driver,
            report_tx,
        }
    }

    pub fn make_buses(&self, buses: &[BusSettings]) -> Result<Vec<PzemBus>, DriverError> {
        buses.iter().map(|bus| self.make_bus(bus)).collect()
    }

    pub fn make_bus(&self, settings: &BusSettings) -> Result<PzemBus, DriverError> {
        let opener: Box<dyn LineOpener> = match self.mode {
            RunMode::Dummy => Box::new(DummyOpener),
            RunMode::Real => Box::new(TokioSerialOpener),
        };
        let transport = Arc::new(SharedTransport::new(settings.name.as_str(), opener));
        let mut bus = PzemBus::new(settings.name.as_str(), transport.clone());

        for meter in settings.meters.iter() {
            bus.add_meter(self.make_meter(settings, meter, &transport)?)?;
        }
        info!(LOG_TAG, "bus {} made, port: {}, meters: {}", settings.name, settings.port, bus.meter_count());
        Ok(bus)
    }

    fn make_meter(
        &self,
        bus: &BusSettings,
        meter: &MeterSettings,
        transport: &Arc<SharedTransport>,
    ) -> Result<PzemDevice, DriverError> {
        if !(MIN_SOFTWARE_ADDRESS..=MAX_SOFTWARE_ADDRESS).contains(&meter.address) {
            return Err(DriverError(format!(
                "meter factory: {} address {} out of range {}..={}",
                meter.device_id, meter.address, MIN_SOFTWARE_ADDRESS, MAX_SOFTWARE_ADDRESS
            )));
        }

        // the pzem line runs at 9600 8N1 only
        if bus.baud_rate != PZEM_BAUD_RATE {
            return Err(DriverError(format!(
                "meter factory: bus {} baud_rate {} not supported, pzem meters run at {}",
                bus.name, bus.baud_rate, PZEM_BAUD_RATE
            )));
        }
        if meter.update_interval_ms == 0 {
            return Err(DriverError(format!(
                "meter factory: {} update_interval_ms must be greater than 0",
                meter.device_id
            )));
        }

        let line_config = LineConfig::pzem(
            bus.port.as_str(),
            meter.rx_pin.unwrap_or(bus.rx_pin),
            meter.tx_pin.unwrap_or(bus.tx_pin),
        );
        let grid = GridConfig {
            baud_rate: PZEM_BAUD_RATE,
            connection_type: meter.connection_type,
            line_frequency: meter.line_frequency,
        };

        let mut device = PzemDevice::new(
            meter.device_id.as_str(),
            meter.address,
            transport.clone(),
            line_config,
            self.client_factory.make(transport, meter.address),
        )
        .with_grid(grid)
        .with_update_interval(Duration::from_millis(meter.update_interval_ms))
        .with_bus_enable(BusEnableController::new(meter.de_re_pin, self.pin_driver.clone()));

        for key in meter.channels.iter() {
            let channel: Channel = key.parse()?;
            let sink = UpwardSink::new(meter.device_id.as_str(), channel, self.report_tx.clone());
            device
                .bind_sink(channel, Box::new(sink))
                .map_err(|e| DriverError(format!("meter factory: {} {}", meter.device_id, e)))?;
        }
        debug!(LOG_TAG, "meter {} made, {} channel(s) bound", meter.device_id, meter.channels.len());
        Ok(device)
    }
}
