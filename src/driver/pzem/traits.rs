use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::entity::{ConnectionType, LineFrequency, Phase, ResetScope};
use super::prelude::*;
use crate::common::error::DriverError;

/// pzem command client, bound to one shared transport and one meter address
/// - reads return `f32::NAN` when the meter did not answer or the frame was bad
/// - a `None` phase reads the combined quantity
/// - the client toggles the de/re pin around each request
#[async_trait]
pub trait MeterClient: Send {
    fn address(&self) -> MeterAddrSize;

    /// hand over the rs-485 direction pin, already driven to receive
    fn set_enable(&mut self, pin: u32);

    async fn begin(&mut self);

    async fn set_baudrate_and_connection_type(&mut self, baud_rate: u32, connection_type: ConnectionType) -> bool;

    async fn set_frequency(&mut self, frequency: LineFrequency) -> bool;

    async fn read_voltage(&mut self, phase: Phase) -> f32;

    async fn read_current(&mut self, phase: Phase) -> f32;

    async fn read_frequency(&mut self, phase: Phase) -> f32;

    async fn read_active_power(&mut self, phase: Option<Phase>) -> f32;

    async fn read_reactive_power(&mut self, phase: Option<Phase>) -> f32;

    async fn read_apparent_power(&mut self, phase: Option<Phase>) -> f32;

    async fn read_power_factor(&mut self, phase: Option<Phase>) -> f32;

    async fn read_active_energy(&mut self, phase: Option<Phase>) -> f32;

    async fn read_reactive_energy(&mut self, phase: Option<Phase>) -> f32;

    async fn read_apparent_energy(&mut self, phase: Option<Phase>) -> f32;

    async fn read_voltage_phase_angle(&mut self, phase: Phase) -> f32;

    async fn read_current_phase_angle(&mut self, phase: Phase) -> f32;

    /// 1..=247 sets a software address, 0x00 switches to the dip switch address
    async fn set_address(&mut self, address: MeterAddrSize) -> bool;

    async fn reset_energy(&mut self, scope: ResetScope) -> bool;
}

/// telemetry sink bound to one meter channel
pub trait ReadingSink {
    /// only called with valid readings, at most once per cycle
    fn publish(&self, value: f32) -> Result<(), DriverError>;
}

/// gpio access for the rs-485 direction line
#[async_trait]
pub trait PinDriver: Send + Sync {
    async fn set_output(&self, pin: u32) -> Result<(), DriverError>;

    async fn write(&self, pin: u32, high: bool) -> Result<(), DriverError>;
}

/// byte stream of an open half duplex line
pub trait SerialLine: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialLine for T {}
