//! simulated pzem meter for dummy mode
//! readings drift a little every call, energy accumulates and can be reset

use async_trait::async_trait;

use super::entity::{ConnectionType, LineFrequency, Phase, ResetScope};
use super::prelude::*;
use super::traits::MeterClient;
use crate::{debug, info};

const LOG_TAG: &str = "dummy_client";
const NOMINAL_VOLTAGE: f32 = 230.0;
const BASE_CURRENT: f32 = 4.0;
const POWER_FACTOR: f32 = 0.95;
// Wh added to each phase per energy read
const ENERGY_STEP: f32 = 2.5;

pub struct DummyMeterClient {
    address: MeterAddrSize,
    enable_pin: Option<u32>,
    frequency: LineFrequency,
    tick: u32,
    // per phase active energy in Wh
    energy: [f32; 3],
}

impl DummyMeterClient {
    pub fn new(address: MeterAddrSize) -> Self {
        Self {
            address,
            enable_pin: None,
            frequency: LineFrequency::F50Hz,
            tick: 0,
            energy: [0.0; 3],
        }
    }

    pub fn enable_pin(&self) -> Option<u32> {
        self.enable_pin
    }

    // small repeating drift so the values move between cycles
    fn drift(&mut self) -> f32 {
        self.tick = self.tick.wrapping_add(1);
        ((self.tick % 10) as f32 - 5.0) / 10.0
    }

    fn voltage(&self, phase: Phase) -> f32 {
        NOMINAL_VOLTAGE + phase.index() as f32 * 0.5
    }

    fn current(&self, phase: Phase) -> f32 {
        BASE_CURRENT + phase.index() as f32
    }

    fn apparent(&self, phase: Phase) -> f32 {
        self.voltage(phase) * self.current(phase)
    }

    fn sum(&self, per_phase: impl Fn(Phase) -> f32) -> f32 {
        Phase::ALL.iter().map(|phase| per_phase(*phase)).sum()
    }

    fn active_energy(&mut self, phase: Phase) -> f32 {
        self.energy[phase.index()] += ENERGY_STEP;
        self.energy[phase.index()]
    }

    fn reactive_ratio() -> f32 {
        (1.0 - POWER_FACTOR * POWER_FACTOR).sqrt()
    }
}

#[async_trait]
impl MeterClient for DummyMeterClient {
    fn address(&self) -> MeterAddrSize {
        self.address
    }

    fn set_enable(&mut self, pin: u32) {
        self.enable_pin = Some(pin);
    }

    async fn begin(&mut self) {
        info!(LOG_TAG, "dummy mode, simulated meter at address {}", self.address);
    }

    async fn set_baudrate_and_connection_type(&mut self, baud_rate: u32, connection_type: ConnectionType) -> bool {
        debug!(LOG_TAG, "dummy mode, baud rate {} connection type {:?}", baud_rate, connection_type);
        baud_rate == PZEM_BAUD_RATE
    }

    async fn set_frequency(&mut self, frequency: LineFrequency) -> bool {
        self.frequency = frequency;
        true
    }

    async fn read_voltage(&mut self, phase: Phase) -> f32 {
        self.voltage(phase) + self.drift()
    }

    async fn read_current(&mut self, phase: Phase) -> f32 {
        self.current(phase) + self.drift() / 10.0
    }

    async fn read_frequency(&mut self, _phase: Phase) -> f32 {
        self.frequency.hz() as f32 + self.drift() / 50.0
    }

    async fn read_active_power(&mut self, phase: Option<Phase>) -> f32 {
        match phase {
            Some(phase) => self.apparent(phase) * POWER_FACTOR,
            None => self.sum(|p| self.apparent(p)) * POWER_FACTOR,
        }
    }

    async fn read_reactive_power(&mut self, phase: Option<Phase>) -> f32 {
        match phase {
            Some(phase) => self.apparent(phase) * Self::reactive_ratio(),
            None => self.sum(|p| self.apparent(p)) * Self::reactive_ratio(),
        }
    }

    async fn read_apparent_power(&mut self, phase: Option<Phase>) -> f32 {
        match phase {
            Some(phase) => self.apparent(phase),
            None => self.sum(|p| self.apparent(p)),
        }
    }

    async fn read_power_factor(&mut self, _phase: Option<Phase>) -> f32 {
        POWER_FACTOR
    }

    async fn read_active_energy(&mut self, phase: Option<Phase>) -> f32 {
        match phase {
            Some(phase) => self.active_energy(phase),
            None => self.energy.iter().sum(),
        }
    }

    async fn read_reactive_energy(&mut self, phase: Option<Phase>) -> f32 {
        let active = match phase {
            Some(phase) => self.energy[phase.index()],
            None => self.energy.iter().sum(),
        };
        active / POWER_FACTOR * Self::reactive_ratio()
    }

    async fn read_apparent_energy(&mut self, phase: Option<Phase>) -> f32 {
        let active = match phase {
            Some(phase) => self.energy[phase.index()],
            None => self.energy.iter().sum(),
        };
        active / POWER_FACTOR
    }

    async fn read_voltage_phase_angle(&mut self, phase: Phase) -> f32 {
        phase.index() as f32 * 120.0
    }

    async fn read_current_phase_angle(&mut self, phase: Phase) -> f32 {
        phase.index() as f32 * 120.0 + POWER_FACTOR.acos().to_degrees()
    }

    async fn set_address(&mut self, address: MeterAddrSize) -> bool {
        if address != HARDWARE_ADDRESS && !(MIN_SOFTWARE_ADDRESS..=MAX_SOFTWARE_ADDRESS).contains(&address) {
            return false;
        }
        self.address = address;
        true
    }

    async fn reset_energy(&mut self, scope: ResetScope) -> bool {
        match scope {
            ResetScope::Phase(phase) => self.energy[phase.index()] = 0.0,
            ResetScope::Combined | ResetScope::All => self.energy = [0.0; 3],
        }
        true
    }
}
