//! pzem meter entities: phases, measurement channels, grid settings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::prelude::*;
use crate::common::error::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    /// polling order
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    pub fn index(&self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Phase::A => "a",
            Phase::B => "b",
            Phase::C => "c",
        }
    }
}

/// quantity measured on a single phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseQuantity {
    Voltage,
    Current,
    Frequency,
    ActivePower,
    ReactivePower,
    ApparentPower,
    PowerFactor,
    ActiveEnergy,
    ReactiveEnergy,
    ApparentEnergy,
    VoltageAngle,
    CurrentAngle,
}

impl PhaseQuantity {
    /// read order inside one phase
    pub const ALL: [PhaseQuantity; 12] = [
        PhaseQuantity::Voltage,
        PhaseQuantity::Current,
        PhaseQuantity::Frequency,
        PhaseQuantity::ActivePower,
        PhaseQuantity::ReactivePower,
        PhaseQuantity::ApparentPower,
        PhaseQuantity::PowerFactor,
        PhaseQuantity::ActiveEnergy,
        PhaseQuantity::ReactiveEnergy,
        PhaseQuantity::ApparentEnergy,
        PhaseQuantity::VoltageAngle,
        PhaseQuantity::CurrentAngle,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PhaseQuantity::Voltage => "voltage",
            PhaseQuantity::Current => "current",
            PhaseQuantity::Frequency => "frequency",
            PhaseQuantity::ActivePower => "active_power",
            PhaseQuantity::ReactivePower => "reactive_power",
            PhaseQuantity::ApparentPower => "apparent_power",
            PhaseQuantity::PowerFactor => "power_factor",
            PhaseQuantity::ActiveEnergy => "active_energy",
            PhaseQuantity::ReactiveEnergy => "reactive_energy",
            PhaseQuantity::ApparentEnergy => "apparent_energy",
            PhaseQuantity::VoltageAngle => "voltage_phase_angle",
            PhaseQuantity::CurrentAngle => "current_phase_angle",
        }
    }

    /// unit of the published value
    pub fn unit(&self) -> &'static str {
        match self {
            PhaseQuantity::Voltage => "V",
            PhaseQuantity::Current => "A",
            PhaseQuantity::Frequency => "Hz",
            PhaseQuantity::ActivePower => "kW",
            PhaseQuantity::ReactivePower => "kVar",
            PhaseQuantity::ApparentPower => "kVA",
            PhaseQuantity::PowerFactor => "PF",
            PhaseQuantity::ActiveEnergy => "kWh",
            PhaseQuantity::ReactiveEnergy => "kVarh",
            PhaseQuantity::ApparentEnergy => "kVAh",
            PhaseQuantity::VoltageAngle | PhaseQuantity::CurrentAngle => "°",
        }
    }

    /// decimals worth showing for the published value
    pub fn accuracy_decimals(&self) -> u8 {
        match self {
            PhaseQuantity::Voltage | PhaseQuantity::VoltageAngle | PhaseQuantity::CurrentAngle => 1,
            PhaseQuantity::Frequency => 2,
            _ => 3,
        }
    }

    pub fn state_class(&self) -> StateClass {
        match self {
            PhaseQuantity::ActiveEnergy | PhaseQuantity::ReactiveEnergy | PhaseQuantity::ApparentEnergy => {
                StateClass::TotalIncreasing
            }
            _ => StateClass::Measurement,
        }
    }

    /// the meter reports these in W / var / VA / Wh / varh / VAh
    pub fn is_kilo(&self) -> bool {
        matches!(
            self,
            PhaseQuantity::ActivePower
                | PhaseQuantity::ReactivePower
                | PhaseQuantity::ApparentPower
                | PhaseQuantity::ActiveEnergy
                | PhaseQuantity::ReactiveEnergy
                | PhaseQuantity::ApparentEnergy
        )
    }
}

/// quantity combined over all three phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TotalQuantity {
    ActivePower,
    ReactivePower,
    ApparentPower,
    PowerFactor,
    ActiveEnergy,
    ReactiveEnergy,
    ApparentEnergy,
}

impl TotalQuantity {
    pub const ALL: [TotalQuantity; 7] = [
        TotalQuantity::ActivePower,
        TotalQuantity::ReactivePower,
        TotalQuantity::ApparentPower,
        TotalQuantity::PowerFactor,
        TotalQuantity::ActiveEnergy,
        TotalQuantity::ReactiveEnergy,
        TotalQuantity::ApparentEnergy,
    ];

    /// same quantity on a single phase, units and conversion are shared
    pub fn per_phase(&self) -> PhaseQuantity {
        match self {
            TotalQuantity::ActivePower => PhaseQuantity::ActivePower,
            TotalQuantity::ReactivePower => PhaseQuantity::ReactivePower,
            TotalQuantity::ApparentPower => PhaseQuantity::ApparentPower,
            TotalQuantity::PowerFactor => PhaseQuantity::PowerFactor,
            TotalQuantity::ActiveEnergy => PhaseQuantity::ActiveEnergy,
            TotalQuantity::ReactiveEnergy => PhaseQuantity::ReactiveEnergy,
            TotalQuantity::ApparentEnergy => PhaseQuantity::ApparentEnergy,
        }
    }

    pub fn unit(&self) -> &'static str {
        self.per_phase().unit()
    }

    pub fn accuracy_decimals(&self) -> u8 {
        self.per_phase().accuracy_decimals()
    }

    pub fn state_class(&self) -> StateClass {
        self.per_phase().state_class()
    }

    pub fn is_kilo(&self) -> bool {
        self.per_phase().is_kilo()
    }
}

/// how downstream consumers should treat a series of readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    // instantaneous value
    Measurement,
    // counter that only goes up until reset
    TotalIncreasing,
}

/// one output channel of a meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Phase(Phase, PhaseQuantity),
    Total(TotalQuantity),
}

pub const PHASE_CHANNEL_COUNT: usize = 3 * 12;
pub const CHANNEL_COUNT: usize = PHASE_CHANNEL_COUNT + 7;

impl Channel {
    /// slot in the channel table
    pub fn index(&self) -> usize {
        match self {
            Channel::Phase(phase, quantity) => {
                let q = PhaseQuantity::ALL.iter().position(|x| x == quantity).unwrap_or(0);
                phase.index() * PhaseQuantity::ALL.len() + q
            }
            Channel::Total(quantity) => {
                let q = TotalQuantity::ALL.iter().position(|x| x == quantity).unwrap_or(0);
                PHASE_CHANNEL_COUNT + q
            }
        }
    }

    /// every channel in polling order
    pub fn all() -> Vec<Channel> {
        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for phase in Phase::ALL {
            for quantity in PhaseQuantity::ALL {
                channels.push(Channel::Phase(phase, quantity));
            }
        }
        for quantity in TotalQuantity::ALL {
            channels.push(Channel::Total(quantity));
        }
        channels
    }

    /// config key, `voltage_a` or `total_active_power`
    pub fn key(&self) -> String {
        match self {
            Channel::Phase(phase, quantity) => format!("{}_{}", quantity.key(), phase.suffix()),
            Channel::Total(quantity) => format!("total_{}", quantity.per_phase().key()),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Phase(_, quantity) => quantity.unit(),
            Channel::Total(quantity) => quantity.unit(),
        }
    }

    pub fn accuracy_decimals(&self) -> u8 {
        match self {
            Channel::Phase(_, quantity) => quantity.accuracy_decimals(),
            Channel::Total(quantity) => quantity.accuracy_decimals(),
        }
    }

    pub fn state_class(&self) -> StateClass {
        match self {
            Channel::Phase(_, quantity) => quantity.state_class(),
            Channel::Total(quantity) => quantity.state_class(),
        }
    }

    /// native reading to the published unit
    pub fn publish_value(&self, raw: f32) -> f32 {
        let kilo = match self {
            Channel::Phase(_, quantity) => quantity.is_kilo(),
            Channel::Total(quantity) => quantity.is_kilo(),
        };
        if kilo {
            raw / KILO
        } else {
            raw
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Channel {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::all()
            .into_iter()
            .find(|channel| channel.key() == s)
            .ok_or(DriverError(format!("unknown meter channel: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    ThreePhaseFourWire,
    ThreePhaseThreeWire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineFrequency {
    #[default]
    #[serde(rename = "50hz")]
    F50Hz,
    #[serde(rename = "60hz")]
    F60Hz,
}

impl LineFrequency {
    pub fn hz(&self) -> u8 {
        match self {
            LineFrequency::F50Hz => 50,
            LineFrequency::F60Hz => 60,
        }
    }
}

/// device side grid settings written at setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    pub baud_rate: u32,
    pub connection_type: ConnectionType,
    pub line_frequency: LineFrequency,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            baud_rate: PZEM_BAUD_RATE,
            connection_type: ConnectionType::ThreePhaseFourWire,
            line_frequency: LineFrequency::F50Hz,
        }
    }
}

/// energy accumulators to clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    Phase(Phase),
    Combined,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Software(MeterAddrSize),
    // dip switch address
    Hardware,
}

/// outcome of one update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReportBo {
    pub published: u16,
    pub invalid: u16,
}
