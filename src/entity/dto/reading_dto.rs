//! meter reading data transmission object

use serde::{Deserialize, Serialize};

use crate::driver::pzem::entity::StateClass;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingDto {
    // meter device id
    pub device_id: String,
    // channel key, e.g. voltage_a
    pub channel: String,
    pub unit: String,
    pub accuracy_decimals: u8,
    pub state_class: StateClass,
    pub value: f32,
}
