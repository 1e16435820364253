/// used for commanding a meter between polling cycles
#[derive(Debug, Clone, PartialEq)]
pub struct MeterCommandDto {
    pub device_id: String,
    pub action: MeterActionEnum,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeterActionEnum {
    // switch to the dip switch address
    UseHardwareAddress,
    SetSoftwareAddress(u8),
    // clear the energy accumulators of all phases and the total
    ResetEnergy,
}
