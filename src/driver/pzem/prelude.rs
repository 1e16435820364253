// meter bus address type
pub type MeterAddrSize = u8;
// gpio pin number as configured, negative means no pin
pub type PinSize = i32;

// writing this address makes the meter use its dip switch address
pub const HARDWARE_ADDRESS: MeterAddrSize = 0x00;
// software address range accepted by the meter
pub const MIN_SOFTWARE_ADDRESS: MeterAddrSize = 1;
pub const MAX_SOFTWARE_ADDRESS: MeterAddrSize = 247;

// line settings fixed by the meter
pub const PZEM_BAUD_RATE: u32 = 9600;

// native W / var / VA / Wh / varh / VAh to kilo units
pub const KILO: f32 = 1000.0;
