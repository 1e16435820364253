//! setting config file
//! `config_{ENV}.toml` in the working directory, ENV defaults to dev

use std::{fs::File, io::Read};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::env;

use super::error::DriverError;
use crate::driver::pzem::entity::{ConnectionType, LineFrequency};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5000;
pub const NO_PIN: i32 = -1;

#[derive(Debug, Deserialize, Clone)]
pub struct Meta {
    pub application_name : String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Env {
    pub debug: bool,
    pub env: String,
    pub log_level: String,
}

/// one physical rs-485 bus
#[derive(Debug, Deserialize, Clone)]
pub struct BusSettings {
    pub name: String,
    // serial device path, e.g. /dev/ttyUSB0
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_pin")]
    pub rx_pin: i32,
    #[serde(default = "default_pin")]
    pub tx_pin: i32,
    #[serde(default, rename = "meter")]
    pub meters: Vec<MeterSettings>,
}

/// one meter on a bus
#[derive(Debug, Deserialize, Clone)]
pub struct MeterSettings {
    pub device_id: String,
    pub address: u8,
    #[serde(default = "default_pin")]
    pub de_re_pin: i32,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default)]
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub line_frequency: LineFrequency,
    // per meter pin overrides, the first meter set up on a bus wins
    pub rx_pin: Option<i32>,
    pub tx_pin: Option<i32>,
    // channel keys to bind, e.g. "voltage_a", "total_active_energy"
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub meta: Meta,
    pub env: Env,
    #[serde(default, rename = "bus")]
    pub buses: Vec<BusSettings>,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_pin() -> i32 {
    NO_PIN
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

impl Default for Settings {
    fn default() -> Self {
        let env = match env::var("ENV") {
            Ok(e) => e,
            Err(_) => String::from("dev")
        };

        let file_path: String = format!("config_{}.toml", env);
        match Settings::load(file_path.as_str()) {
            Ok(settings) => settings,
            Err(e) => {
                // logger is not up yet, it reads its level from here
                println!("cannot load {}, using built-in settings: {}", file_path, e);
                Settings::fallback(env.as_str())
            }
        }
    }
}

impl Settings {
    pub fn get<'a>() -> &'a Self {
        lazy_static! {
            static ref CACHE: Settings = Settings::default();
        }
        &CACHE
    }

    pub fn load(file_path: &str) -> Result<Settings, DriverError> {
        let mut file = File::open(file_path)
            .map_err(|e| DriverError(format!("no such file {} exception: {}", file_path, e)))?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(|e| DriverError(format!("cannot read config file {}: {}", file_path, e)))?;
        Settings::parse(str_val.as_str())
    }

    pub fn parse(str_val: &str) -> Result<Settings, DriverError> {
        toml::from_str(str_val).map_err(|e| DriverError(format!("config file format invalid: {}", e)))
    }

    /// no buses, info level
    fn fallback(env: &str) -> Settings {
        Settings {
            meta: Meta {
                application_name: "pzem-device-engine".to_string(),
            },
            env: Env {
                debug: false,
                env: env.to_string(),
                log_level: "info".to_string(),
            },
            buses: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [meta]
        application_name = "pzem-device-engine"

        [env]
        debug = true
        env = "test"
        log_level = "debug"

        [[bus]]
        name = "rs485_0"
        port = "/dev/ttyUSB0"
        rx_pin = 16
        tx_pin = 17

        [[bus.meter]]
        device_id = "pzem_main"
        address = 1
        de_re_pin = 4
        line_frequency = "60hz"
        channels = ["voltage_a", "total_active_power"]

        [[bus.meter]]
        device_id = "pzem_sub"
        address = 2
        update_interval_ms = 10000
        connection_type = "three_phase_three_wire"
    "#;

    #[test]
    fn test_parse() {
        let settings = Settings::parse(CONFIG).unwrap();
        assert_eq!(settings.env.log_level, "debug");
        assert_eq!(settings.buses.len(), 1);

        let bus = &settings.buses[0];
        assert_eq!(bus.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(bus.meters.len(), 2);

        let main = &bus.meters[0];
        assert_eq!(main.de_re_pin, 4);
        assert_eq!(main.line_frequency, LineFrequency::F60Hz);
        assert_eq!(main.connection_type, ConnectionType::ThreePhaseFourWire);
        assert_eq!(main.update_interval_ms, DEFAULT_UPDATE_INTERVAL_MS);
        assert_eq!(main.channels, vec!["voltage_a", "total_active_power"]);

        let sub = &bus.meters[1];
        assert_eq!(sub.de_re_pin, NO_PIN);
        assert_eq!(sub.connection_type, ConnectionType::ThreePhaseThreeWire);
        assert_eq!(sub.line_frequency, LineFrequency::F50Hz);
        assert!(sub.channels.is_empty());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Settings::parse("[meta]\napplication_name = 1").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Settings::load("config_does_not_exist.toml").is_err());
    }
}
