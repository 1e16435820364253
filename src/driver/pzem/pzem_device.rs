//! PZEM-6L24 three phase meter on a shared rs-485 bus
//! - setup: open the shared line once, park the de/re pin, write grid settings to the meter
//! - update: read every channel in a fixed order (phase A, B, C, then totals), publish the valid ones
//! - addressing: hardware (dip switch) address, software address, energy reset
//! nothing here is fatal, a meter that does not answer only stops publishing

use std::sync::Arc;
use std::time::Duration;

use super::bus_enable::BusEnableController;
use super::channel_table::{ChannelTable, SinkBox};
use super::entity::*;
use super::prelude::*;
use super::shared_transport::{LineConfig, SharedTransport};
use super::traits::MeterClient;
use crate::common::error::DriverError;
use crate::entity::dto::meter_command_dto::MeterActionEnum;
use crate::{debug, info, trace, warn};

const LOG_TAG: &str = "pzem_device";
const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

pub struct PzemDevice {
    device_id: String,
    address: MeterAddrSize,
    addressing: AddressingMode,
    line_config: LineConfig,
    grid: GridConfig,
    update_interval: Duration,
    transport: Arc<SharedTransport>,
    bus_enable: Option<BusEnableController>,
    client: Box<dyn MeterClient>,
    channels: ChannelTable,
}

impl PzemDevice {
    pub fn new(
        device_id: &str,
        address: MeterAddrSize,
        transport: Arc<SharedTransport>,
        line_config: LineConfig,
        client: Box<dyn MeterClient>,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            address,
            addressing: AddressingMode::Software(address),
            line_config,
            grid: GridConfig::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            transport,
            bus_enable: None,
            client,
            channels: ChannelTable::new(),
        }
    }

    pub fn with_bus_enable(mut self, bus_enable: BusEnableController) -> Self {
        self.bus_enable = Some(bus_enable);
        self
    }

    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_update_interval(mut self, update_interval: Duration) -> Self {
        self.update_interval = update_interval;
        self
    }

    /// bind a sink to a channel, only before setup
    pub fn bind_sink(&mut self, channel: Channel, sink: SinkBox) -> Result<(), DriverError> {
        self.channels.bind(channel, sink)
    }

    pub fn channels_mut(&mut self) -> &mut ChannelTable {
        &mut self.channels
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn address(&self) -> MeterAddrSize {
        self.address
    }

    pub fn addressing(&self) -> AddressingMode {
        self.addressing
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn de_re_pin(&self) -> Option<u32> {
        self.bus_enable.as_ref().and_then(|bus_enable| bus_enable.pin())
    }

    /// runs once before the first update
    /// only a transport failure is returned, meter side failures are logged
    pub async fn setup(&mut self) -> Result<(), DriverError> {
        info!(
            LOG_TAG,
            "setup pzem {} addr={} rx={} tx={} de_re={:?}",
            self.device_id, self.address, self.line_config.rx_pin, self.line_config.tx_pin, self.de_re_pin()
        );

        let opened = self.transport.ensure_open(&self.line_config).await;
        if let Err(e) = &opened {
            warn!(LOG_TAG, "pzem {} cannot open bus {}: {}", self.device_id, self.transport.name(), e);
        }

        if let Some(bus_enable) = self.bus_enable.as_ref() {
            match bus_enable.configure().await {
                Ok(Some(pin)) => self.client.set_enable(pin),
                Ok(None) => {}
                Err(e) => warn!(LOG_TAG, "pzem {} de/re pin setup failed: {}", self.device_id, e),
            }
        }

        self.client.begin().await;

        if !self
            .client
            .set_baudrate_and_connection_type(self.grid.baud_rate, self.grid.connection_type)
            .await
        {
            warn!(
                LOG_TAG,
                "pzem {} rejected baud rate {} / connection type {:?}",
                self.device_id, self.grid.baud_rate, self.grid.connection_type
            );
        }
        if !self.client.set_frequency(self.grid.line_frequency).await {
            warn!(
                LOG_TAG,
                "pzem {} rejected line frequency {}Hz",
                self.device_id,
                self.grid.line_frequency.hz()
            );
        }

        opened.map(|_| ())
    }

    /// one polling cycle
    pub async fn update(&mut self) -> CycleReportBo {
        trace!(LOG_TAG, "polling pzem {} address {}", self.device_id, self.address);
        let mut report = CycleReportBo::default();

        for phase in Phase::ALL {
            for quantity in PhaseQuantity::ALL {
                let raw = self.read_phase(phase, quantity).await;
                self.publish(Channel::Phase(phase, quantity), raw, &mut report);
            }
        }
        for quantity in TotalQuantity::ALL {
            let raw = self.read_total(quantity).await;
            self.publish(Channel::Total(quantity), raw, &mut report);
        }

        debug!(
            LOG_TAG,
            "pzem {} cycle done, published: {}, invalid: {}",
            self.device_id, report.published, report.invalid
        );
        report
    }

    async fn read_phase(&mut self, phase: Phase, quantity: PhaseQuantity) -> f32 {
        let client = &mut self.client;
        match quantity {
            PhaseQuantity::Voltage => client.read_voltage(phase).await,
            PhaseQuantity::Current => client.read_current(phase).await,
            PhaseQuantity::Frequency => client.read_frequency(phase).await,
            PhaseQuantity::ActivePower => client.read_active_power(Some(phase)).await,
            PhaseQuantity::ReactivePower => client.read_reactive_power(Some(phase)).await,
            PhaseQuantity::ApparentPower => client.read_apparent_power(Some(phase)).await,
            PhaseQuantity::PowerFactor => client.read_power_factor(Some(phase)).await,
            PhaseQuantity::ActiveEnergy => client.read_active_energy(Some(phase)).await,
            PhaseQuantity::ReactiveEnergy => client.read_reactive_energy(Some(phase)).await,
            PhaseQuantity::ApparentEnergy => client.read_apparent_energy(Some(phase)).await,
            PhaseQuantity::VoltageAngle => client.read_voltage_phase_angle(phase).await,
            PhaseQuantity::CurrentAngle => client.read_current_phase_angle(phase).await,
        }
    }

    async fn read_total(&mut self, quantity: TotalQuantity) -> f32 {
        let client = &mut self.client;
        match quantity {
            TotalQuantity::ActivePower => client.read_active_power(None).await,
            TotalQuantity::ReactivePower => client.read_reactive_power(None).await,
            TotalQuantity::ApparentPower => client.read_apparent_power(None).await,
            TotalQuantity::PowerFactor => client.read_power_factor(None).await,
            TotalQuantity::ActiveEnergy => client.read_active_energy(None).await,
            TotalQuantity::ReactiveEnergy => client.read_reactive_energy(None).await,
            TotalQuantity::ApparentEnergy => client.read_apparent_energy(None).await,
        }
    }

    fn publish(&self, channel: Channel, raw: f32, report: &mut CycleReportBo) {
        let value = if raw.is_nan() {
            report.invalid += 1;
            None
        } else {
            Some(channel.publish_value(raw))
        };
        if self.channels.dispatch(channel, value) {
            report.published += 1;
        }
    }

    /// write 0x00, the meter then answers on its dip switch address
    pub async fn use_hardware_address(&mut self) -> bool {
        info!(
            LOG_TAG,
            "setting pzem {} addr={} to use hardware (dip) address mode",
            self.device_id, self.address
        );
        let ok = self.client.set_address(HARDWARE_ADDRESS).await;
        if ok {
            self.addressing = AddressingMode::Hardware;
        } else {
            warn!(LOG_TAG, "pzem {} rejected hardware address mode", self.device_id);
        }
        ok
    }

    /// only 1..=247, 0x00 is the hardware address mode and goes through use_hardware_address
    pub async fn set_software_address(&mut self, address: MeterAddrSize) -> bool {
        if !(MIN_SOFTWARE_ADDRESS..=MAX_SOFTWARE_ADDRESS).contains(&address) {
            warn!(
                LOG_TAG,
                "pzem {} software address {} out of range {}..={}, not sent",
                self.device_id, address, MIN_SOFTWARE_ADDRESS, MAX_SOFTWARE_ADDRESS
            );
            return false;
        }
        info!(LOG_TAG, "setting pzem {} addr={} to software address {}", self.device_id, self.address, address);
        let ok = self.client.set_address(address).await;
        if ok {
            info!(
                LOG_TAG,
                "pzem {} now at address {}, commands sent before used address {}",
                self.device_id, address, self.address
            );
            self.address = address;
            self.addressing = AddressingMode::Software(address);
        } else {
            warn!(LOG_TAG, "pzem {} rejected software address {}", self.device_id, address);
        }
        ok
    }

    /// clear the energy counters of phase A, B, C and the total
    pub async fn reset_energy_all(&mut self) -> bool {
        info!(LOG_TAG, "resetting energy (all phases) on pzem {} addr={}", self.device_id, self.address);
        let ok = self.client.reset_energy(ResetScope::All).await;
        if !ok {
            warn!(LOG_TAG, "pzem {} energy reset failed", self.device_id);
        }
        ok
    }

    pub async fn execute(&mut self, action: &MeterActionEnum) -> bool {
        match action {
            MeterActionEnum::UseHardwareAddress => self.use_hardware_address().await,
            MeterActionEnum::SetSoftwareAddress(address) => self.set_software_address(*address).await,
            MeterActionEnum::ResetEnergy => self.reset_energy_all().await,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::driver::pzem::bus_enable::tests::RecordingPinDriver;
    use crate::driver::pzem::channel_table::tests::{PublishLog, RecordingSink};
    use crate::driver::pzem::dummy_client::DummyMeterClient;
    use crate::driver::pzem::shared_transport::DummyOpener;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub type CallLog = Arc<Mutex<Vec<String>>>;

    /// meter client that records every call and answers from a table
    pub struct MockMeterClient {
        pub address: MeterAddrSize,
        pub calls: CallLog,
        // channel key -> raw reading, missing keys answer `default`
        pub readings: HashMap<String, f32>,
        pub default: f32,
        pub accept_commands: bool,
    }

    impl MockMeterClient {
        pub fn new(address: MeterAddrSize, calls: &CallLog) -> Self {
            Self {
                address,
                calls: calls.clone(),
                readings: HashMap::new(),
                default: 1.0,
                accept_commands: true,
            }
        }

        fn read(&self, key: String) -> f32 {
            let value = self.readings.get(&key).copied().unwrap_or(self.default);
            self.calls.lock().unwrap().push(key);
            value
        }

        fn scoped(name: &str, phase: Option<Phase>) -> String {
            match phase {
                Some(phase) => format!("{}_{}", name, phase.suffix()),
                None => format!("total_{}", name),
            }
        }

        fn command(&self, call: String) -> bool {
            self.calls.lock().unwrap().push(call);
            self.accept_commands
        }
    }

    #[async_trait]
    impl MeterClient for MockMeterClient {
        fn address(&self) -> MeterAddrSize {
            self.address
        }

        fn set_enable(&mut self, pin: u32) {
            self.calls.lock().unwrap().push(format!("set_enable {}", pin));
        }

        async fn begin(&mut self) {
            self.calls.lock().unwrap().push("begin".to_string());
        }

        async fn set_baudrate_and_connection_type(&mut self, baud_rate: u32, connection_type: ConnectionType) -> bool {
            self.command(format!("set_baudrate {} {:?}", baud_rate, connection_type))
        }

        async fn set_frequency(&mut self, frequency: LineFrequency) -> bool {
            self.command(format!("set_frequency {}", frequency.hz()))
        }

        async fn read_voltage(&mut self, phase: Phase) -> f32 {
            self.read(Self::scoped("voltage", Some(phase)))
        }

        async fn read_current(&mut self, phase: Phase) -> f32 {
            self.read(Self::scoped("current", Some(phase)))
        }

        async fn read_frequency(&mut self, phase: Phase) -> f32 {
            self.read(Self::scoped("frequency", Some(phase)))
        }

        async fn read_active_power(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("active_power", phase))
        }

        async fn read_reactive_power(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("reactive_power", phase))
        }

        async fn read_apparent_power(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("apparent_power", phase))
        }

        async fn read_power_factor(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("power_factor", phase))
        }

        async fn read_active_energy(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("active_energy", phase))
        }

        async fn read_reactive_energy(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("reactive_energy", phase))
        }

        async fn read_apparent_energy(&mut self, phase: Option<Phase>) -> f32 {
            self.read(Self::scoped("apparent_energy", phase))
        }

        async fn read_voltage_phase_angle(&mut self, phase: Phase) -> f32 {
            self.read(Self::scoped("voltage_phase_angle", Some(phase)))
        }

        async fn read_current_phase_angle(&mut self, phase: Phase) -> f32 {
            self.read(Self::scoped("current_phase_angle", Some(phase)))
        }

        async fn set_address(&mut self, address: MeterAddrSize) -> bool {
            self.command(format!("set_address {}", address))
        }

        async fn reset_energy(&mut self, scope: ResetScope) -> bool {
            self.command(format!("reset_energy {:?}", scope))
        }
    }

    fn make_device(address: MeterAddrSize, client: MockMeterClient) -> PzemDevice {
        make_device_with(address, Box::new(client))
    }

    fn make_device_with(address: MeterAddrSize, client: Box<dyn MeterClient>) -> PzemDevice {
        let transport = Arc::new(SharedTransport::new("test_bus", Box::new(DummyOpener)));
        PzemDevice::new(
            "pzem_test",
            address,
            transport,
            LineConfig::pzem("/dev/ttyUSB0", 16, 17),
            client,
        )
    }

    fn read_calls(calls: &CallLog) -> Vec<String> {
        calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| !call.contains(' ') && *call != "begin")
            .cloned()
            .collect()
    }

    #[test]
    fn test_read_order() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut device = make_device(1, MockMeterClient::new(1, &calls));
            device.update().await;

            let calls = read_calls(&calls);
            let expected: Vec<String> = Channel::all().iter().map(|c| c.key()).collect();
            assert_eq!(calls, expected);

            // phase A, B, C blocks then the totals
            assert_eq!(calls[0], "voltage_a");
            assert_eq!(calls[12], "voltage_b");
            assert_eq!(calls[24], "voltage_c");
            assert_eq!(calls[36], "total_active_power");
            assert_eq!(calls[42], "total_apparent_energy");
        });
    }

    #[test]
    fn test_voltage_scenario() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut client = MockMeterClient::new(1, &calls);
            client.readings.insert("voltage_a".to_string(), 230.1);
            client.readings.insert("voltage_b".to_string(), 229.8);
            client.readings.insert("voltage_c".to_string(), 231.0);
            client.readings.insert("current_a".to_string(), 1.2);

            let log = PublishLog::default();
            let mut device = make_device(1, client);
            for phase in Phase::ALL {
                let channel = Channel::Phase(phase, PhaseQuantity::Voltage);
                device
                    .channels_mut()
                    .set_phase_sink(PhaseQuantity::Voltage, phase, RecordingSink::boxed(channel, &log))
                    .unwrap();
            }
            assert_eq!(device.channels_mut().bound_count(), 3);

            let report = device.update().await;
            assert_eq!(report.published, 3);
            assert_eq!(report.invalid, 0);
            assert_eq!(
                *log.lock().unwrap(),
                vec![
                    ("voltage_a".to_string(), 230.1),
                    ("voltage_b".to_string(), 229.8),
                    ("voltage_c".to_string(), 231.0),
                ]
            );
        });
    }

    #[test]
    fn test_invalid_phase_b_voltage() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut client = MockMeterClient::new(1, &calls);
            client.readings.insert("voltage_a".to_string(), 230.1);
            client.readings.insert("voltage_b".to_string(), f32::NAN);
            client.readings.insert("voltage_c".to_string(), 231.0);

            let log = PublishLog::default();
            let mut device = make_device(1, client);
            for phase in Phase::ALL {
                let channel = Channel::Phase(phase, PhaseQuantity::Voltage);
                device.bind_sink(channel, RecordingSink::boxed(channel, &log)).unwrap();
            }

            let report = device.update().await;
            assert_eq!(report.invalid, 1);
            assert_eq!(
                *log.lock().unwrap(),
                vec![("voltage_a".to_string(), 230.1), ("voltage_c".to_string(), 231.0)]
            );

            // next cycle still polls phase B
            device.update().await;
            assert_eq!(log.lock().unwrap().len(), 4);
        });
    }

    #[test]
    fn test_invalid_never_published() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut client = MockMeterClient::new(1, &calls);
            client.default = f32::NAN;

            let log = PublishLog::default();
            let mut device = make_device(1, client);
            for channel in Channel::all() {
                device.bind_sink(channel, RecordingSink::boxed(channel, &log)).unwrap();
            }

            let report = device.update().await;
            assert_eq!(report.published, 0);
            assert_eq!(report.invalid as usize, CHANNEL_COUNT);
            assert!(log.lock().unwrap().is_empty());
        });
    }

    #[test]
    fn test_kilo_units_published() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut client = MockMeterClient::new(1, &calls);
            client.readings.insert("active_power_a".to_string(), 1500.0);
            client.readings.insert("total_active_energy".to_string(), 1500.0);
            client.readings.insert("power_factor_a".to_string(), 0.5);

            let log = PublishLog::default();
            let mut device = make_device(1, client);
            let channels = [
                Channel::Phase(Phase::A, PhaseQuantity::ActivePower),
                Channel::Phase(Phase::A, PhaseQuantity::PowerFactor),
                Channel::Total(TotalQuantity::ActiveEnergy),
            ];
            for channel in channels {
                device.bind_sink(channel, RecordingSink::boxed(channel, &log)).unwrap();
            }

            device.update().await;
            assert_eq!(
                *log.lock().unwrap(),
                vec![
                    ("active_power_a".to_string(), 1.5),
                    ("power_factor_a".to_string(), 0.5),
                    ("total_active_energy".to_string(), 1.5),
                ]
            );
        });
    }

    #[test]
    fn test_hardware_address_always_zero() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            for address in [1u8, 5, 247] {
                let calls = CallLog::default();
                let mut device = make_device(address, MockMeterClient::new(address, &calls));
                assert!(device.use_hardware_address().await);
                assert_eq!(*calls.lock().unwrap(), vec!["set_address 0"]);
                assert_eq!(device.addressing(), AddressingMode::Hardware);
            }
        });
    }

    #[test]
    fn test_software_address_then_reset() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut device = make_device(1, MockMeterClient::new(1, &calls));

            assert!(device.set_software_address(5).await);
            assert!(device.reset_energy_all().await);

            assert_eq!(*calls.lock().unwrap(), vec!["set_address 5", "reset_energy All"]);
            assert_eq!(device.address(), 5);
            assert_eq!(device.addressing(), AddressingMode::Software(5));
        });
    }

    #[test]
    fn test_rejected_address_keeps_state() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut client = MockMeterClient::new(1, &calls);
            client.accept_commands = false;
            let mut device = make_device(1, client);

            assert!(!device.execute(&MeterActionEnum::SetSoftwareAddress(248)).await);
            assert!(!device.execute(&MeterActionEnum::UseHardwareAddress).await);
            assert!(!device.execute(&MeterActionEnum::ResetEnergy).await);
            assert_eq!(device.address(), 1);
            assert_eq!(device.addressing(), AddressingMode::Software(1));
        });
    }

    #[test]
    fn test_software_address_out_of_range_not_sent() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut device = make_device(1, MockMeterClient::new(1, &calls));

            // the client would accept both, the device must not send them
            assert!(!device.set_software_address(HARDWARE_ADDRESS).await);
            assert!(!device.set_software_address(248).await);
            assert_eq!(device.address(), 1);
            assert_eq!(device.addressing(), AddressingMode::Software(1));
            assert!(!calls.lock().unwrap().iter().any(|call| call.starts_with("set_address")));

            assert!(device.set_software_address(MAX_SOFTWARE_ADDRESS).await);
            assert_eq!(device.addressing(), AddressingMode::Software(247));
        });
    }

    #[test]
    fn test_dummy_client_software_address_zero_rejected() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut device = make_device_with(1, Box::new(DummyMeterClient::new(1)));
            assert!(!device.set_software_address(0).await);
            assert_eq!(device.address(), 1);
            assert_eq!(device.addressing(), AddressingMode::Software(1));
        });
    }

    #[test]
    fn test_setup_sequence() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let pins = Arc::new(RecordingPinDriver::default());
            let grid = GridConfig {
                baud_rate: 9600,
                connection_type: ConnectionType::ThreePhaseFourWire,
                line_frequency: LineFrequency::F60Hz,
            };
            let mut device = make_device(1, MockMeterClient::new(1, &calls))
                .with_bus_enable(BusEnableController::new(4, pins.clone()))
                .with_grid(grid);

            device.setup().await.unwrap();
            assert!(device.transport.is_initialized());
            assert_eq!(*pins.calls.lock().unwrap(), vec!["output 4", "write 4 false"]);
            assert_eq!(
                *calls.lock().unwrap(),
                vec!["set_enable 4", "begin", "set_baudrate 9600 ThreePhaseFourWire", "set_frequency 60"]
            );
        });
    }

    #[test]
    fn test_setup_tolerates_rejected_grid_config() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let calls = CallLog::default();
            let mut client = MockMeterClient::new(1, &calls);
            client.accept_commands = false;
            let mut device = make_device(1, client);

            assert!(device.setup().await.is_ok());
            assert!(!calls.lock().unwrap().iter().any(|call| call.starts_with("set_enable")));
        });
    }

    #[test]
    fn test_two_meters_share_one_open() {
        let _ = init_logger();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let transport = Arc::new(SharedTransport::new("test_bus", Box::new(DummyOpener)));
            let line = LineConfig::pzem("/dev/ttyUSB0", 16, 17);
            let calls = CallLog::default();
            let mut first = PzemDevice::new("pzem_1", 1, transport.clone(), line.clone(), Box::new(MockMeterClient::new(1, &calls)));
            let mut second = PzemDevice::new("pzem_2", 2, transport.clone(), line.clone(), Box::new(MockMeterClient::new(2, &calls)));

            first.setup().await.unwrap();
            second.setup().await.unwrap();
            assert!(transport.is_initialized());
            assert_eq!(transport.active_config(), Some(&line));
            assert_eq!(calls.lock().unwrap().iter().filter(|call| *call == "begin").count(), 2);
        });
    }
}
