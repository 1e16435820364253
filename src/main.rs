use pzem_device_engine::common::logger::init_logger;
use pzem_device_engine::common::setting::Settings;
use pzem_device_engine::controller::meter_factory::{DummyClientFactory, MeterFactory, RunMode};
use pzem_device_engine::controller::reporting_thread::reporting_thread;
use pzem_device_engine::{debug, error, info, warn};
use std::error::Error;
use std::process::exit;
use std::sync::mpsc;
use dotenv::dotenv;

const LOG_TAG: &str = "main";

fn main() -> Result<(), Box<dyn Error>> {
    // check .env file
    dotenv().ok();

    // load config
    let settings = Settings::get();

    // set logger
    init_logger()?;
    info!(LOG_TAG, "config loaded, env: {:?}", settings.env.env);
    debug!(LOG_TAG, "config: {:?}", settings);

    let mode = RunMode::from_env();
    if mode == RunMode::Real {
        // the meter protocol client is provided by the integrating firmware
        error!(LOG_TAG, "no pzem protocol client linked, start with mode=dummy to run simulated meters");
        exit(1);
    }

    let (reading_tx, reading_rx) = mpsc::channel();
    let reporter = reporting_thread(reading_rx);

    let factory = MeterFactory::new(mode, Box::new(DummyClientFactory), reading_tx);
    let mut buses = factory.make_buses(&settings.buses)?;
    // only the sinks hold senders now, the reporter exits with the last bus
    drop(factory);

    if buses.is_empty() {
        warn!(LOG_TAG, "no bus configured, nothing to poll");
    }

    for bus in buses.iter_mut() {
        bus.start()?;
    }

    let stoppers: Vec<_> = buses.iter().filter_map(|bus| bus.stopper()).collect();
    ctrlc::set_handler(move || {
        for stopper in stoppers.iter() {
            match stopper.stop() {
                Ok(()) => info!(LOG_TAG, "stop sent to bus {}", stopper.bus_name()),
                Err(e) => error!(LOG_TAG, "{}", e),
            }
        }
    })?;
    info!(LOG_TAG, "{} bus(es) running, ctrl-c to stop", buses.len());

    for bus in buses.iter_mut() {
        if let Err(e) = bus.join() {
            error!(LOG_TAG, "bus {} join error: {}", bus.name(), e);
        }
    }

    match reporter.join() {
        Ok(reported) => info!(LOG_TAG, "stopped, {} reading(s) reported", reported),
        Err(_) => error!(LOG_TAG, "reporting thread panicked"),
    }
    Ok(())
}
