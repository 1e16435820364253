pub mod meter_factory;
pub mod reporting_thread;
