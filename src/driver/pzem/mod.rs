pub mod prelude;
pub mod entity;
pub mod traits;
pub mod shared_transport;
pub mod bus_enable;
pub mod channel_table;
pub mod upward_sink;
pub mod pzem_device;
pub mod dummy_client;
pub mod pzem_thread;
pub mod pzem_bus;
