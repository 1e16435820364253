//! Polling engine for PZEM-6L24 three phase energy meters on shared rs-485 buses.
//! Meters on one bus share a single serial line, are set up once and then polled
//! at their own interval; every valid reading is forwarded to the sink bound to its channel.

pub mod common;
pub mod entity;
pub mod driver;
pub mod controller;
