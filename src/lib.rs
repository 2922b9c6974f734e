//! Environmental telemetry hub: samples temperature, humidity and CO2,
//! keeps a rolling history of per-interval averages and streams updates
//! to websocket subscribers.

pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod sensors;
pub mod telemetry;
pub mod utils;
