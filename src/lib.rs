//! netsight library crate: capture, decode and aggregate network state.

pub mod capture;
pub mod classify;
pub mod config;
pub mod decode;
pub mod display;
pub mod events;
pub mod inspect;
pub mod layout;
pub mod model;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod stats;
pub mod window;

pub use monitor::{MonitorError, NetworkMonitor};
