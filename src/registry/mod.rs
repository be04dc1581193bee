//! Concurrent device and connection state. Both maps are `DashMap`s: a
//! single identity is updated atomically under its shard lock, and readers
//! only ever get copies.

pub mod connection;
pub mod device;

pub use connection::{
    Connection, ConnectionKey, ConnectionObservation, ConnectionRegistry, ConnectionState, Direction, Endpoint,
};
pub use device::{Device, DeviceKey, DeviceObservation, DeviceRegistry, SecuritySummary};
