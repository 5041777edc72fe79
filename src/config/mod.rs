//! Configuration model for lockstore.
//!
//! `StoreConfig` holds the tuning knobs of the persistence core: lock
//! staleness and heartbeat, lock backoff, write retries, and the bounds of
//! the in-process queue. It can be built in code or loaded from YAML;
//! unknown fields are ignored and missing fields take their defaults.

mod model;
mod operations;
pub mod types;


pub use model::{LockConfig, StoreConfig};
