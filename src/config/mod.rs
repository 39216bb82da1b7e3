//! Configuration module

pub mod settings;

pub use settings::{BatchSettings, BreakerSettings, Settings, TransportSettings};
