//! Utility module

pub mod error;
pub mod logging;
