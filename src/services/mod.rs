//! Services module
//!
//! Call execution, batch dispatch and the composed client.

pub mod batch;
pub mod client;
pub mod executor;

pub use batch::{BatchConfig, BatchDispatcher};
pub use client::{DispatchClient, DispatchClientBuilder};
pub use executor::{CallExecutor, HttpTransport, Transport};
