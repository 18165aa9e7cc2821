//! Hardware-independent core of the aquamon water monitor
//!
//! Everything that does not touch a peripheral lives here: the reading model,
//! linear scaling of the analog probes, payload rendering, the one-wire
//! protocol and DS18B20 decoding, and the sample-and-publish loop driver.
//!
//! The crate is `#![no_std]` so the same code runs on the ESP32-S3 and in host
//! unit tests.

#![no_std]

pub mod config;
pub mod ds18b20;
pub mod error;
pub mod logic;
pub mod model;
pub mod onewire;
pub mod payload;
pub mod scaling;
pub mod traits;

pub use config::Config;
pub use logic::{LoopDriver, RunState, Sampler};
pub use model::Reading;
