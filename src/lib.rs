pub mod algo;
pub mod client;
pub mod config;
pub mod core;
pub mod scout;
pub mod util;

pub use crate::core::*;
pub use scout::{ScreenerError, VolumeScanner};
