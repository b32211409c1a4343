#![doc = include_str!("../README.md")]

pub use framefeed_capture as capture;
pub use framefeed_core as core;

pub mod config;
pub mod device;
pub mod error;

pub use config::FeedConfig;
pub use device::{Capabilities, Device, DeviceState, Reconfigure, StreamState};
pub use error::DeviceError;

pub mod prelude {
    pub use crate::{
        Capabilities, Device, DeviceError, DeviceState, FeedConfig, Reconfigure, StreamState,
    };
    pub use framefeed_capture::prelude::*;
}
