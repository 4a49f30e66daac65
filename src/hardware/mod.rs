pub mod simulated;

use crate::errors::CoreError;
use std::time::Instant;

// HARDWARE FEED BOUNDARY ------------------------------------------------------

/// One timestamped amplitude reading from the ECG channel.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub value: f64,
    /// Monotonic arrival timestamp, stamped by the feed.
    pub at: Instant,
}

impl Sample {
    pub fn new(value: f64, at: Instant) -> Self {
        Self { value, at }
    }
}

/// Data delivery mode of the acquisition server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// All enabled channels multiplexed over one connection. Required.
    Single,
    /// One connection per channel.
    PerChannel,
}

pub type SampleCallback = Box<dyn FnMut(Sample) + Send>;

/// Injected capability over the acquisition device. The core depends only
/// on this trait, never on a device SDK.
///
/// Samples are delivered on the feed's own thread via the registered
/// callback; the core does not poll.
pub trait AcquisitionSource: Send {
    fn connect(&mut self) -> Result<(), CoreError>;
    fn connection_mode(&self) -> ConnectionMode;
    fn set_connection_mode(&mut self, mode: ConnectionMode) -> Result<(), CoreError>;
    fn enabled_channels(&self) -> Vec<String>;
    fn start(&mut self) -> Result<(), CoreError>;
    fn stop(&mut self) -> Result<(), CoreError>;
    /// Replaces any previously registered callback.
    fn register_sample_callback(&mut self, callback: SampleCallback);
    fn toggle_acquisition(&mut self) -> Result<(), CoreError>;
    fn is_acquiring(&self) -> bool;
}
