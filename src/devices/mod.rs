pub(crate) mod ddp;

use crate::config::DeviceConfig;
use crate::error::Error;
use crate::pixels::PixelBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    /// Not sending. A destination may already be cached.
    Created,
    /// Waiting for a background resolution attempt.
    Resolving,
    /// The last resolution attempt failed and there is no destination.
    Unresolved,
    /// Transport open, frames are being sent.
    Active,
}

/// Something that can display a frame of pixels.
pub trait Device {
    fn name(&self) -> &str;
    fn pixel_count(&self) -> usize;
    fn config(&self) -> &DeviceConfig;
    /// Replaces the configuration. Invalid configurations are rejected and the
    /// old one stays in effect.
    fn update_config(&mut self, config: DeviceConfig) -> Result<(), Error>;
    fn state(&mut self) -> DeviceState;
    /// Tries to start sending. Failures are logged and reflected in the returned state.
    fn activate(&mut self) -> DeviceState;
    fn deactivate(&mut self);
    /// Sends one frame. Does nothing unless the device is active.
    fn flush(&mut self, pixels: &PixelBuffer);
}
