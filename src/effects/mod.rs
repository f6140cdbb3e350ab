pub(crate) mod bar;

use crate::beat::BeatData;
use crate::error::Error;
use crate::pixels::PixelBuffer;

pub trait LightingEffect {
    type Config;

    /// Advances the animation by one tick and returns the frame to display.
    fn step(&mut self, beat: &BeatData) -> &PixelBuffer;

    /// Applies a new configuration and starts the animation over.
    fn config_updated(&mut self, config: Self::Config) -> Result<(), Error>;
}
