use palette::Srgb;

/// One LED worth of 8 bit color.
pub type Rgb = Srgb<u8>;

pub const BLACK: Rgb = Srgb::new(0, 0, 0);

/// Converts a float color to 8 bit channels, clamping each channel to 0..=255.
pub fn to_rgb8(color: palette::LinSrgb) -> Rgb {
    let srgb = Srgb::<f32>::from_linear(color);
    Srgb::new(clamp_u8(srgb.red), clamp_u8(srgb.green), clamp_u8(srgb.blue))
}

fn clamp_u8(num: f32) -> u8 {
    (num * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Fixed-length frame of pixels produced by an effect once per tick.
///
/// Writes outside of the buffer are ignored, so the length always stays at the
/// pixel count the buffer was created with.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    pixels: Vec<Rgb>,
}

impl PixelBuffer {
    pub fn new(pixel_count: usize) -> PixelBuffer {
        PixelBuffer {
            pixels: vec![BLACK; pixel_count],
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.pixels.get(index).copied()
    }

    #[cfg(test)]
    pub fn set(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(BLACK);
    }

    /// Paints `start..end`, clipped to the buffer. Empty or inverted ranges paint nothing.
    pub fn fill_range(&mut self, start: usize, end: usize, color: Rgb) {
        let end = end.min(self.pixels.len());
        if start >= end {
            return;
        }
        self.pixels[start..end].fill(color);
    }

    /// Flattens the frame into R, G, B, R, G, B, ... wire order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| [p.red, p.green, p.blue])
            .collect()
    }
}
