use palette::{LinSrgb, Mix, Srgb};

use crate::pixels::{to_rgb8, Rgb};

/// Maps a position in `0.0..=1.0` to a color.
pub trait ColorSource {
    fn color_at(&self, t: f32) -> Rgb;
}

const GRADIENTS: &[(&str, &[u32])] = &[
    (
        "Spectral",
        &[
            0x9e0142, 0xd53e4f, 0xf46d43, 0xfdae61, 0xfee08b, 0xe6f598, 0xabdda4, 0x66c2a5,
            0x3288bd, 0x5e4fa2,
        ],
    ),
    ("Rainbow", &[0xff0000, 0xff7f00, 0xffff00, 0x00ff00, 0x0000ff, 0x8b00ff]),
    ("Dancefloor", &[0xff0000, 0xff00b2, 0x0000ff]),
    ("Plasma", &[0x0d0887, 0x7e03a8, 0xcc4778, 0xf89540, 0xf0f921]),
    ("Ocean", &[0x00ffff, 0x0080ff, 0x0000ff]),
    ("Viridis", &[0x440154, 0x3b528b, 0x21918c, 0x5ec962, 0xfde725]),
    ("Jungle", &[0x00ff00, 0x228b22, 0xff7f00]),
    ("Sunset", &[0x0000ff, 0x8b00ff, 0xff0000, 0xff7f00]),
    ("Frost", &[0x0000ff, 0x00ffff, 0xffffff]),
];

fn hex_to_linear(hex: u32) -> LinSrgb {
    let srgb = Srgb::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8);
    srgb.into_format::<f32>().into_linear()
}

/// Evenly spaced color stops, blended in linear light.
#[derive(Clone, Debug)]
pub struct Gradient {
    stops: Vec<LinSrgb>,
}

impl Gradient {
    pub fn names() -> impl Iterator<Item = &'static str> {
        GRADIENTS.iter().map(|(name, _)| *name)
    }

    pub fn exists(name: &str) -> bool {
        Gradient::names().any(|n| n == name)
    }

    pub fn named(name: &str) -> Option<Gradient> {
        GRADIENTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, stops)| Gradient {
                stops: stops.iter().map(|&hex| hex_to_linear(hex)).collect(),
            })
    }
}

impl ColorSource for Gradient {
    fn color_at(&self, t: f32) -> Rgb {
        let last = self.stops.len() - 1;
        if last == 0 {
            return to_rgb8(self.stops[0]);
        }

        let pos = t.clamp(0.0, 1.0) * last as f32;
        let i = (pos.floor() as usize).min(last - 1);
        let color = self.stops[i].mix(self.stops[i + 1], pos - i as f32);
        to_rgb8(color)
    }
}
