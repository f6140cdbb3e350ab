use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::beat::BeatData;
use crate::ease::{ease, EaseMethod};
use crate::effects::LightingEffect;
use crate::error::Error;
use crate::gradient::{ColorSource, Gradient};
use crate::pixels::PixelBuffer;

/// 8 colours, 4 beats to a bar
const COLOR_STEP: f64 = 0.125;
/// Length of the bouncing bar as a fraction of the strip.
const BAR_LEN: f64 = 0.3;

/// Movement of the bar.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Bounce,
    Wipe,
    InOut,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Bounce => "bounce",
            Mode::Wipe => "wipe",
            Mode::InOut => "in-out",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bounce" => Ok(Mode::Bounce),
            "wipe" => Ok(Mode::Wipe),
            "in-out" => Ok(Mode::InOut),
            _ => Err(format!("unknown bar mode: {}", s)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BarConfig {
    /// Color scheme of bar
    pub gradient_name: String,
    pub mode: Mode,
    /// Acceleration profile of bar
    pub ease_method: EaseMethod,
}

impl Default for BarConfig {
    fn default() -> Self {
        BarConfig {
            gradient_name: "Spectral".to_string(),
            mode: Mode::Wipe,
            ease_method: EaseMethod::EaseOut,
        }
    }
}

impl BarConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !Gradient::exists(&self.gradient_name) {
            return Err(Error::Configuration(format!(
                "unknown gradient {}, expected one of: {}",
                self.gradient_name,
                Gradient::names().collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(())
    }
}

/// Which half of the sweep the bar is in. Flips on every beat onset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    First,
    Second,
}

impl Phase {
    fn flipped(self) -> Phase {
        match self {
            Phase::First => Phase::Second,
            Phase::Second => Phase::First,
        }
    }
}

/// A single colored bar that moves with the beat.
///
/// The eased beat oscillator positions the bar inside the strip. Each onset
/// flips the phase, and the bar color steps through the gradient in eighths.
pub struct BarEffect {
    config: BarConfig,
    gradient: Gradient,
    pixels: PixelBuffer,
    phase: Phase,
    color_idx: f64,
}

impl BarEffect {
    pub fn new(config: BarConfig, pixel_count: usize) -> Result<BarEffect, Error> {
        let gradient = load_gradient(&config)?;
        Ok(BarEffect {
            config,
            gradient,
            pixels: PixelBuffer::new(pixel_count),
            phase: Phase::First,
            color_idx: 0.0,
        })
    }

    #[cfg(test)]
    pub fn config(&self) -> &BarConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn color_idx(&self) -> f64 {
        self.color_idx
    }

    fn advance_color(&mut self) {
        self.color_idx = (self.color_idx + COLOR_STEP) % 1.0;
    }

    /// Flips the phase on an onset. Returns true if the flip landed on the first phase.
    fn flip_on_beat(&mut self, beat_now: bool) -> bool {
        if beat_now {
            self.phase = self.phase.flipped();
            return self.phase == Phase::First;
        }
        false
    }

    /// Bar start and end as fractions of the strip.
    fn bar_span(&mut self, beat: &BeatData) -> (f64, f64) {
        let x = ease(beat.oscillator, self.config.ease_method);

        match self.config.mode {
            Mode::Wipe => {
                if self.flip_on_beat(beat.beat_now) {
                    self.advance_color();
                }
                match self.phase {
                    Phase::First => (0.0, x),
                    Phase::Second => (x, 1.0),
                }
            }
            Mode::Bounce => {
                if beat.beat_now {
                    self.flip_on_beat(true);
                    self.advance_color();
                }
                let x = x * (1.0 - BAR_LEN);
                match self.phase {
                    Phase::First => (x, x + BAR_LEN),
                    Phase::Second => (1.0 - (x + BAR_LEN), 1.0 - x),
                }
            }
            Mode::InOut => {
                // Only advances when coming back to the first phase, like wipe.
                if self.flip_on_beat(beat.beat_now) {
                    self.advance_color();
                }
                match self.phase {
                    Phase::First => (0.0, x),
                    Phase::Second => (0.0, 1.0 - x),
                }
            }
        }
    }

    fn pixel_index(&self, fraction: f64) -> usize {
        // Negative values saturate to 0.
        (self.pixels.len() as f64 * fraction).floor() as usize
    }
}

fn load_gradient(config: &BarConfig) -> Result<Gradient, Error> {
    config.validate()?;
    Gradient::named(&config.gradient_name).ok_or_else(|| {
        Error::Configuration(format!("unknown gradient {}", config.gradient_name))
    })
}

impl LightingEffect for BarEffect {
    type Config = BarConfig;

    fn step(&mut self, beat: &BeatData) -> &PixelBuffer {
        let (bar_start, bar_end) = self.bar_span(beat);
        let start = self.pixel_index(bar_start);
        let end = self.pixel_index(bar_end);
        let color = self.gradient.color_at(self.color_idx as f32);

        self.pixels.clear();
        self.pixels.fill_range(start, end, color);
        &self.pixels
    }

    fn config_updated(&mut self, config: BarConfig) -> Result<(), Error> {
        self.gradient = load_gradient(&config)?;
        self.config = config;
        self.phase = Phase::First;
        self.color_idx = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::{Rgb, BLACK};

    fn bar(mode: Mode, ease_method: EaseMethod, pixel_count: usize) -> BarEffect {
        let config = BarConfig {
            gradient_name: "Rainbow".to_string(),
            mode,
            ease_method,
        };
        BarEffect::new(config, pixel_count).unwrap()
    }

    fn beat(oscillator: f64, beat_now: bool) -> BeatData {
        BeatData {
            oscillator,
            beat_now,
        }
    }

    fn lit(pixels: &PixelBuffer) -> Vec<usize> {
        (0..pixels.len())
            .filter(|&i| pixels.get(i) != Some(BLACK))
            .collect()
    }

    #[test]
    fn wipe_fills_up_to_the_oscillator() {
        let mut effect = bar(Mode::Wipe, EaseMethod::Linear, 10);
        let expected = Gradient::named("Rainbow").unwrap().color_at(0.0);

        let pixels = effect.step(&beat(0.5, false));

        assert_eq!(lit(pixels), (0..5).collect::<Vec<_>>());
        assert_eq!(pixels.get(0), Some(expected));
        assert_eq!(effect.phase(), Phase::First);
        assert_eq!(effect.color_idx(), 0.0);
    }

    #[test]
    fn wipe_second_phase_clears_from_the_start() {
        let mut effect = bar(Mode::Wipe, EaseMethod::Linear, 10);

        let span = lit(effect.step(&beat(0.25, true)));

        assert_eq!(effect.phase(), Phase::Second);
        assert_eq!(span, (2..10).collect::<Vec<_>>());
    }

    #[test]
    fn wipe_advances_color_every_other_beat() {
        let mut effect = bar(Mode::Wipe, EaseMethod::Linear, 10);

        effect.step(&beat(0.0, true));
        assert_eq!(effect.color_idx(), 0.0);
        effect.step(&beat(0.5, false));
        effect.step(&beat(0.0, true));
        assert_eq!(effect.color_idx(), 0.125);
        effect.step(&beat(0.0, true));
        assert_eq!(effect.color_idx(), 0.125);
        effect.step(&beat(0.0, true));
        assert_eq!(effect.color_idx(), 0.25);
    }

    #[test]
    fn bounce_advances_color_every_beat() {
        let mut effect = bar(Mode::Bounce, EaseMethod::Linear, 10);

        effect.step(&beat(0.0, true));
        assert_eq!(effect.color_idx(), 0.125);
        assert_eq!(effect.phase(), Phase::Second);
        effect.step(&beat(0.0, true));
        assert_eq!(effect.color_idx(), 0.25);
        assert_eq!(effect.phase(), Phase::First);
    }

    #[test]
    fn bounce_bar_moves_in_both_directions() {
        let mut effect = bar(Mode::Bounce, EaseMethod::Linear, 100);

        let pixels = effect.step(&beat(0.0, false));
        assert_eq!(lit(pixels), (0..30).collect::<Vec<_>>());

        // Second phase starts from the far end.
        let pixels = effect.step(&beat(0.0, true));
        assert_eq!(lit(pixels), (70..100).collect::<Vec<_>>());

        let pixels = effect.step(&beat(1.0, false));
        assert_eq!(lit(pixels).first(), Some(&0));
    }

    #[test]
    fn in_out_grows_then_shrinks() {
        let mut effect = bar(Mode::InOut, EaseMethod::Linear, 10);

        assert_eq!(lit(effect.step(&beat(0.25, false))), vec![0, 1]);

        let span = lit(effect.step(&beat(0.25, true)));
        assert_eq!(effect.phase(), Phase::Second);
        assert_eq!(effect.color_idx(), 0.0);
        assert_eq!(span, (0..7).collect::<Vec<_>>());

        effect.step(&beat(0.0, true));
        assert_eq!(effect.phase(), Phase::First);
        assert_eq!(effect.color_idx(), 0.125);
    }

    #[test]
    fn color_index_wraps_around() {
        let mut effect = bar(Mode::Bounce, EaseMethod::Linear, 10);
        for _ in 0..8 {
            effect.step(&beat(0.0, true));
        }
        assert_eq!(effect.color_idx(), 0.0);

        for _ in 0..1000 {
            effect.step(&beat(0.0, true));
            assert!((0.0..1.0).contains(&effect.color_idx()));
        }
    }

    #[test]
    fn phase_only_changes_on_onsets() {
        let mut effect = bar(Mode::Wipe, EaseMethod::EaseOut, 10);
        for i in 0..100 {
            effect.step(&beat(i as f64 / 100.0, false));
        }
        assert_eq!(effect.phase(), Phase::First);
        assert_eq!(effect.color_idx(), 0.0);
    }

    #[test]
    fn empty_span_lights_nothing() {
        let mut effect = bar(Mode::Wipe, EaseMethod::Linear, 10);
        assert!(lit(effect.step(&beat(0.05, false))).is_empty());
    }

    #[test]
    fn easing_shapes_the_bar() {
        let mut effect = bar(Mode::Wipe, EaseMethod::EaseIn, 100);
        // 0.5^2 of the strip
        assert_eq!(lit(effect.step(&beat(0.5, false))).len(), 25);
    }

    #[test]
    fn config_update_starts_over() {
        let mut effect = bar(Mode::Bounce, EaseMethod::Linear, 10);
        effect.step(&beat(0.0, true));
        assert_eq!(effect.phase(), Phase::Second);

        let config = BarConfig {
            gradient_name: "Ocean".to_string(),
            mode: Mode::Wipe,
            ease_method: EaseMethod::Linear,
        };
        effect.config_updated(config).unwrap();
        assert_eq!(effect.phase(), Phase::First);
        assert_eq!(effect.color_idx(), 0.0);

        let pixels = effect.step(&beat(1.0, false));
        assert_eq!(pixels.get(9), Some(Rgb::new(0, 255, 255)));
    }

    #[test]
    fn unknown_gradient_is_rejected() {
        let config = BarConfig {
            gradient_name: "Plaid".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            BarEffect::new(config.clone(), 10),
            Err(Error::Configuration(_))
        ));

        let mut effect = bar(Mode::Wipe, EaseMethod::Linear, 10);
        assert!(effect.config_updated(config).is_err());
        assert_eq!(effect.config().gradient_name, "Rainbow");
    }

    #[test]
    fn parses_mode_names() {
        for mode in [Mode::Bounce, Mode::Wipe, Mode::InOut] {
            assert_eq!(mode.as_str().parse::<Mode>(), Ok(mode));
        }
        assert!("zigzag".parse::<Mode>().is_err());
    }
}
