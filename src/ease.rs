use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Acceleration profile applied to the beat oscillator, for inputs in `0.0..=1.0`.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EaseMethod {
    Linear,
    EaseIn,
    EaseInOut,
    EaseOut,
}

impl EaseMethod {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            EaseMethod::Linear => x,
            EaseMethod::EaseIn => x * x,
            EaseMethod::EaseInOut => 0.5 * (PI * (x - 0.5)).sin() + 0.5,
            EaseMethod::EaseOut => -(x - 1.0) * (x - 1.0) + 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EaseMethod::Linear => "linear",
            EaseMethod::EaseIn => "ease_in",
            EaseMethod::EaseInOut => "ease_in_out",
            EaseMethod::EaseOut => "ease_out",
        }
    }
}

pub fn ease(x: f64, method: EaseMethod) -> f64 {
    method.apply(x)
}

impl FromStr for EaseMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(EaseMethod::Linear),
            "ease_in" => Ok(EaseMethod::EaseIn),
            "ease_in_out" => Ok(EaseMethod::EaseInOut),
            "ease_out" => Ok(EaseMethod::EaseOut),
            _ => Err(format!("unknown ease method: {}", s)),
        }
    }
}

impl fmt::Display for EaseMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EaseMethod; 4] = [
        EaseMethod::Linear,
        EaseMethod::EaseIn,
        EaseMethod::EaseInOut,
        EaseMethod::EaseOut,
    ];

    fn nearly_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn known_values() {
        assert_eq!(ease(0.0, EaseMethod::Linear), 0.0);
        assert_eq!(ease(1.0, EaseMethod::Linear), 1.0);
        assert!(nearly_equal(ease(0.5, EaseMethod::EaseIn), 0.25));
        assert!(nearly_equal(ease(0.5, EaseMethod::EaseOut), 0.75));
        assert!(nearly_equal(ease(0.5, EaseMethod::EaseInOut), 0.5));
    }

    #[test]
    fn endpoints_are_fixed() {
        for method in ALL {
            assert!(nearly_equal(method.apply(0.0), 0.0), "{} at 0", method);
            assert!(nearly_equal(method.apply(1.0), 1.0), "{} at 1", method);
        }
    }

    #[test]
    fn stays_within_unit_range_and_is_monotonic() {
        for method in ALL {
            let mut last = method.apply(0.0);
            for i in 1..=1000 {
                let y = method.apply(i as f64 / 1000.0);
                assert!((-1e-6..=1.0 + 1e-6).contains(&y), "{} left [0, 1]: {}", method, y);
                assert!(y + 1e-6 >= last, "{} is not monotonic", method);
                last = y;
            }
        }
    }

    #[test]
    fn parses_config_names() {
        for method in ALL {
            assert_eq!(method.as_str().parse::<EaseMethod>(), Ok(method));
        }
        assert!("bouncy".parse::<EaseMethod>().is_err());
    }
}
