use std::fmt;
use std::str::FromStr;

use crate::error::PainterError;

/// Raw RSSI reading in dBm as reported by BlueZ (negative, closer to zero is stronger)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSample(pub i16);

impl SignalSample {
    /// Negated reading, so that a larger value means a stronger signal
    pub fn strength(self) -> i64 {
        -i64::from(self.0)
    }
}

/// Largest RSSI magnitude accepted for a bound; BlueZ reports RSSI as a signed byte
pub const MAX_BOUND: i32 = 127;

/// Calibration window for the colour gradient, both bounds as positive magnitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRange {
    /// Magnitude seen when the peripheral is very close (strong signal)
    pub near_bound: i32,
    /// Magnitude seen when the peripheral is far away (weak signal)
    pub far_bound: i32,
}

impl SignalRange {
    pub fn new(near_bound: i32, far_bound: i32) -> Result<Self, PainterError> {
        let range = SignalRange {
            near_bound,
            far_bound,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), PainterError> {
        if self.near_bound == self.far_bound {
            return Err(PainterError::InvalidRange(self.near_bound));
        }
        for bound in [self.near_bound, self.far_bound] {
            if !(0..=MAX_BOUND).contains(&bound) {
                return Err(PainterError::BoundOutOfRange(bound));
            }
        }
        Ok(())
    }
}

impl Default for SignalRange {
    fn default() -> Self {
        SignalRange {
            near_bound: 1,
            far_bound: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorValue {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ColorValue {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        ColorValue { red, green, blue }
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// Shape painted with the current colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Brush {
    /// Five small dots in a column
    #[default]
    Dots,
    /// Five large circles in a column
    Circles,
    /// One large spot in the middle
    Spot,
    /// A bar across the whole width
    Bar,
}

impl Brush {
    const ALL: [Brush; 4] = [Brush::Dots, Brush::Circles, Brush::Spot, Brush::Bar];

    fn index(self) -> usize {
        Brush::ALL
            .iter()
            .position(|b| *b == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Brush {
        Brush::ALL[(self.index() + 1) % Brush::ALL.len()]
    }

    pub fn previous(self) -> Brush {
        Brush::ALL[(self.index() + Brush::ALL.len() - 1) % Brush::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Brush::Dots => "dots",
            Brush::Circles => "circles",
            Brush::Spot => "spot",
            Brush::Bar => "bar",
        }
    }
}

impl FromStr for Brush {
    type Err = PainterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Brush::ALL
            .into_iter()
            .find(|b| b.name() == wanted)
            .ok_or_else(|| PainterError::Config(format!("Unknown brush '{}'", s)))
    }
}

/// A bonded peripheral known to the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedDevice {
    pub address: String,
    pub name: Option<String>,
}

impl fmt::Display for PairedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (MAC Address: {})", name, self.address),
            None => write!(f, "<unnamed> (MAC Address: {})", self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_strength_is_negated_reading() {
        assert_eq!(SignalSample(-42).strength(), 42);
        assert_eq!(SignalSample(3).strength(), -3);
        assert_eq!(SignalSample(i16::MIN).strength(), 32768);
    }

    #[test]
    fn range_with_equal_bounds_is_rejected() {
        assert!(matches!(
            SignalRange::new(7, 7),
            Err(PainterError::InvalidRange(7))
        ));
        assert!(SignalRange::new(1, 15).is_ok());
    }

    #[test]
    fn bounds_outside_the_rssi_byte_are_rejected() {
        assert!(matches!(
            SignalRange::new(1, i32::MAX),
            Err(PainterError::BoundOutOfRange(i32::MAX))
        ));
        assert!(matches!(
            SignalRange::new(-5, 5),
            Err(PainterError::BoundOutOfRange(-5))
        ));
        assert!(SignalRange::new(0, MAX_BOUND).is_ok());
    }

    #[test]
    fn brushes_cycle_in_both_directions() {
        assert_eq!(Brush::Dots.next(), Brush::Circles);
        assert_eq!(Brush::Bar.next(), Brush::Dots);
        assert_eq!(Brush::Dots.previous(), Brush::Bar);
        assert_eq!(Brush::Spot.previous(), Brush::Circles);
    }

    #[test]
    fn brush_parses_case_insensitively() {
        assert_eq!(" Spot ".parse::<Brush>().unwrap(), Brush::Spot);
        assert!("brushy".parse::<Brush>().is_err());
    }

    #[test]
    fn color_displays_as_hex() {
        assert_eq!(ColorValue::new(255, 0, 16).to_string(), "#FF0010");
    }
}
