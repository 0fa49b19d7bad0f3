/// RSSI to colour mapping
///
/// A reading is first rescaled onto 0..=255 across the calibrated window and
/// then split into three channels by piecewise-linear ramps around the
/// midpoint 127.5: weak signals read blue, mid-range green, strong red.
use crate::error::PainterError;
use crate::models::{ColorValue, SignalRange, SignalSample};

const OUT_MIN: i64 = 0;
const OUT_MAX: i64 = 255;

/// Rescale `x` from `[in_min, in_max]` onto `[out_min, out_max]`, saturating at the ends
///
/// Integer arithmetic, truncating toward zero. `in_min` and `in_max` may be
/// given in either order; the caller guarantees they differ.
pub fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    let mapped = (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min;
    mapped.clamp(out_min, out_max)
}

/// Position of a sample on the gradient, 0 at the far bound and 255 at the near bound
pub fn normalize(sample: SignalSample, range: &SignalRange) -> Result<i64, PainterError> {
    range.validate()?;
    Ok(map_range(
        sample.strength(),
        i64::from(range.far_bound),
        i64::from(range.near_bound),
        OUT_MIN,
        OUT_MAX,
    ))
}

fn channel(value: i64) -> u8 {
    value.clamp(OUT_MIN, OUT_MAX) as u8
}

/// Split a normalized value (0..=255) into red, green and blue
///
/// The lower half is `v < 127.5`, i.e. `2v < 255`. Exactly 127.5 belongs to
/// the upper half and carries no blue.
pub fn split_channels(v: i64) -> ColorValue {
    let v = v.clamp(OUT_MIN, OUT_MAX);
    if 2 * v < OUT_MAX {
        ColorValue::new(0, channel(2 * v), channel(-2 * v + 255))
    } else {
        ColorValue::new(channel(2 * v - 255), channel(-2 * v + 510), 0)
    }
}

/// Convert one RSSI reading into the colour painted on screen
///
/// # Arguments
/// * `sample` - Raw RSSI reading in dBm
/// * `range` - Calibration window the reading is placed in
///
/// # Returns
/// The gradient colour, or `InvalidRange`/`BoundOutOfRange` if the window is unusable
pub fn map_signal_to_color(
    sample: SignalSample,
    range: &SignalRange,
) -> Result<ColorValue, PainterError> {
    normalize(sample, range).map(split_channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(r: u8, g: u8, b: u8) -> ColorValue {
        ColorValue::new(r, g, b)
    }

    #[test]
    fn split_matches_fixed_points() {
        assert_eq!(split_channels(0), rgb(0, 0, 255));
        assert_eq!(split_channels(127), rgb(0, 254, 1));
        assert_eq!(split_channels(128), rgb(1, 254, 0));
        assert_eq!(split_channels(255), rgb(255, 0, 0));
    }

    #[test]
    fn red_rises_and_blue_falls_across_the_gradient() {
        let mut previous = split_channels(0);
        for v in 1..=255 {
            let color = split_channels(v);
            assert!(color.red >= previous.red, "red dropped at v={}", v);
            assert!(color.blue <= previous.blue, "blue rose at v={}", v);
            previous = color;
        }
    }

    #[test]
    fn far_bound_reads_blue_and_near_bound_reads_red() {
        let range = SignalRange::new(1, 15).unwrap();
        assert_eq!(
            map_signal_to_color(SignalSample(-15), &range).unwrap(),
            rgb(0, 0, 255)
        );
        assert_eq!(
            map_signal_to_color(SignalSample(-1), &range).unwrap(),
            rgb(255, 0, 0)
        );
    }

    #[test]
    fn map_range_truncates_like_integer_division() {
        // (8 - 15) * 255 / (1 - 15) = -1785 / -14 = 127.5 -> 127
        assert_eq!(map_range(8, 15, 1, 0, 255), 127);
        assert_eq!(map_range(7, 15, 1, 0, 255), 145);
    }

    #[test]
    fn samples_outside_the_window_saturate() {
        let range = SignalRange::new(40, 90).unwrap();
        assert_eq!(normalize(SignalSample(-127), &range).unwrap(), 0);
        assert_eq!(normalize(SignalSample(20), &range).unwrap(), 255);
        assert_eq!(normalize(SignalSample(i16::MIN), &range).unwrap(), 0);
        assert_eq!(normalize(SignalSample(i16::MAX), &range).unwrap(), 255);
    }

    #[test]
    fn every_sample_yields_channels_in_bounds() {
        // u8 guarantees the bounds; this checks the mapping never panics on overflow
        // and stays on the gradient for the whole i16 domain
        let ranges = [
            SignalRange::new(1, 15).unwrap(),
            SignalRange::new(90, 30).unwrap(),
            SignalRange::new(0, 127).unwrap(),
        ];
        for range in &ranges {
            for raw in (i16::MIN..=i16::MAX).step_by(7) {
                let color = map_signal_to_color(SignalSample(raw), range).unwrap();
                assert!(color.red == 0 || color.blue == 0);
            }
        }
    }

    #[test]
    fn equal_bounds_compute_no_color() {
        let range = SignalRange {
            near_bound: 20,
            far_bound: 20,
        };
        assert!(matches!(
            map_signal_to_color(SignalSample(-20), &range),
            Err(PainterError::InvalidRange(20))
        ));
    }
}
