use log::{debug, info};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::time::Duration;

use crate::error::PainterError;
use crate::models::{Brush, SignalRange};
use crate::sampler::SamplerSettings;

#[derive(Debug, Clone)]
pub struct PainterConfig {
    /// Name or MAC address of the paired peripheral to paint
    pub device: Option<String>,
    pub range: SignalRange,
    pub sampler: SamplerSettings,
    pub brush: Brush,
    pub connect_attempts: u32,
    pub reconnect_delay: Duration,
}

/// Log file used while the terminal shows the canvas
pub const DEFAULT_LOG_FILE: &str = "light-painter.log";

/// Where log output goes; stderr is the painted terminal
pub fn log_file_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("PAINTER_LOG_FILE")
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
        .into()
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, PainterError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| PainterError::Config(format!("{} has an invalid value '{}'", key, raw))),
        _ => Ok(default),
    }
}

fn at_least<T>(key: &str, value: T, min: T) -> Result<T, PainterError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min {
        return Err(PainterError::Config(format!(
            "{} must be at least {}, got {}",
            key, min, value
        )));
    }
    Ok(value)
}

impl PainterConfig {
    pub fn new() -> Result<Self, PainterError> {
        // Load environment variables
        dotenv::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;

        info!(
            "Range: near -{} dBm, far -{} dBm, sampling every {:?}",
            config.range.near_bound, config.range.far_bound, config.sampler.interval
        );
        Ok(config)
    }

    /// Build the configuration from any key-value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PainterError> {
        let device = lookup("PAINTER_DEVICE")
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        debug!("PAINTER_DEVICE: {:?}", device);

        let defaults = SignalRange::default();
        let range = SignalRange::new(
            parse_var(&lookup, "RSSI_NEAR_BOUND", defaults.near_bound)?,
            parse_var(&lookup, "RSSI_FAR_BOUND", defaults.far_bound)?,
        )
        .map_err(|e| PainterError::Config(e.to_string()))?;

        let interval_ms = at_least(
            "SAMPLE_INTERVAL_MS",
            parse_var(&lookup, "SAMPLE_INTERVAL_MS", 1u64)?,
            1,
        )?;
        let max_in_flight = at_least(
            "MAX_IN_FLIGHT_READS",
            parse_var(&lookup, "MAX_IN_FLIGHT_READS", 8usize)?,
            1,
        )?;

        Ok(PainterConfig {
            device,
            range,
            sampler: SamplerSettings {
                interval: Duration::from_millis(interval_ms),
                max_in_flight,
            },
            brush: parse_var(&lookup, "PAINTER_BRUSH", Brush::default())?,
            connect_attempts: at_least(
                "CONNECT_ATTEMPTS",
                parse_var(&lookup, "CONNECT_ATTEMPTS", 10u32)?,
                1,
            )?,
            reconnect_delay: Duration::from_secs(parse_var(
                &lookup,
                "RECONNECT_DELAY_SECS",
                5u64,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<PainterConfig, PainterError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PainterConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.device, None);
        assert_eq!(config.range, SignalRange::new(1, 15).unwrap());
        assert_eq!(config.sampler, SamplerSettings::default());
        assert_eq!(config.brush, Brush::Dots);
        assert_eq!(config.connect_attempts, 10);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn values_are_read_from_the_lookup() {
        let config = config_from(&[
            ("PAINTER_DEVICE", " Headset "),
            ("RSSI_NEAR_BOUND", "40"),
            ("RSSI_FAR_BOUND", "90"),
            ("SAMPLE_INTERVAL_MS", "20"),
            ("PAINTER_BRUSH", "bar"),
        ])
        .unwrap();
        assert_eq!(config.device.as_deref(), Some("Headset"));
        assert_eq!(config.range, SignalRange::new(40, 90).unwrap());
        assert_eq!(config.sampler.interval, Duration::from_millis(20));
        assert_eq!(config.brush, Brush::Bar);
    }

    #[test]
    fn equal_bounds_are_a_configuration_error() {
        let result = config_from(&[("RSSI_NEAR_BOUND", "15")]);
        assert!(matches!(result, Err(PainterError::Config(_))));
    }

    #[test]
    fn garbage_and_zero_values_are_rejected() {
        assert!(config_from(&[("RSSI_FAR_BOUND", "far")]).is_err());
        assert!(config_from(&[("SAMPLE_INTERVAL_MS", "0")]).is_err());
        assert!(config_from(&[("MAX_IN_FLIGHT_READS", "0")]).is_err());
        assert!(config_from(&[("PAINTER_BRUSH", "spray")]).is_err());
    }

    #[test]
    fn bounds_beyond_the_rssi_byte_are_a_configuration_error() {
        let result = config_from(&[("RSSI_FAR_BOUND", "2147483647")]);
        assert!(matches!(result, Err(PainterError::Config(_))));
        assert!(config_from(&[("RSSI_NEAR_BOUND", "-3")]).is_err());
        assert!(config_from(&[("RSSI_FAR_BOUND", "127")]).is_ok());
    }

    #[test]
    fn log_file_defaults_unless_set() {
        assert_eq!(log_file_path(|_| None), PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(log_file_path(|_| Some("  ".into())), PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(
            log_file_path(|_| Some("/tmp/painter.log".into())),
            PathBuf::from("/tmp/painter.log")
        );
    }
}
