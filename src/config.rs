use crate::capture::{FacingMode, StreamConstraints};
use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SNAPSHOT_QUALITY: f32 = 0.8;

static INSTALLED: OnceCell<ChatConfig> = OnceCell::new();

#[derive(Clone, Debug, PartialEq)]
pub struct ChatConfig {
    /// How long the assistant "types" before a reply appears.
    pub reply_delay: Duration,
    pub camera: StreamConstraints,
    /// JPEG quality used when snapshotting a live frame.
    pub snapshot_quality: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            camera: StreamConstraints::default(),
            snapshot_quality: DEFAULT_SNAPSHOT_QUALITY,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let delay_ms = parse_var(&lookup, "CROPCARE_REPLY_DELAY_MS")?
            .unwrap_or(defaults.reply_delay.as_millis() as u64);
        let width = parse_var(&lookup, "CROPCARE_CAMERA_WIDTH")?
            .unwrap_or(defaults.camera.ideal_width);
        let height = parse_var(&lookup, "CROPCARE_CAMERA_HEIGHT")?
            .unwrap_or(defaults.camera.ideal_height);
        let quality = parse_var(&lookup, "CROPCARE_SNAPSHOT_QUALITY")?
            .unwrap_or(defaults.snapshot_quality);

        if !(quality > 0.0 && quality <= 1.0) {
            bail!("CROPCARE_SNAPSHOT_QUALITY must be in (0, 1], got {quality}");
        }
        if width == 0 || height == 0 {
            bail!("camera resolution must be non-zero, got {width}x{height}");
        }

        Ok(Self {
            reply_delay: Duration::from_millis(delay_ms),
            camera: StreamConstraints {
                facing: FacingMode::Environment,
                ideal_width: width,
                ideal_height: height,
            },
            snapshot_quality: quality,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        _ => Ok(None),
    }
}

/// Makes `config` the one the views read. Only the first call wins.
pub fn install(config: ChatConfig) {
    if INSTALLED.set(config).is_err() {
        tracing::warn!("chat config already installed; ignoring replacement");
    }
}

pub fn current() -> &'static ChatConfig {
    INSTALLED.get_or_init(ChatConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ChatConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ChatConfig::default());
        assert_eq!(config.reply_delay, Duration::from_millis(1500));
        assert_eq!(config.camera.ideal_width, 1280);
        assert_eq!(config.camera.ideal_height, 720);
        assert_eq!(config.camera.facing, FacingMode::Environment);
    }

    #[test]
    fn test_overrides() {
        let config = ChatConfig::from_lookup(lookup_from(&[
            ("CROPCARE_REPLY_DELAY_MS", "250"),
            ("CROPCARE_CAMERA_WIDTH", " 640 "),
            ("CROPCARE_SNAPSHOT_QUALITY", "0.5"),
        ]))
        .unwrap();
        assert_eq!(config.reply_delay, Duration::from_millis(250));
        assert_eq!(config.camera.ideal_width, 640);
        assert_eq!(config.camera.ideal_height, 720);
        assert_eq!(config.snapshot_quality, 0.5);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = ChatConfig::from_lookup(lookup_from(&[("CROPCARE_REPLY_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("CROPCARE_REPLY_DELAY_MS"));

        let err = ChatConfig::from_lookup(lookup_from(&[("CROPCARE_SNAPSHOT_QUALITY", "1.5")]))
            .unwrap_err();
        assert!(err.to_string().contains("(0, 1]"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            ChatConfig::from_lookup(lookup_from(&[("CROPCARE_CAMERA_HEIGHT", "  ")])).unwrap();
        assert_eq!(config.camera.ideal_height, 720);
    }
}
