// Encoder configuration
//
// Settings arrive as integer lookups (`bitrate`, `preset`, `id3version`),
// either from a key/value source or from a JSON document with those keys.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EncoderError, Result};
use crate::tag::TagFormat;

/// Padding appended to ID3v2 tags unless configured otherwise.
pub const DEFAULT_ID3V2_PADDING: usize = 128;

/// Highest accepted bitrate index (320 kbps).
pub const MAX_BITRATE_INDEX: u8 = 6;

// LAME `preset_mode` values (lame.h).
pub const LAME_PRESET_STANDARD: i32 = 1001;
pub const LAME_PRESET_EXTREME: i32 = 1002;
pub const LAME_PRESET_MEDIUM: i32 = 1006;

/// Integer-valued configuration lookups.
pub trait SettingsSource {
    fn setting_int(&self, name: &str) -> Option<i64>;
}

impl SettingsSource for HashMap<String, i64> {
    fn setting_int(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

impl SettingsSource for serde_json::Value {
    fn setting_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(serde_json::Value::as_i64)
    }
}

/// LAME quality presets selectable instead of a fixed bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Medium,
    Standard,
    Extreme,
}

impl Preset {
    /// 0, 1 and 2 select a preset; anything else means explicit bitrate.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Preset::Medium),
            1 => Some(Preset::Standard),
            2 => Some(Preset::Extreme),
            _ => None,
        }
    }

    /// Value of LAME's `preset_mode` for this preset.
    pub fn lame_id(self) -> i32 {
        match self {
            Preset::Medium => LAME_PRESET_MEDIUM,
            Preset::Standard => LAME_PRESET_STANDARD,
            Preset::Extreme => LAME_PRESET_EXTREME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Constant bitrate step: kbps = 128 + 32 * index.
    pub bitrate_index: u8,
    /// Takes precedence over the bitrate when set.
    pub preset: Option<Preset>,
    pub tag_format: TagFormat,
    pub id3v2_padding: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        EncoderSettings {
            bitrate_index: 0,
            preset: None,
            tag_format: TagFormat::Legacy,
            id3v2_padding: DEFAULT_ID3V2_PADDING,
        }
    }
}

impl EncoderSettings {
    pub fn from_source<S: SettingsSource + ?Sized>(source: &S) -> Self {
        let mut settings = EncoderSettings::default();
        settings.apply(source);
        settings
    }

    /// Overlay whatever keys the source provides.
    pub fn apply<S: SettingsSource + ?Sized>(&mut self, source: &S) {
        if let Some(index) = source.setting_int("bitrate") {
            self.bitrate_index = index.clamp(0, MAX_BITRATE_INDEX as i64) as u8;
        }
        if let Some(index) = source.setting_int("preset") {
            self.preset = Preset::from_index(index);
        }
        if let Some(version) = source.setting_int("id3version") {
            self.tag_format = TagFormat::from_version(version);
        }
        if let Some(padding) = source.setting_int("id3v2padding") {
            self.id3v2_padding = padding.max(0) as usize;
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(EncoderError::Settings("expected a JSON object".into()));
        }
        Ok(Self::from_source(&value))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn bitrate_kbps(&self) -> u32 {
        128 + 32 * self.bitrate_index.min(MAX_BITRATE_INDEX) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_128k_legacy() {
        let settings = EncoderSettings::default();
        assert_eq!(settings.bitrate_kbps(), 128);
        assert_eq!(settings.preset, None);
        assert_eq!(settings.tag_format, TagFormat::Legacy);
    }

    #[test]
    fn map_source() {
        let map: HashMap<String, i64> = [
            ("bitrate".to_string(), 2),
            ("preset".to_string(), -1),
            ("id3version".to_string(), 2),
        ]
        .into_iter()
        .collect();

        let settings = EncoderSettings::from_source(&map);
        assert_eq!(settings.bitrate_kbps(), 192);
        assert_eq!(settings.preset, None);
        assert_eq!(settings.tag_format, TagFormat::Extended);
    }

    #[test]
    fn json_source_with_preset() {
        let json = r#"{"bitrate": 40, "preset": 2, "id3version": 1}"#;
        let settings = EncoderSettings::from_json_str(json).unwrap();
        assert_eq!(settings.bitrate_kbps(), 320);
        assert_eq!(settings.preset, Some(Preset::Extreme));
    }

    #[test]
    fn presets_map_to_lame_modes() {
        assert_eq!(Preset::from_index(0).unwrap().lame_id(), 1006);
        assert_eq!(Preset::from_index(1).unwrap().lame_id(), 1001);
        assert_eq!(Preset::from_index(2).unwrap().lame_id(), 1002);
        assert_eq!(Preset::Medium.lame_id(), LAME_PRESET_MEDIUM);
        assert_eq!(Preset::from_index(3), None);
    }

    #[test]
    fn json_must_be_an_object() {
        assert!(matches!(
            EncoderSettings::from_json_str("[1, 2]"),
            Err(EncoderError::Settings(_))
        ));
        assert!(EncoderSettings::from_json_str("{not json").is_err());
    }
}
