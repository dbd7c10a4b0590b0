//! TOML-based application configuration.
//!
//! Holds the calendar constants and texts of the experience, accessibility
//! overrides, and the geometry of the evasive control.
//!
//! Configuration is stored at `~/.config/portal14/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::decoy::{ClockFace, LOCKED_TIME};
use crate::error::{ConfigError, ValidationError};
use crate::evasion::{EvasionParams, EvasiveButton, Size};

/// Calendar constants and texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceConfig {
    /// Unlock instant, local wall time.
    #[serde(default = "default_target")]
    pub target: NaiveDateTime,
    /// Start of the relationship, local wall time.
    #[serde(default = "default_relationship_start")]
    pub relationship_start: NaiveDateTime,
    #[serde(default = "default_target_date_text")]
    pub target_date_text: String,
    #[serde(default = "default_target_date_display")]
    pub target_date_display: String,
    #[serde(default = "default_scan_name")]
    pub scan_name: String,
    #[serde(default = "default_location_text")]
    pub location_text: String,
    #[serde(default = "default_letter_text")]
    pub letter_text: String,
    /// Storage key of the accepted flag.
    #[serde(default = "default_accepted_key")]
    pub accepted_key: String,
    /// Clock face the loading decoy freezes to.
    #[serde(default = "default_locked_time")]
    pub locked_time: ClockFace,
}

/// Device signals. `None` means "ask the environment".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessibilityConfig {
    #[serde(default)]
    pub reduced_motion: Option<bool>,
    #[serde(default)]
    pub coarse_pointer: Option<bool>,
}

/// Evasive control geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvasionConfig {
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_push")]
    pub push: f64,
    #[serde(default = "default_padding")]
    pub padding: f64,
    #[serde(default = "default_zone_width")]
    pub zone_width: f64,
    #[serde(default = "default_zone_height")]
    pub zone_height: f64,
    #[serde(default = "default_control_width")]
    pub control_width: f64,
    #[serde(default = "default_control_height")]
    pub control_height: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/portal14/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub experience: ExperienceConfig,
    #[serde(default)]
    pub accessibility: AccessibilityConfig,
    #[serde(default)]
    pub evasion: EvasionConfig,
}

fn local_midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}
fn default_target() -> NaiveDateTime {
    local_midnight(2026, 2, 14)
}
fn default_relationship_start() -> NaiveDateTime {
    local_midnight(2023, 2, 14)
}
fn default_target_date_text() -> String {
    "14/02/2026".into()
}
fn default_target_date_display() -> String {
    "14 de Febrero".into()
}
fn default_locked_time() -> ClockFace {
    LOCKED_TIME
}
fn default_scan_name() -> String {
    "NICOLE REYES".into()
}
fn default_location_text() -> String {
    "COORDENADAS: 19.4326 N 99.1332 W".into()
}
fn default_letter_text() -> String {
    "Te invito a cruzar este portal. Una noche cuidada al detalle, una mesa reservada, \
     y una promesa: desconectar el mundo para mirarnos de verdad.\n\n\
     Si aceptas, la ubicacion se desbloquea. Si no, el sistema igual insiste en esperarte."
        .into()
}
fn default_accepted_key() -> String {
    "portal14Accepted".into()
}
fn default_radius() -> f64 {
    100.0
}
fn default_push() -> f64 {
    140.0
}
fn default_padding() -> f64 {
    6.0
}
fn default_zone_width() -> f64 {
    320.0
}
fn default_zone_height() -> f64 {
    200.0
}
fn default_control_width() -> f64 {
    96.0
}
fn default_control_height() -> f64 {
    44.0
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            relationship_start: default_relationship_start(),
            target_date_text: default_target_date_text(),
            target_date_display: default_target_date_display(),
            scan_name: default_scan_name(),
            location_text: default_location_text(),
            letter_text: default_letter_text(),
            accepted_key: default_accepted_key(),
            locked_time: default_locked_time(),
        }
    }
}

impl Default for EvasionConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            push: default_push(),
            padding: default_padding(),
            zone_width: default_zone_width(),
            zone_height: default_zone_height(),
            control_width: default_control_width(),
            control_height: default_control_height(),
        }
    }
}

impl EvasionConfig {
    pub fn params(&self) -> EvasionParams {
        EvasionParams {
            radius: self.radius,
            push: self.push,
            padding: self.padding,
        }
    }

    pub fn zone(&self) -> Size {
        Size::new(self.zone_width, self.zone_height)
    }

    pub fn control(&self) -> Size {
        Size::new(self.control_width, self.control_height)
    }

    /// Check that the geometry and tunables can build a control.
    pub fn validate(&self) -> Result<(), ValidationError> {
        EvasiveButton::centered(self.zone(), self.control(), self.params()).map(|_| ())
    }
}

/// Resolve a naive local wall time. Ambiguous times take the earlier
/// instant; times skipped by a DST jump are rejected.
fn resolve_local(field: &str, naive: NaiveDateTime) -> Result<DateTime<Utc>, ValidationError> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::InvalidInstant {
            field: field.to_string(),
            value: naive.to_string(),
        })
}

impl ExperienceConfig {
    /// Unlock instant in UTC.
    pub fn target_instant(&self) -> Result<DateTime<Utc>, ValidationError> {
        resolve_local("experience.target", self.target)
    }

    /// Relationship start in UTC.
    pub fn relationship_start_instant(&self) -> Result<DateTime<Utc>, ValidationError> {
        resolve_local("experience.relationship_start", self.relationship_start)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn parse_scalar(key: &str, value: &str) -> serde_json::Value {
        if let Ok(b) = value.parse::<bool>() {
            return serde_json::Value::Bool(b);
        }
        Self::parse_number(key, value).unwrap_or_else(|_| serde_json::Value::String(value.into()))
    }

    fn parse_number(key: &str, value: &str) -> Result<serde_json::Value, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as number"),
        };
        if let Ok(n) = value.parse::<u64>() {
            Ok(serde_json::Value::Number(n.into()))
        } else if let Ok(n) = value.parse::<f64>() {
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .ok_or_else(invalid)
        } else {
            Err(invalid())
        }
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => {
                        serde_json::Value::Bool(value.parse::<bool>().map_err(|e| {
                            ConfigError::InvalidValue {
                                key: key.to_string(),
                                message: e.to_string(),
                            }
                        })?)
                    }
                    serde_json::Value::Number(_) => Self::parse_number(key, value)?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: e.to_string(),
                        })?
                    }
                    serde_json::Value::Null => Self::parse_scalar(key, value),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.evasion.validate().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.experience.scan_name, "NICOLE REYES");
        assert_eq!(parsed.experience.target, cfg.experience.target);
        assert_eq!(parsed.evasion.radius, 100.0);
        assert!(parsed.accessibility.reduced_motion.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[experience]\nscan_name = \"ANA\"\n").unwrap();
        assert_eq!(parsed.experience.scan_name, "ANA");
        assert_eq!(parsed.experience.accepted_key, "portal14Accepted");
        assert_eq!(parsed.evasion.push, 140.0);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("evasion.padding").as_deref(), Some("6.0"));
        assert_eq!(cfg.get("experience.target").as_deref(), Some("2026-02-14T00:00:00"));
        assert!(cfg.get("experience.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("experience.scan_name", "ANA LUZ").unwrap();
        cfg.apply("evasion.radius", "80").unwrap();
        cfg.apply("experience.target", "2026-03-01T20:30:00").unwrap();
        assert_eq!(cfg.experience.scan_name, "ANA LUZ");
        assert_eq!(cfg.evasion.radius, 80.0);
        assert_eq!(cfg.experience.target, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(20, 30, 0).unwrap());
    }

    #[test]
    fn apply_fills_optional_override() {
        let mut cfg = Config::default();
        cfg.apply("accessibility.reduced_motion", "true").unwrap();
        assert_eq!(cfg.accessibility.reduced_motion, Some(true));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("evasion.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("evasion.radius", "far").is_err());
        assert!(cfg.apply("experience.target", "tomorrow").is_err());
    }

    #[test]
    fn apply_rejects_geometry_that_escapes_the_zone() {
        let mut cfg = Config::default();
        let err = cfg.apply("evasion.padding", "-50").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "evasion.padding"));
        assert_eq!(cfg.evasion.padding, 6.0);

        assert!(cfg.apply("evasion.push", "-1").is_err());
        assert!(cfg.apply("evasion.zone_width", "-320").is_err());
        cfg.apply("evasion.padding", "0").unwrap();
        assert_eq!(cfg.evasion.padding, 0.0);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.experience.target_date_text, "14/02/2026");
    }

    #[test]
    fn target_instant_resolves() {
        let cfg = Config::default();
        let start = cfg.experience.relationship_start_instant().unwrap();
        let target = cfg.experience.target_instant().unwrap();
        assert!(start < target);
    }
}
