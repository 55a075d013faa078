use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{Bounds, DisplayRegion, Error, Rotation, distance::DEFAULT_THRESHOLD};

pub const CONFIG_ENV: &str = "SAFESPACE_CONFIG";
pub const LOCAL_CONFIG: &str = "./safespace.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Only samples for this tag are applied.
    pub target_tag: String,
    pub serial: SerialConfig,
    pub anchors: Bounds,
    /// Inset of the safespace from the anchor rectangle, in meters.
    pub safe_margin: f64,
    /// Moves at or below this many meters do not count towards distance.
    pub distance_threshold: f64,
    pub map: MapConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub region: DisplayRegion,
    /// Padding added past the far anchors, in meters.
    pub margin: f64,
    pub rotation: Rotation,
    pub trail_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_tag: "91B2".to_string(),
            serial: SerialConfig::default(),
            anchors: Bounds::default(),
            safe_margin: 1.0,
            distance_threshold: DEFAULT_THRESHOLD,
            map: MapConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115200,
            timeout_ms: 1000,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            region: DisplayRegion::default(),
            margin: 1.0,
            rotation: Rotation::Deg0,
            trail_capacity: 512,
        }
    }
}

#[cfg(target_os = "windows")]
fn default_port() -> &'static str {
    "COM9"
}

#[cfg(not(target_os = "windows"))]
fn default_port() -> &'static str {
    "/dev/ttyUSB0"
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the first config found at `path`, `$SAFESPACE_CONFIG` or
    /// `./safespace.toml`, falling back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_from(path, env.as_deref(), Path::new(LOCAL_CONFIG))
    }

    /// An explicit `path` must exist; the other candidates are skipped when
    /// missing.
    pub fn load_from(path: Option<&Path>, env: Option<&Path>, local: &Path) -> Result<Self, Error> {
        if let Some(path) = path {
            let s = std::fs::read_to_string(path)?;
            tracing::debug!(path = %path.display(), "loaded config");
            return Self::from_toml(&s);
        }
        for candidate in env.into_iter().chain([local]) {
            let Ok(s) = std::fs::read_to_string(candidate) else {
                continue;
            };
            tracing::debug!(path = %candidate.display(), "loaded config");
            return Self::from_toml(&s);
        }
        tracing::debug!("no config file found, using defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.target_tag.trim().is_empty() {
            return Err(Error::InvalidConfig("target_tag must not be empty".into()));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::InvalidConfig("baud_rate must be positive".into()));
        }
        if self.serial.timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeout_ms must be positive".into()));
        }
        self.anchors.validate("anchors")?;
        if !self.safe_margin.is_finite() || self.safe_margin < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "safe_margin must be a non-negative number, got {}",
                self.safe_margin
            )));
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "distance_threshold must be positive, got {}",
                self.distance_threshold
            )));
        }
        // the zone and the mapper check the remaining invariants on construction
        crate::Zone::inset("Safespace", &self.anchors, self.safe_margin)?;
        crate::CoordinateMapper::new(
            &self.anchors,
            self.map.margin,
            self.map.region,
            self.map.rotation,
        )?;
        Ok(())
    }
}
