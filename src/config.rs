use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::frame::Vec3;
use crate::identity::{CapacityError, DEFAULT_FINGERS_PER_HAND, IdentityTracker};
use crate::mapper::{BoundingVolume, Calibration, CoordinateMapper};
use crate::translator::DEFAULT_VELOCITY_SCALE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot locate home directory")]
    NoHome,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("output.host must not be empty")]
    EmptyHost,
    #[error("output.port must be non-zero")]
    ZeroPort,
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error("tracking.velocity_scale must be a positive finite number, got {0}")]
    VelocityScale(f32),
    #[error("calibration.{0} must be finite")]
    NonFiniteBound(&'static str),
    #[error("calibration.min must not exceed calibration.max on the {0} axis")]
    InvertedBound(&'static str),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Output {
    pub host: String,
    pub port: u16,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3333,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Tracking {
    pub fingers_per_hand: i32,
    pub velocity_scale: f32,
}

impl Default for Tracking {
    fn default() -> Self {
        Self {
            fingers_per_hand: DEFAULT_FINGERS_PER_HAND,
            velocity_scale: DEFAULT_VELOCITY_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    Fixed,
    Adaptive,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationSettings {
    pub mode: CalibrationMode,
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::Fixed,
            min: [-180.0, 100.0, -350.0],
            max: [180.0, 450.0, 100.0],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub output: Output,
    pub tracking: Tracking,
    pub calibration: CalibrationSettings,
}

impl Settings {
    pub fn parse(txt: &str, path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(txt).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let txt = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&txt, path)
    }

    /// Load `path`, or the user config (installing the default file on first use).
    pub fn load_or_install_default(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = default_config_path()?;
                install_default(&p)?;
                p
            }
        };
        Ok((Self::load(&path)?, path))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.output.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        IdentityTracker::new(self.tracking.fingers_per_hand)?;
        let scale = self.tracking.velocity_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ConfigError::VelocityScale(scale));
        }

        if self.calibration.mode == CalibrationMode::Fixed {
            let c = &self.calibration;
            for (i, axis) in ["x", "y", "z"].into_iter().enumerate() {
                if !c.min[i].is_finite() {
                    return Err(ConfigError::NonFiniteBound("min"));
                }
                if !c.max[i].is_finite() {
                    return Err(ConfigError::NonFiniteBound("max"));
                }
                if c.min[i] > c.max[i] {
                    return Err(ConfigError::InvertedBound(axis));
                }
            }
        }
        Ok(())
    }

    pub fn calibration(&self) -> Calibration {
        match self.calibration.mode {
            CalibrationMode::Fixed => Calibration::Fixed(BoundingVolume::new(
                Vec3::from(self.calibration.min),
                Vec3::from(self.calibration.max),
            )),
            CalibrationMode::Adaptive => Calibration::Adaptive,
        }
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.calibration())
    }

    pub fn identity(&self) -> Result<IdentityTracker, ConfigError> {
        Ok(IdentityTracker::new(self.tracking.fingers_per_hand)?)
    }
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = UserDirs::new().ok_or(ConfigError::NoHome)?;
    Ok(home.home_dir().join(".config").join("leaptuio"))
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

fn default_config_text() -> &'static str {
    include_str!("../config/default.toml")
}

fn install_default(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, default_config_text()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("installed default config at {}", path.display());
    Ok(())
}
