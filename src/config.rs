//! Model configuration: parameter sliders, display attributes, drawable
//! infrastructure and engine tunables, loaded from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attrs::{AttrKind, Attribute};
use crate::engine::EngineSettings;
use crate::filter::{self, FilterError, FilterSpec};
use crate::geometry::LonLat;
use crate::grid::InfraKind;
use crate::params::{ParameterDef, ParameterSet};
use crate::propagate::DEFAULT_HOP_KM;
use crate::sampler::{DEFAULT_INTERVAL_KM, MIN_INTERVAL_KM};

pub const BUILTIN_FISH_MODEL: &str = include_str!("../models/fish.yaml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    #[error("unknown infrastructure type '{0}'")]
    UnknownInfra(String),
    #[error("parameter '{0}' defined more than once")]
    DuplicateParameter(String),
    #[error("infrastructure type '{0}' defined more than once")]
    DuplicateInfra(String),
    #[error("parameter '{id}' has invalid bounds [{min}, {max}]")]
    InvalidBounds { id: String, min: f64, max: f64 },
    #[error("parameter '{id}' must be a finite number")]
    NonFiniteValue { id: String },
    #[error("expected id=value, got '{0}'")]
    InvalidAssignment(String),
    #[error("attribute '{col}': {reason}")]
    InvalidAttr { col: String, reason: String },
    #[error("sampling: {0}")]
    InvalidSampling(String),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("model configuration parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocConfig {
    pub center: [f64; 2],
    pub zoom: f64,
}

impl LocConfig {
    pub fn center(&self) -> LonLat {
        self.center.into()
    }
}

/// Display metadata for one attribute: a numeric range or a category list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttrConfig {
    pub col: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, rename = "minCol", skip_serializing_if = "Option::is_none")]
    pub min_col: Option<String>,
    #[serde(default, rename = "maxCol", skip_serializing_if = "Option::is_none")]
    pub max_col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cats: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
}

impl AttrConfig {
    pub fn attribute(&self) -> Result<Attribute, ConfigError> {
        self.col.parse()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAttr {
            col: self.col.clone(),
            reason: reason.to_string(),
        };
        match self.attribute()?.kind() {
            AttrKind::Numeric => {
                if self.cats.is_some() {
                    return Err(invalid("numeric attribute cannot list categories"));
                }
                if let (Some(min), Some(max)) = (self.min, self.max) {
                    if !(min <= max) {
                        return Err(invalid("min must not exceed max"));
                    }
                }
            }
            AttrKind::Categorical => {
                if self.cats.as_ref().map_or(true, Vec::is_empty) {
                    return Err(invalid("categorical attribute needs a non-empty 'cats' list"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraConfig {
    pub col: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_infra_type")]
    pub geometry: String,
    #[serde(default)]
    pub color: String,
}

fn default_infra_type() -> String {
    "line".to_string()
}

impl InfraConfig {
    pub fn kind(&self) -> Result<InfraKind, ConfigError> {
        self.col.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_km")]
    pub interval_km: f64,
    #[serde(default = "default_hop_km")]
    pub hop_km: f64,
}

fn default_interval_km() -> f64 {
    DEFAULT_INTERVAL_KM
}

fn default_hop_km() -> f64 {
    DEFAULT_HOP_KM
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_km: default_interval_km(),
            hop_km: default_hop_km(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<LocConfig>,
    pub pars: Vec<ParameterDef>,
    #[serde(default)]
    pub attrs: Vec<AttrConfig>,
    #[serde(default)]
    pub infra: Vec<InfraConfig>,
    #[serde(default)]
    pub filters: FilterSpec,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ModelConfig {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_FISH_MODEL)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ParameterSet::from_defs(&self.pars)?;
        for attr in &self.attrs {
            attr.validate()?;
        }
        let mut kinds = Vec::new();
        for infra in &self.infra {
            let kind = infra.kind()?;
            if kinds.contains(&kind) {
                return Err(ConfigError::DuplicateInfra(infra.col.clone()));
            }
            kinds.push(kind);
        }
        filter::build(&self.filters)?;
        let SamplingConfig {
            interval_km,
            hop_km,
        } = self.sampling;
        if !(interval_km >= MIN_INTERVAL_KM && interval_km.is_finite()) {
            return Err(ConfigError::InvalidSampling(format!(
                "interval_km must be at least {MIN_INTERVAL_KM}, got {interval_km}"
            )));
        }
        if !(hop_km > 0.0 && hop_km.is_finite()) {
            return Err(ConfigError::InvalidSampling(format!(
                "hop_km must be positive, got {hop_km}"
            )));
        }
        Ok(())
    }

    pub fn parameter_set(&self) -> Result<ParameterSet, ConfigError> {
        ParameterSet::from_defs(&self.pars)
    }

    pub fn infra_kinds(&self) -> Result<Vec<InfraKind>, ConfigError> {
        self.infra.iter().map(InfraConfig::kind).collect()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            sample_interval_km: self.sampling.interval_km,
            hop_km: self.sampling.hop_km,
        }
    }
}

/// One line of a drawing file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    pub kind: InfraKind,
    pub points: Vec<LonLat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Drawing {
    #[serde(default)]
    pub lines: Vec<LineSpec>,
}

/// Resolves configuration files relative to a base directory.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn read(&self, file: impl AsRef<Path>) -> Result<(PathBuf, String)> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok((path, data))
    }

    pub fn load_model(&self, file: impl AsRef<Path>) -> Result<ModelConfig> {
        let (path, data) = self.read(file)?;
        let config = ModelConfig::from_yaml_str(&data)
            .with_context(|| format!("Failed to parse model configuration {}", path.display()))?;
        tracing::info!(
            target: "hexsite::config",
            path = %path.display(),
            model = %config.name,
            parameters = config.pars.len(),
            "model_config.loaded=file"
        );
        Ok(config)
    }

    pub fn load_drawing(&self, file: impl AsRef<Path>) -> Result<Drawing> {
        let (path, data) = self.read(file)?;
        serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse drawing {}", path.display()))
    }

    pub fn load_filter(&self, file: impl AsRef<Path>) -> Result<FilterSpec> {
        let (path, data) = self.read(file)?;
        let spec: FilterSpec = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse filter {}", path.display()))?;
        filter::build(&spec).with_context(|| format!("Invalid filter in {}", path.display()))?;
        Ok(spec)
    }
}
