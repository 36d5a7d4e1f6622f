//! Model parameters: declared bounds from configuration plus current values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One slider as declared in the model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    #[serde(rename = "col")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "val")]
    pub default: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Parameter {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl Parameter {
    pub fn clamped(&self) -> f64 {
        self.value.clamp(self.min, self.max)
    }
}

/// Current parameter values, keyed by id. Values outside the declared
/// bounds are stored as given; readers that need bounded input use
/// [`ParameterSet::clamped`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterSet {
    entries: BTreeMap<String, Parameter>,
}

impl ParameterSet {
    pub fn from_defs(defs: &[ParameterDef]) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for def in defs {
            if !def.min.is_finite() || !def.max.is_finite() || def.min > def.max {
                return Err(ConfigError::InvalidBounds {
                    id: def.id.clone(),
                    min: def.min,
                    max: def.max,
                });
            }
            if !def.default.is_finite() {
                return Err(ConfigError::NonFiniteValue { id: def.id.clone() });
            }
            let parameter = Parameter {
                value: def.default,
                min: def.min,
                max: def.max,
            };
            if entries.insert(def.id.clone(), parameter).is_some() {
                return Err(ConfigError::DuplicateParameter(def.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parameter(&self, id: &str) -> Result<&Parameter, ConfigError> {
        self.entries
            .get(id)
            .ok_or_else(|| ConfigError::UnknownParameter(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Result<f64, ConfigError> {
        self.parameter(id).map(|p| p.value)
    }

    pub fn clamped(&self, id: &str) -> Result<f64, ConfigError> {
        self.parameter(id).map(Parameter::clamped)
    }

    /// Sets a value; out-of-bounds values are accepted.
    pub fn set(&mut self, id: &str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteValue { id: id.to_string() });
        }
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ConfigError::UnknownParameter(id.to_string()))?;
        entry.value = value;
        Ok(())
    }

    /// Applies several values atomically: nothing changes if any is rejected.
    pub fn set_all<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<(), ConfigError> {
        let mut next = self.clone();
        for (id, value) in values {
            next.set(id, value)?;
        }
        *self = next;
        Ok(())
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(id, p)| (id.as_str(), p.value))
    }
}

/// Parses a `id=value` assignment as given on the command line.
pub fn parse_assignment(text: &str) -> Result<(String, f64), ConfigError> {
    let (id, value) = text
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidAssignment(text.to_string()))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidAssignment(text.to_string()))?;
    Ok((id.trim().to_string(), value))
}
