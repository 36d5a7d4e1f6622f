//! Typed registry of every per-cell attribute that configuration, filters
//! and snapshots may refer to by name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ConfigError;
use crate::grid::{HexCell, InfraKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrSource {
    Static,
    Distance,
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue<'a> {
    Number(f64),
    Category(&'a str),
}

impl AttrValue<'_> {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(value) => Some(*value),
            AttrValue::Category(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Adm1,
    Pop,
    Precip,
    LakeDist,
    WaterDist,
    GridDist,
    RoadDist,
    Tech,
    FishOutput,
    Revenue,
    Profit,
    GovCosts,
    GovAnnual,
    Social,
}

impl Attribute {
    pub const ALL: [Attribute; 14] = [
        Attribute::Adm1,
        Attribute::Pop,
        Attribute::Precip,
        Attribute::LakeDist,
        Attribute::WaterDist,
        Attribute::GridDist,
        Attribute::RoadDist,
        Attribute::Tech,
        Attribute::FishOutput,
        Attribute::Revenue,
        Attribute::Profit,
        Attribute::GovCosts,
        Attribute::GovAnnual,
        Attribute::Social,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Adm1 => "adm1",
            Attribute::Pop => "pop",
            Attribute::Precip => "precip",
            Attribute::LakeDist => "lake_dist",
            Attribute::WaterDist => "water_dist",
            Attribute::GridDist => "grid_dist",
            Attribute::RoadDist => "road_dist",
            Attribute::Tech => "tech",
            Attribute::FishOutput => "fish_output",
            Attribute::Revenue => "revenue",
            Attribute::Profit => "profit",
            Attribute::GovCosts => "gov_costs",
            Attribute::GovAnnual => "gov_annual",
            Attribute::Social => "social",
        }
    }

    pub fn kind(self) -> AttrKind {
        match self {
            Attribute::Adm1 | Attribute::Tech => AttrKind::Categorical,
            _ => AttrKind::Numeric,
        }
    }

    pub fn source(self) -> AttrSource {
        match self {
            Attribute::Adm1
            | Attribute::Pop
            | Attribute::Precip
            | Attribute::LakeDist
            | Attribute::WaterDist => AttrSource::Static,
            Attribute::GridDist | Attribute::RoadDist => AttrSource::Distance,
            _ => AttrSource::Derived,
        }
    }

    /// Infrastructure kind owning this attribute, for distance attributes.
    pub fn infra_kind(self) -> Option<InfraKind> {
        match self {
            Attribute::GridDist => Some(InfraKind::Grid),
            Attribute::RoadDist => Some(InfraKind::Road),
            _ => None,
        }
    }

    pub fn value(self, cell: &HexCell) -> AttrValue<'_> {
        let s = cell.static_attrs();
        let d = cell.derived();
        match self {
            Attribute::Adm1 => AttrValue::Category(&s.adm1),
            Attribute::Pop => AttrValue::Number(s.pop),
            Attribute::Precip => AttrValue::Number(s.precip),
            Attribute::LakeDist => AttrValue::Number(s.lake_dist),
            Attribute::WaterDist => AttrValue::Number(s.water_dist),
            Attribute::GridDist => AttrValue::Number(cell.distances().grid_dist),
            Attribute::RoadDist => AttrValue::Number(cell.distances().road_dist),
            Attribute::Tech => AttrValue::Category(d.tech.as_str()),
            Attribute::FishOutput => AttrValue::Number(d.fish_output),
            Attribute::Revenue => AttrValue::Number(d.revenue),
            Attribute::Profit => AttrValue::Number(d.profit),
            Attribute::GovCosts => AttrValue::Number(d.gov_costs),
            Attribute::GovAnnual => AttrValue::Number(d.gov_annual),
            Attribute::Social => AttrValue::Number(d.social),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == name)
            .ok_or_else(|| ConfigError::UnknownAttribute(name.to_string()))
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
