//! Compiles attribute constraints into a cell predicate and a map-style
//! filter expression for the rendering layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::attrs::{AttrKind, AttrValue, Attribute};
use crate::grid::HexCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==", alias = "eq")]
    Eq,
    #[serde(rename = "!=", alias = "ne")]
    Ne,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = ">=", alias = "ge")]
    Ge,
    #[serde(rename = "<=", alias = "le")]
    Le,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }

    fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
            Operator::Gt => lhs > rhs,
            Operator::Lt => lhs < rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Le => lhs <= rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" | "eq" => Ok(Operator::Eq),
            "!=" | "ne" => Ok(Operator::Ne),
            ">" | "gt" => Ok(Operator::Gt),
            "<" | "lt" => Ok(Operator::Lt),
            ">=" | "ge" => Ok(Operator::Ge),
            "<=" | "le" => Ok(Operator::Le),
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Number(f64),
    Text(String),
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Number(value) => write!(f, "{value}"),
            Threshold::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(alias = "var", alias = "col")]
    pub attribute: String,
    #[serde(alias = "op")]
    pub operator: Operator,
    #[serde(alias = "val")]
    pub threshold: Threshold,
}

impl Constraint {
    pub fn new(attribute: &str, operator: Operator, threshold: Threshold) -> Self {
        Self {
            attribute: attribute.to_string(),
            operator,
            threshold,
        }
    }
}

/// Constraints ANDed together.
pub type FilterSpec = Vec<Constraint>;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("filter references unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),
    #[error("attribute '{attribute}' is numeric but threshold '{threshold}' is not a number")]
    NonNumericThreshold { attribute: String, threshold: String },
    #[error("attribute '{attribute}' is categorical and only supports == and !=, not {operator}")]
    UnsupportedOperator { attribute: String, operator: Operator },
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Numeric {
        attribute: Attribute,
        operator: Operator,
        value: f64,
    },
    Category {
        attribute: Attribute,
        equal: bool,
        value: String,
    },
}

impl Clause {
    fn matches(&self, cell: &HexCell) -> bool {
        match self {
            Clause::Numeric {
                attribute,
                operator,
                value,
            } => match cell.attr(*attribute) {
                AttrValue::Number(actual) => operator.compare(actual, *value),
                AttrValue::Category(_) => false,
            },
            Clause::Category {
                attribute,
                equal,
                value,
            } => match cell.attr(*attribute) {
                AttrValue::Category(actual) => (actual == value) == *equal,
                AttrValue::Number(_) => false,
            },
        }
    }

    fn expression(&self) -> Value {
        match self {
            Clause::Numeric {
                attribute,
                operator,
                value,
            } => json!([operator.symbol(), ["get", attribute.name()], value]),
            Clause::Category {
                attribute,
                equal,
                value,
            } => {
                let op = if *equal { "==" } else { "!=" };
                json!([op, ["get", attribute.name()], value])
            }
        }
    }
}

/// A validated filter. An empty filter admits every cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, cell: &HexCell) -> bool {
        self.clauses.iter().all(|clause| clause.matches(cell))
    }

    pub fn predicate(&self) -> impl Fn(&HexCell) -> bool + '_ {
        move |cell| self.matches(cell)
    }

    /// `["all", [op, ["get", attr], threshold], ...]`
    pub fn to_expression(&self) -> Value {
        let mut expression = vec![json!("all")];
        expression.extend(self.clauses.iter().map(Clause::expression));
        Value::Array(expression)
    }
}

pub fn build(spec: &[Constraint]) -> Result<Filter, FilterError> {
    let clauses = spec.iter().map(compile).collect::<Result<Vec<_>, _>>()?;
    Ok(Filter { clauses })
}

fn compile(constraint: &Constraint) -> Result<Clause, FilterError> {
    let attribute: Attribute = constraint
        .attribute
        .parse()
        .map_err(|_| FilterError::UnknownAttribute(constraint.attribute.clone()))?;
    match attribute.kind() {
        AttrKind::Numeric => {
            let value = match &constraint.threshold {
                Threshold::Number(value) => Some(*value),
                Threshold::Text(text) => text.trim().parse::<f64>().ok(),
            }
            .filter(|value| !value.is_nan())
            .ok_or_else(|| FilterError::NonNumericThreshold {
                attribute: constraint.attribute.clone(),
                threshold: constraint.threshold.to_string(),
            })?;
            Ok(Clause::Numeric {
                attribute,
                operator: constraint.operator,
                value,
            })
        }
        AttrKind::Categorical => {
            let equal = match constraint.operator {
                Operator::Eq => true,
                Operator::Ne => false,
                operator => {
                    return Err(FilterError::UnsupportedOperator {
                        attribute: constraint.attribute.clone(),
                        operator,
                    })
                }
            };
            Ok(Clause::Category {
                attribute,
                equal,
                value: constraint.threshold.to_string(),
            })
        }
    }
}
