//! Module providing the types of variables an optimization problem can hold
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported for all solvers, currently Clarabel only supports
/// Continuous variables, while microlp supports all types
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq, Serialize, Deserialize)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl VariableType {
    /// Whether the variable is restricted to integral values
    pub fn is_integral(&self) -> bool {
        !matches!(self, VariableType::Continuous)
    }
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
