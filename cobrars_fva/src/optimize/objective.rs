//! Provides the sense of an optimization problem's objective
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

impl ObjectiveSense {
    /// +1 for maximization, -1 for minimization
    ///
    /// Multiplying an objective coefficient by this gives the direction the optimizer pushes
    /// the corresponding variable in.
    pub fn sign(&self) -> f64 {
        match self {
            ObjectiveSense::Maximize => 1.,
            ObjectiveSense::Minimize => -1.,
        }
    }

    /// The other sense
    pub fn opposite(&self) -> Self {
        match self {
            ObjectiveSense::Maximize => ObjectiveSense::Minimize,
            ObjectiveSense::Minimize => ObjectiveSense::Maximize,
        }
    }
}

impl Default for ObjectiveSense {
    fn default() -> Self {
        ObjectiveSense::Maximize
    }
}

impl Display for ObjectiveSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveSense::Minimize => write!(f, "min"),
            ObjectiveSense::Maximize => write!(f, "max"),
        }
    }
}

/// Error when parsing an objective sense from a string
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown objective sense '{0}', expected 'max' or 'min'")]
pub struct ParseSenseError(String);

impl FromStr for ObjectiveSense {
    type Err = ParseSenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max" | "maximize" | "maximise" => Ok(ObjectiveSense::Maximize),
            "min" | "minimize" | "minimise" => Ok(ObjectiveSense::Minimize),
            _ => Err(ParseSenseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sense() {
        assert_eq!("max".parse::<ObjectiveSense>().unwrap(), ObjectiveSense::Maximize);
        assert_eq!("Min".parse::<ObjectiveSense>().unwrap(), ObjectiveSense::Minimize);
        assert!("sideways".parse::<ObjectiveSense>().is_err());
    }

    #[test]
    fn sign_and_opposite() {
        assert_eq!(ObjectiveSense::Maximize.sign(), 1.);
        assert_eq!(ObjectiveSense::Minimize.sign(), -1.);
        assert_eq!(ObjectiveSense::Maximize.opposite(), ObjectiveSense::Minimize);
        assert_eq!(format!("{}", ObjectiveSense::Minimize), "min");
    }
}
