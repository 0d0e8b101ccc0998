//! Provides the sense of a linear constraint row
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Relation between the left hand side of a constraint row and its right hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowSense {
    /// `a.x = b`
    Equal,
    /// `a.x <= b`
    LessOrEqual,
    /// `a.x >= b`
    GreaterOrEqual,
}

impl RowSense {
    /// Right hand side value that makes a row of this sense non-binding
    ///
    /// Equality rows can't be relaxed this way, so `None` is returned for them.
    pub fn relaxed_rhs(&self) -> Option<f64> {
        match self {
            RowSense::Equal => None,
            RowSense::LessOrEqual => Some(f64::INFINITY),
            RowSense::GreaterOrEqual => Some(f64::NEG_INFINITY),
        }
    }

    /// Whether a row with this sense and right hand side `rhs` can never bind
    pub fn is_disabled(&self, rhs: f64) -> bool {
        match self {
            RowSense::Equal => false,
            RowSense::LessOrEqual => rhs == f64::INFINITY,
            RowSense::GreaterOrEqual => rhs == f64::NEG_INFINITY,
        }
    }

    /// Check `lhs (sense) rhs` up to `tolerance`
    pub fn is_satisfied(&self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            RowSense::Equal => (lhs - rhs).abs() <= tolerance,
            RowSense::LessOrEqual => lhs <= rhs + tolerance,
            RowSense::GreaterOrEqual => lhs >= rhs - tolerance,
        }
    }
}

impl Display for RowSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSense::Equal => write!(f, "="),
            RowSense::LessOrEqual => write!(f, "<="),
            RowSense::GreaterOrEqual => write!(f, ">="),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_rows_never_bind() {
        let le = RowSense::LessOrEqual;
        let rhs = le.relaxed_rhs().unwrap();
        assert!(le.is_disabled(rhs));
        assert!(le.is_satisfied(1e300, rhs, 0.));
        let ge = RowSense::GreaterOrEqual;
        assert!(ge.is_satisfied(-1e300, ge.relaxed_rhs().unwrap(), 0.));
        assert!(RowSense::Equal.relaxed_rhs().is_none());
    }

    #[test]
    fn satisfied_within_tolerance() {
        assert!(RowSense::Equal.is_satisfied(1.0 + 1e-9, 1.0, 1e-7));
        assert!(!RowSense::Equal.is_satisfied(1.1, 1.0, 1e-7));
        assert!(RowSense::LessOrEqual.is_satisfied(0.5, 1.0, 0.));
        assert!(!RowSense::GreaterOrEqual.is_satisfied(0.5, 1.0, 1e-7));
    }
}
