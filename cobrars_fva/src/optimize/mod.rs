//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Struct representing the solution to an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables at the optimum, indexed like the problem's variables
    ///
    /// Some(Vec) if the problem could be solved, None otherwise
    pub variable_values: Option<Vec<f64>>,
}

impl ProblemSolution {
    /// Solution carrying only a status, for problems that could not be solved
    pub fn from_status(status: OptimizationStatus) -> Self {
        Self {
            status,
            objective_value: None,
            variable_values: None,
        }
    }

    /// Solution of a successfully solved problem
    pub fn optimal(objective_value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: OptimizationStatus::Optimal,
            objective_value: Some(objective_value),
            variable_values: Some(variable_values),
        }
    }

    /// Whether the values in this solution can be used
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal() && self.variable_values.is_some()
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// Problem has not yet attempted to be optimized
    Unoptimized,
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// An approximate solution has been found
    AlmostOptimal,
    /// A numerical error occurred during solving
    NumericalError,
    /// The solver hit the maximum allowed iterations, or max time, or made insufficient progress
    SolverHalted,
}

impl OptimizationStatus {
    /// Optimal, or close enough to optimal for the values to be used
    pub fn is_optimal(&self) -> bool {
        matches!(
            self,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        )
    }
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            OptimizationStatus::Unoptimized => "unoptimized",
            OptimizationStatus::Optimal => "optimal",
            OptimizationStatus::Unbounded => "unbounded",
            OptimizationStatus::Infeasible => "infeasible",
            OptimizationStatus::AlmostOptimal => "almost optimal",
            OptimizationStatus::NumericalError => "numerical error",
            OptimizationStatus::SolverHalted => "solver halted",
        };
        write!(f, "{}", status)
    }
}
