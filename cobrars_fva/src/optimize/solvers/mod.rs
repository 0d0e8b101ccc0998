//! Solver backends, and the traits the analysis code uses to talk to them
//!
//! Analysis code only ever sees the [`LinearSolver`], [`MixedIntegerSolver`] and
//! [`QuadraticSolver`] traits. The concrete backend for each class of problem is picked from
//! a [`Configuration`](crate::configuration::Configuration) through [`linear_solver`],
//! [`mixed_integer_solver`] and [`quadratic_solver`].
#[cfg(feature = "minilp")]
pub mod microlp;

pub mod clarabel;

use thiserror::Error;

use crate::configuration::Solver;
use crate::optimize::problem::{LinearProblem, ProblemType, QuadraticProblem};
use crate::optimize::ProblemSolution;

/// Functionality shared by every solver backend
pub trait BasicSolver: Send + Sync {
    /// Name of the backend, used in log messages
    fn name(&self) -> &'static str;
}

/// A backend able to solve continuous linear programs
pub trait LinearSolver: BasicSolver {
    /// Solve a linear program, the problem must not contain integer variables
    fn solve_lp(&self, problem: &LinearProblem) -> Result<ProblemSolution, SolverError>;
}

/// A backend able to solve mixed integer linear programs
pub trait MixedIntegerSolver: BasicSolver {
    /// Solve a linear program in which some variables are integer or binary
    fn solve_milp(&self, problem: &LinearProblem) -> Result<ProblemSolution, SolverError>;
}

/// A backend able to solve convex quadratic programs
pub trait QuadraticSolver: BasicSolver {
    /// Solve a quadratic program
    fn solve_qp(&self, problem: &QuadraticProblem) -> Result<ProblemSolution, SolverError>;
}

/// Create the linear program backend `solver`
pub fn linear_solver(solver: Solver) -> Result<Box<dyn LinearSolver>, SolverError> {
    match solver {
        Solver::Clarabel => Ok(Box::new(self::clarabel::ClarabelSolver::default())),
        Solver::Microlp => microlp_linear(),
    }
}

/// Create the mixed integer program backend `solver`
pub fn mixed_integer_solver(solver: Solver) -> Result<Box<dyn MixedIntegerSolver>, SolverError> {
    match solver {
        Solver::Clarabel => Err(SolverError::UnsupportedProblemType {
            solver: "clarabel",
            problem_type: ProblemType::LinearMixedInteger,
        }),
        Solver::Microlp => microlp_mixed_integer(),
    }
}

/// Create the quadratic program backend `solver`
pub fn quadratic_solver(solver: Solver) -> Result<Box<dyn QuadraticSolver>, SolverError> {
    match solver {
        Solver::Clarabel => Ok(Box::new(self::clarabel::ClarabelSolver::default())),
        Solver::Microlp => Err(SolverError::UnsupportedProblemType {
            solver: "microlp",
            problem_type: ProblemType::QuadraticContinuous,
        }),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "minilp")] {
        fn microlp_linear() -> Result<Box<dyn LinearSolver>, SolverError> {
            Ok(Box::new(self::microlp::MicrolpSolver))
        }

        fn microlp_mixed_integer() -> Result<Box<dyn MixedIntegerSolver>, SolverError> {
            Ok(Box::new(self::microlp::MicrolpSolver))
        }
    } else {
        fn microlp_linear() -> Result<Box<dyn LinearSolver>, SolverError> {
            Err(SolverError::BackendUnavailable("microlp (enable the minilp feature)"))
        }

        fn microlp_mixed_integer() -> Result<Box<dyn MixedIntegerSolver>, SolverError> {
            Err(SolverError::BackendUnavailable("microlp (enable the minilp feature)"))
        }
    }
}

/// Errors raised by solver backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The selected backend can't solve this class of problem
    #[error("The {solver} backend can't solve {problem_type:?} problems")]
    UnsupportedProblemType {
        /// Name of the backend
        solver: &'static str,
        /// Class of problem that was attempted
        problem_type: ProblemType,
    },
    /// The selected backend wasn't compiled in
    #[error("Solver backend {0} is not available")]
    BackendUnavailable(&'static str),
    /// The backend failed internally
    #[error("Solver backend failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_capabilities() {
        assert!(linear_solver(Solver::Clarabel).is_ok());
        assert!(quadratic_solver(Solver::Clarabel).is_ok());
        assert!(matches!(
            mixed_integer_solver(Solver::Clarabel),
            Err(SolverError::UnsupportedProblemType { .. })
        ));
        assert!(matches!(
            quadratic_solver(Solver::Microlp),
            Err(SolverError::UnsupportedProblemType { .. })
        ));
    }

    #[cfg(feature = "minilp")]
    #[test]
    fn microlp_is_available() {
        assert_eq!(linear_solver(Solver::Microlp).unwrap().name(), "microlp");
        assert_eq!(mixed_integer_solver(Solver::Microlp).unwrap().name(), "microlp");
    }
}
