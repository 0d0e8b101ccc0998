//! Solver interface for the microlp simplex and branch and bound solver
use ::microlp::{ComparisonOp, Error, OptimizationDirection, Problem, Variable};
use log::debug;

use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{LinearProblem, ProblemType};
use crate::optimize::solvers::{BasicSolver, LinearSolver, MixedIntegerSolver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Tolerance used when checking rows without any terms
const EMPTY_ROW_TOLERANCE: f64 = 1e-9;

/// Linear and mixed integer backend built on microlp
///
/// microlp always starts from scratch, so warm start hints are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    fn solve(&self, problem: &LinearProblem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.objective_sense() {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut lp = Problem::new(direction);

        let variables: Vec<Variable> = problem
            .objective()
            .iter()
            .zip(problem.lower_bounds().iter().zip(problem.upper_bounds()))
            .zip(problem.variable_types())
            .map(|((&c, (&lb, &ub)), variable_type)| {
                if variable_type.is_integral() {
                    lp.add_integer_var(c, (integer_bound(lb.ceil()), integer_bound(ub.floor())))
                } else {
                    lp.add_var(c, (lb, ub))
                }
            })
            .collect();

        for (row, (&sense, &rhs)) in problem.row_senses().iter().zip(problem.rhs()).enumerate() {
            // Relaxed rows are simply left out
            if sense.is_disabled(rhs) {
                continue;
            }
            if !rhs.is_finite() {
                debug!("Row {} can never be satisfied ({} {})", row, sense, rhs);
                return Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible));
            }
            let terms = problem.matrix().row(row);
            if terms.nnz() == 0 {
                if sense.is_satisfied(0., rhs, EMPTY_ROW_TOLERANCE) {
                    continue;
                }
                return Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible));
            }
            let expression: Vec<(Variable, f64)> = terms
                .col_indices()
                .iter()
                .zip(terms.values())
                .map(|(&var, &coef)| (variables[var], coef))
                .collect();
            let op = match sense {
                RowSense::Equal => ComparisonOp::Eq,
                RowSense::LessOrEqual => ComparisonOp::Le,
                RowSense::GreaterOrEqual => ComparisonOp::Ge,
            };
            lp.add_constraint(expression, op, rhs);
        }

        match lp.solve() {
            Ok(solution) => {
                let values: Vec<f64> = variables.iter().map(|var| solution[*var]).collect();
                let objective = problem.objective_value(&values);
                Ok(ProblemSolution::optimal(objective, values))
            }
            Err(Error::Infeasible) => Ok(ProblemSolution::from_status(
                OptimizationStatus::Infeasible,
            )),
            Err(Error::Unbounded) => Ok(ProblemSolution::from_status(
                OptimizationStatus::Unbounded,
            )),
            Err(error) => Err(SolverError::Backend(error.to_string())),
        }
    }
}

/// Clamp a bound into the range of integer bounds microlp accepts
fn integer_bound(bound: f64) -> i32 {
    bound.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

impl BasicSolver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }
}

impl LinearSolver for MicrolpSolver {
    fn solve_lp(&self, problem: &LinearProblem) -> Result<ProblemSolution, SolverError> {
        if problem.has_integer_variables() {
            return Err(SolverError::UnsupportedProblemType {
                solver: "microlp (linear)",
                problem_type: ProblemType::LinearMixedInteger,
            });
        }
        self.solve(problem)
    }
}

impl MixedIntegerSolver for MicrolpSolver {
    fn solve_milp(&self, problem: &LinearProblem) -> Result<ProblemSolution, SolverError> {
        self.solve(problem)
    }
}
