//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min 1/2 x'Px + q'x` subject to `Ax + s = b`, `s` in a product of cones.
//! Equality rows (and fixed variables) go into a zero cone, every other row and finite
//! variable bound is written as `a.x <= b` and goes into the nonnegative cone.
use ::clarabel::algebra::CscMatrix;
use ::clarabel::solver::*;

use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{LinearProblem, ProblemType, QuadraticProblem};
use crate::optimize::solvers::{BasicSolver, LinearSolver, QuadraticSolver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Linear and quadratic backend built on Clarabel
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Print Clarabel's iteration log
    pub verbose: bool,
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self { verbose: false }
    }
}

/// Rows of the conic problem, before conversion to compressed column form
struct ConicRows {
    /// (row, column, value) triplets
    triplets: Vec<(usize, usize, f64)>,
    rhs: Vec<f64>,
}

impl ConicRows {
    fn new() -> Self {
        Self {
            triplets: Vec::new(),
            rhs: Vec::new(),
        }
    }

    fn push(&mut self, terms: impl Iterator<Item = (usize, f64)>, rhs: f64) {
        let row = self.rhs.len();
        self.triplets
            .extend(terms.map(|(col, value)| (row, col, value)));
        self.rhs.push(rhs);
    }

    fn len(&self) -> usize {
        self.rhs.len()
    }
}

impl ClarabelSolver {
    fn solve(
        &self,
        problem: &LinearProblem,
        quadratic: Option<&[f64]>,
    ) -> Result<ProblemSolution, SolverError> {
        if problem.has_integer_variables() {
            return Err(SolverError::UnsupportedProblemType {
                solver: "clarabel",
                problem_type: ProblemType::LinearMixedInteger,
            });
        }
        let n = problem.num_variables();
        let mut equalities = ConicRows::new();
        let mut inequalities = ConicRows::new();

        for (row, (&sense, &rhs)) in problem.row_senses().iter().zip(problem.rhs()).enumerate() {
            if sense.is_disabled(rhs) {
                continue;
            }
            if !rhs.is_finite() {
                return Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible));
            }
            let terms = problem.matrix().row(row);
            let pairs = terms
                .col_indices()
                .iter()
                .copied()
                .zip(terms.values().iter().copied());
            match sense {
                RowSense::Equal => equalities.push(pairs, rhs),
                RowSense::LessOrEqual => inequalities.push(pairs, rhs),
                RowSense::GreaterOrEqual => {
                    inequalities.push(pairs.map(|(col, value)| (col, -value)), -rhs)
                }
            }
        }
        for (col, (&lb, &ub)) in problem
            .lower_bounds()
            .iter()
            .zip(problem.upper_bounds())
            .enumerate()
        {
            if lb == ub {
                equalities.push(std::iter::once((col, 1.)), lb);
                continue;
            }
            if ub.is_finite() {
                inequalities.push(std::iter::once((col, 1.)), ub);
            }
            if lb.is_finite() {
                inequalities.push(std::iter::once((col, -1.)), -lb);
            }
        }

        let num_equalities = equalities.len();
        let num_rows = num_equalities + inequalities.len();
        let mut triplets = equalities.triplets;
        triplets.extend(
            inequalities
                .triplets
                .into_iter()
                .map(|(row, col, value)| (row + num_equalities, col, value)),
        );
        let mut b = equalities.rhs;
        b.extend(inequalities.rhs);
        let a = to_csc(num_rows, n, triplets);

        let p = match quadratic {
            Some(diagonal) => to_csc(
                n,
                n,
                diagonal
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| **q != 0.)
                    .map(|(j, q)| (j, j, *q))
                    .collect(),
            ),
            None => to_csc(n, n, Vec::new()),
        };
        // Clarabel only minimizes
        let q: Vec<f64> = match problem.objective_sense() {
            ObjectiveSense::Minimize => problem.objective().to_vec(),
            ObjectiveSense::Maximize => problem.objective().iter().map(|c| -c).collect(),
        };

        let mut cones = Vec::new();
        if num_equalities > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_equalities));
        }
        if num_rows > num_equalities {
            cones.push(SupportedConeT::NonnegativeConeT(num_rows - num_equalities));
        }
        let settings = DefaultSettings {
            verbose: self.verbose,
            ..DefaultSettings::default()
        };
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
            _ => OptimizationStatus::SolverHalted,
        };
        if !status.is_optimal() {
            return Ok(ProblemSolution::from_status(status));
        }
        let values = solver.solution.x.clone();
        let objective = match quadratic {
            Some(diagonal) => {
                let quadratic_part: f64 = diagonal
                    .iter()
                    .zip(&values)
                    .map(|(q, x)| 0.5 * q * x * x)
                    .sum();
                quadratic_part + problem.objective_value(&values)
            }
            None => problem.objective_value(&values),
        };
        Ok(ProblemSolution {
            status,
            objective_value: Some(objective),
            variable_values: Some(values),
        })
    }
}

/// Build a compressed sparse column matrix from (row, column, value) triplets
fn to_csc(nrows: usize, ncols: usize, mut triplets: Vec<(usize, usize, f64)>) -> CscMatrix<f64> {
    triplets.sort_by_key(|&(row, col, _)| (col, row));
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::with_capacity(triplets.len());
    let mut nzval = Vec::with_capacity(triplets.len());
    for (row, col, value) in triplets {
        colptr[col + 1] += 1;
        rowval.push(row);
        nzval.push(value);
    }
    for col in 0..ncols {
        colptr[col + 1] += colptr[col];
    }
    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

impl BasicSolver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }
}

impl LinearSolver for ClarabelSolver {
    fn solve_lp(&self, problem: &LinearProblem) -> Result<ProblemSolution, SolverError> {
        self.solve(problem, None)
    }
}

impl QuadraticSolver for ClarabelSolver {
    fn solve_qp(&self, problem: &QuadraticProblem) -> Result<ProblemSolution, SolverError> {
        self.solve(&problem.linear, Some(problem.quadratic()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solve_small_lp() {
        let mut problem = LinearProblem::new(ObjectiveSense::Maximize);
        let x = problem
            .add_variable(0., f64::INFINITY, 1., VariableType::Continuous)
            .unwrap();
        let y = problem
            .add_variable(0., 3., 2., VariableType::Continuous)
            .unwrap();
        problem
            .add_row(&[(x, 1.), (y, 1.)], RowSense::LessOrEqual, 4.)
            .unwrap();
        let solution = ClarabelSolver::default().solve_lp(&problem).unwrap();
        assert!(solution.status.is_optimal());
        assert_abs_diff_eq!(solution.objective_value.unwrap(), 7., epsilon = 1e-6);
    }

    #[test]
    fn minimum_norm_on_a_line() {
        // Minimize x^2 + y^2 subject to x + y = 2, optimum at (1, 1)
        let mut problem = LinearProblem::new(ObjectiveSense::Minimize);
        let x = problem
            .add_variable(-10., 10., 0., VariableType::Continuous)
            .unwrap();
        let y = problem
            .add_variable(-10., 10., 0., VariableType::Continuous)
            .unwrap();
        problem
            .add_row(&[(x, 1.), (y, 1.)], RowSense::Equal, 2.)
            .unwrap();
        let qp = QuadraticProblem::new(problem, vec![2., 2.]).unwrap();
        let solution = ClarabelSolver::default().solve_qp(&qp).unwrap();
        let values = solution.variable_values.unwrap();
        assert_abs_diff_eq!(values[x], 1., epsilon = 1e-6);
        assert_abs_diff_eq!(values[y], 1., epsilon = 1e-6);
    }

    #[test]
    fn integer_problems_are_rejected() {
        let mut problem = LinearProblem::new(ObjectiveSense::Maximize);
        problem.add_variable(0., 1., 1., VariableType::Binary).unwrap();
        assert!(ClarabelSolver::default().solve_lp(&problem).is_err());
    }

    #[test]
    fn csc_from_triplets() {
        let m = to_csc(2, 3, vec![(1, 2, 5.), (0, 0, 1.), (1, 0, 2.)]);
        assert_eq!(m.colptr, vec![0, 2, 2, 3]);
        assert_eq!(m.rowval, vec![0, 1, 1]);
        assert_eq!(m.nzval, vec![1., 2., 5.]);
    }
}
