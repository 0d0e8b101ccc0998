//! Sparse flux vectors
//!
//! The number of nonzero fluxes can't be minimized directly with a linear program, it is
//! approached with a sequence of weighted 1-norm problems where fluxes that came out small
//! get large weights in the next round.
use log::debug;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::analysis::FvaError;
use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{LinearProblem, ProblemError};
use crate::optimize::solvers::LinearSolver;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Rounds of reweighting before giving up on convergence
const MAX_ROUNDS: usize = 10;
/// Keeps the weights of zero fluxes finite
const WEIGHT_OFFSET: f64 = 1e-4;

/// `problem` extended with `t_j >= |x_j|` for every variable, minimizing nothing yet
///
/// Variables `0..n` are the original ones, `n..2n` their absolute values. Set the objective
/// to weights on the second half to minimize a weighted 1-norm.
pub(crate) fn absolute_value_problem(problem: &LinearProblem) -> Result<LinearProblem, ProblemError> {
    let n = problem.num_variables();
    let m = problem.num_rows();
    let mut coo = CooMatrix::new(m + 2 * n, 2 * n);
    for (row, col, value) in problem.matrix().triplet_iter() {
        coo.push(row, col, *value);
    }
    for j in 0..n {
        // t_j - x_j >= 0
        coo.push(m + 2 * j, n + j, 1.);
        coo.push(m + 2 * j, j, -1.);
        // t_j + x_j >= 0
        coo.push(m + 2 * j + 1, n + j, 1.);
        coo.push(m + 2 * j + 1, j, 1.);
    }
    let mut senses = problem.row_senses().to_vec();
    senses.extend(std::iter::repeat(RowSense::GreaterOrEqual).take(2 * n));
    let mut rhs = problem.rhs().to_vec();
    rhs.extend(std::iter::repeat(0.).take(2 * n));
    let mut lower = problem.lower_bounds().to_vec();
    lower.extend(std::iter::repeat(0.).take(n));
    let mut upper = problem.upper_bounds().to_vec();
    upper.extend(std::iter::repeat(f64::INFINITY).take(n));
    LinearProblem::from_parts(
        CsrMatrix::from(&coo),
        senses,
        rhs,
        vec![0.; 2 * n],
        lower,
        upper,
        ObjectiveSense::Minimize,
    )
}

/// Objective putting `weights` on the absolute values of an [`absolute_value_problem`]
pub(crate) fn weighted_objective(weights: &[f64]) -> Vec<f64> {
    let mut c = vec![0.; weights.len()];
    c.extend_from_slice(weights);
    c
}

/// Feasible point of `problem` with (approximately) the fewest nonzero entries
///
/// Iteratively reweighted 1-norm minimization: stops once the support stops changing. The
/// returned solution holds the variables of `problem` and its objective value is the number
/// of nonzero entries. If the first round can't be solved its solution is returned as is.
pub(crate) fn sparsest_solution(
    problem: &LinearProblem,
    solver: &dyn LinearSolver,
    tolerance: f64,
) -> Result<ProblemSolution, FvaError> {
    let n = problem.num_variables();
    let mut lp = absolute_value_problem(problem)?;
    let mut weights = vec![1.; n];
    let mut best: Option<(usize, Vec<f64>)> = None;
    let mut previous_support: Option<Vec<bool>> = None;

    for round in 0..MAX_ROUNDS {
        lp.set_objective(weighted_objective(&weights))?;
        let solution = solver.solve_lp(&lp)?;
        if !solution.is_optimal() && best.is_none() {
            return Ok(solution);
        }
        let Some(values) = solution.variable_values.filter(|_| solution.status.is_optimal())
        else {
            debug!("Reweighting round {} failed ({})", round, solution.status);
            break;
        };
        let x = values[..n].to_vec();
        let support: Vec<bool> = x.iter().map(|v| v.abs() > tolerance).collect();
        let size = support.iter().filter(|s| **s).count();
        if best.as_ref().map_or(true, |(best_size, _)| size < *best_size) {
            best = Some((size, x.clone()));
        }
        if previous_support.as_ref() == Some(&support) {
            debug!("Support settled at {} entries after {} rounds", size, round + 1);
            break;
        }
        weights = x.iter().map(|v| 1. / (v.abs() + WEIGHT_OFFSET)).collect();
        previous_support = Some(support);
    }
    Ok(match best {
        Some((size, x)) => ProblemSolution::optimal(size as f64, x),
        None => ProblemSolution::from_status(OptimizationStatus::Unoptimized),
    })
}
