//! Prunes reactions whose extremum can be read off two aggregate solves
//!
//! Maximizing the sum of every queried flux pushes each of them up. A reaction sitting at
//! its upper bound in that solution has the bound as its maximum, and the same holds for
//! the minimizing solve and lower bounds.
use log::debug;

use crate::analysis::loopless::formulation::flux_orientation;
use crate::analysis::per_reaction::Extremum;
use crate::analysis::problem_builder::BaseProblems;
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{linear_solver, mixed_integer_solver};
use crate::optimize::OptimizationStatus;

/// Name used in errors raised by the aggregate solves
const AGGREGATE: &str = "sum of queried reactions";

/// Queried reactions already known to sit at one of their bounds
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Presolved {
    /// Per query position, the maximum if it is pinned at the upper bound
    pub(crate) max: Vec<Option<Extremum>>,
    /// Per query position, the minimum if it is pinned at the lower bound
    pub(crate) min: Vec<Option<Extremum>>,
}

impl Presolved {
    /// Extrema found for `sense`
    pub(crate) fn pinned(&self, sense: ObjectiveSense) -> &[Option<Extremum>] {
        match sense {
            ObjectiveSense::Maximize => &self.max,
            ObjectiveSense::Minimize => &self.min,
        }
    }

    pub(crate) fn num_pinned(&self) -> usize {
        self.max.iter().chain(&self.min).filter(|e| e.is_some()).count()
    }
}

/// Solve the two aggregate problems over `queried` (model reaction indices)
///
/// Goes through the fully tightened loop law when there is one, so the evidence holds
/// whatever subset of the loop law a single reaction solve keeps.
pub(crate) fn presolve(
    base: &BaseProblems,
    queried: &[usize],
    configuration: &Configuration,
) -> Result<Presolved, FvaError> {
    let tolerance = configuration.tolerance;
    let mut presolved = Presolved::default();

    for sense in [ObjectiveSense::Maximize, ObjectiveSense::Minimize] {
        let solution = match &base.loop_law {
            None => {
                let mut problem = base.lp.clone();
                problem.set_objective(sum_objective(problem.num_variables(), queried))?;
                problem.set_objective_sense(sense);
                linear_solver(configuration.lp_solver)?.solve_lp(&problem)?
            }
            Some(law) => {
                let mut milp = law.milp.clone();
                let problem = milp.problem_mut();
                problem.set_objective(sum_objective(problem.num_variables(), queried))?;
                problem.set_objective_sense(sense);
                mixed_integer_solver(configuration.milp_solver)?.solve_milp(problem)?
            }
        };

        let pinned = match (solution.status, solution.variable_values) {
            (status, Some(values)) if status.is_optimal() => {
                pinned_at_bounds(base, &values, queried, sense, tolerance)
            }
            (OptimizationStatus::Unbounded, _) => {
                debug!("Aggregate {} is unbounded, nothing pruned", sense);
                vec![None; queried.len()]
            }
            (status, _) => {
                return Err(FvaError::SolveFailed {
                    reaction: AGGREGATE.to_string(),
                    status,
                })
            }
        };
        match sense {
            ObjectiveSense::Maximize => presolved.max = pinned,
            ObjectiveSense::Minimize => presolved.min = pinned,
        }
    }
    debug!(
        "{} of {} extrema pinned at a bound",
        presolved.num_pinned(),
        2 * queried.len()
    );
    Ok(presolved)
}

/// Queried reactions at their upper (maximization) or lower (minimization) bound in the
/// aggregate solution `values`
fn pinned_at_bounds(
    base: &BaseProblems,
    values: &[f64],
    queried: &[usize],
    sense: ObjectiveSense,
    tolerance: f64,
) -> Vec<Option<Extremum>> {
    let orientation = match &base.loop_law {
        Some(law) => {
            let all = vec![true; law.info.num_loop_reactions()];
            flux_orientation(values, &law.info, &all)
        }
        None => Vec::new(),
    };
    let fluxes = &values[..base.num_reactions()];
    queried
        .iter()
        .map(|&r| {
            let bound = match sense {
                ObjectiveSense::Maximize => base.lp.upper_bounds()[r],
                ObjectiveSense::Minimize => base.lp.lower_bounds()[r],
            };
            (bound.is_finite() && (fluxes[r] - bound).abs() <= tolerance).then(|| Extremum {
                value: bound,
                fluxes: Some(fluxes.to_vec()),
                orientation: orientation.clone(),
            })
        })
        .collect()
}

/// Objective with a one for every queried reaction (summed for repeated reactions)
fn sum_objective(num_variables: usize, queried: &[usize]) -> Vec<f64> {
    let mut c = vec![0.; num_variables];
    for &r in queried {
        c[r] += 1.;
    }
    c
}
