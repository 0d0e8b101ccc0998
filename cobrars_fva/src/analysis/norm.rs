//! Selection of a representative flux vector for every extremum
//!
//! Many flux vectors reach the same extremum. Apart from [`NormMethod::Fba`], which keeps
//! whatever the extremal solve returned, the vector is chosen by a second optimization with
//! the optimized reaction pinned to its extremal value. When the extremum came from the
//! loop law, every reaction whose loop law was active keeps the direction it had, which
//! keeps the chosen vector loop free without integer variables.
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::analysis::loopless::LoopPolicy;
use crate::analysis::per_reaction::Extremum;
use crate::analysis::sparse::{absolute_value_problem, sparsest_solution, weighted_objective};
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{LinearProblem, ProblemError, QuadraticProblem};
use crate::optimize::solvers::{
    linear_solver, quadratic_solver, LinearSolver, QuadraticSolver, SolverError,
};
use crate::optimize::ProblemSolution;

/// How the flux vector returned with each extremum is chosen
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormMethod {
    /// The vector found by the extremal solve itself
    Fba,
    /// Fewest nonzero fluxes
    ZeroNorm,
    /// Smallest sum of absolute fluxes
    OneNorm,
    /// Smallest Euclidean norm
    TwoNorm,
    /// Closest (Euclidean distance) to the fluxes of the model optimum
    MinOrigSol,
}

impl NormMethod {
    /// Check that a norm method can be combined with a loop policy
    ///
    /// Without loop removal only [`NormMethod::Fba`] vectors are available.
    pub fn check_compatible(
        method: Option<NormMethod>,
        loop_policy: LoopPolicy,
    ) -> Result<(), FvaError> {
        match (loop_policy, method) {
            (_, None | Some(NormMethod::Fba)) => Ok(()),
            (
                LoopPolicy::None,
                Some(
                    method @ (NormMethod::ZeroNorm
                    | NormMethod::OneNorm
                    | NormMethod::TwoNorm
                    | NormMethod::MinOrigSol),
                ),
            ) => Err(FvaError::IncompatibleOptions {
                loop_policy,
                method,
            }),
            (
                LoopPolicy::Original
                | LoopPolicy::FastSnp
                | LoopPolicy::LocalizedNullspace
                | LoopPolicy::LocalizedEfm,
                Some(_),
            ) => Ok(()),
        }
    }

    fn is_quadratic(&self) -> bool {
        matches!(self, NormMethod::TwoNorm | NormMethod::MinOrigSol)
    }
}

impl Display for NormMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NormMethod::Fba => "FBA",
            NormMethod::ZeroNorm => "0-norm",
            NormMethod::OneNorm => "1-norm",
            NormMethod::TwoNorm => "2-norm",
            NormMethod::MinOrigSol => "minOrigSol",
        };
        write!(f, "{}", name)
    }
}

/// Picks the flux vector of each extremum, one per worker
pub(crate) struct NormMinimizer {
    method: NormMethod,
    lp_solver: Box<dyn LinearSolver>,
    qp_solver: Option<Box<dyn QuadraticSolver>>,
    tolerance: f64,
}

impl NormMinimizer {
    pub(crate) fn new(method: NormMethod, configuration: &Configuration) -> Result<Self, FvaError> {
        let qp_solver = if method.is_quadratic() {
            Some(quadratic_solver(configuration.qp_solver)?)
        } else {
            None
        };
        Ok(Self {
            method,
            lp_solver: linear_solver(configuration.lp_solver)?,
            qp_solver,
            tolerance: configuration.tolerance,
        })
    }

    /// Flux vector for `extremum` of `reaction`
    ///
    /// `template` is the base problem with the objective constraint, `reference` the fluxes
    /// of the model optimum. Unbounded extrema give a vector of NaN.
    pub(crate) fn fluxes(
        &self,
        template: &LinearProblem,
        reaction: usize,
        reaction_id: &str,
        extremum: &Extremum,
        reference: &[f64],
    ) -> Result<Vec<f64>, FvaError> {
        let n = template.num_variables();
        let unavailable = || vec![f64::NAN; n];
        if !extremum.value.is_finite() {
            return Ok(unavailable());
        }
        let pinned = || pinned_problem(template, reaction, extremum, self.tolerance);
        let solution = match self.method {
            NormMethod::Fba => return Ok(extremum.fluxes.clone().unwrap_or_else(unavailable)),
            NormMethod::ZeroNorm => {
                sparsest_solution(&pinned()?, self.lp_solver.as_ref(), self.tolerance)?
            }
            NormMethod::OneNorm => {
                let mut lp = absolute_value_problem(&pinned()?)?;
                lp.set_objective(weighted_objective(&vec![1.; n]))?;
                self.lp_solver.solve_lp(&lp)?
            }
            NormMethod::TwoNorm => self.closest_to(pinned()?, None)?,
            NormMethod::MinOrigSol => self.closest_to(pinned()?, Some(reference))?,
        };
        match solution {
            ProblemSolution {
                status,
                variable_values: Some(values),
                ..
            } if status.is_optimal() => Ok(values[..n].to_vec()),
            ProblemSolution { status, .. } => Err(FvaError::SolveFailed {
                reaction: format!("{} ({})", reaction_id, self.method),
                status,
            }),
        }
    }

    /// Minimize `1/2 |v - reference|^2` (`1/2 |v|^2` without reference) over `problem`
    fn closest_to(
        &self,
        mut problem: LinearProblem,
        reference: Option<&[f64]>,
    ) -> Result<ProblemSolution, FvaError> {
        let n = problem.num_variables();
        let linear = match reference {
            Some(reference) => reference.iter().map(|v| -v).collect(),
            None => vec![0.; n],
        };
        problem.set_objective(linear)?;
        problem.set_objective_sense(ObjectiveSense::Minimize);
        let qp = QuadraticProblem::new(problem, vec![1.; n])?;
        match &self.qp_solver {
            Some(solver) => Ok(solver.solve_qp(&qp)?),
            None => Err(SolverError::BackendUnavailable("quadratic").into()),
        }
    }
}

/// `template` with the reaction pinned to its extremum and the loop law directions fixed
fn pinned_problem(
    template: &LinearProblem,
    reaction: usize,
    extremum: &Extremum,
    tolerance: f64,
) -> Result<LinearProblem, ProblemError> {
    let mut problem = template.clone();
    let lb = template.lower_bounds()[reaction];
    let ub = template.upper_bounds()[reaction];
    problem.update_variable_bounds(
        reaction,
        (extremum.value - tolerance).max(lb),
        (extremum.value + tolerance).min(ub),
    )?;
    for &(r, forward) in &extremum.orientation {
        let lb = problem.lower_bounds()[r];
        let ub = problem.upper_bounds()[r];
        if forward {
            problem.update_variable_bounds(r, lb.max(0.).min(ub), ub)?;
        } else {
            problem.update_variable_bounds(r, lb, ub.min(0.).max(lb))?;
        }
    }
    Ok(problem)
}
