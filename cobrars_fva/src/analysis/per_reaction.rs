//! Optimization of single reactions
use log::debug;

use crate::analysis::loopless::formulation::{flux_orientation, MixedIntegerProblem};
use crate::analysis::loopless::LoopLaw;
use crate::analysis::problem_builder::BaseProblems;
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::LinearProblem;
use crate::optimize::solvers::{
    linear_solver, mixed_integer_solver, LinearSolver, MixedIntegerSolver,
};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Minimum or maximum flux of a reaction, with the solution it was read from
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Extremum {
    /// Extremal flux, infinite when unbounded
    pub(crate) value: f64,
    /// Fluxes of every model reaction at the extremum, None when unbounded
    pub(crate) fluxes: Option<Vec<f64>>,
    /// Direction of every reaction whose loop law was active, as (reaction, forward)
    pub(crate) orientation: Vec<(usize, bool)>,
}

impl Extremum {
    pub(crate) fn unbounded(sense: ObjectiveSense) -> Self {
        Self {
            value: sense.sign() * f64::INFINITY,
            fluxes: None,
            orientation: Vec::new(),
        }
    }
}

/// Private copies of the shared problems and the backends solving them
///
/// Each worker owns one, problems are edited in place between tasks.
pub(crate) struct Workspace {
    lp: LinearProblem,
    lp_solver: Box<dyn LinearSolver>,
    loops: Option<(MixedIntegerProblem, Box<dyn MixedIntegerSolver>)>,
    use_warm_start: bool,
}

impl Workspace {
    pub(crate) fn new(
        base: &BaseProblems,
        configuration: &Configuration,
        use_warm_start: bool,
    ) -> Result<Self, FvaError> {
        let loops = match &base.loop_law {
            Some(law) => Some((
                law.milp.clone(),
                mixed_integer_solver(configuration.milp_solver)?,
            )),
            None => None,
        };
        Ok(Self {
            lp: base.lp.clone(),
            lp_solver: linear_solver(configuration.lp_solver)?,
            loops,
            use_warm_start,
        })
    }

    /// Maximize or minimize the flux through `reaction`
    pub(crate) fn optimize(
        &mut self,
        loop_law: Option<&LoopLaw>,
        reaction: usize,
        reaction_id: &str,
        sense: ObjectiveSense,
    ) -> Result<Extremum, FvaError> {
        let (solution, orientation_of) = match (loop_law, self.loops.as_mut()) {
            (Some(law), Some((milp, solver))) if law.needs_milp(reaction, sense) => {
                let active = law.prepare(milp, Some((reaction, sense)))?;
                let problem = milp.problem_mut();
                problem.set_single_objective(reaction, 1.)?;
                problem.set_objective_sense(sense);
                let solution = solver.solve_milp(problem)?;
                if self.use_warm_start {
                    problem.set_warm_start(solution.variable_values.clone())?;
                }
                (solution, Some((law, active)))
            }
            _ => {
                self.lp.set_single_objective(reaction, 1.)?;
                self.lp.set_objective_sense(sense);
                let solution = self.lp_solver.solve_lp(&self.lp)?;
                if self.use_warm_start {
                    self.lp.set_warm_start(solution.variable_values.clone())?;
                }
                (solution, None)
            }
        };

        let values = match solution {
            ProblemSolution {
                status,
                variable_values: Some(values),
                ..
            } if status.is_optimal() => values,
            ProblemSolution {
                status: OptimizationStatus::Unbounded,
                ..
            } => {
                debug!("{} is unbounded ({})", reaction_id, sense);
                return Ok(Extremum::unbounded(sense));
            }
            ProblemSolution { status, .. } => {
                return Err(FvaError::SolveFailed {
                    reaction: reaction_id.to_string(),
                    status,
                })
            }
        };
        let lb = self.lp.lower_bounds()[reaction];
        let ub = self.lp.upper_bounds()[reaction];
        let value = values[reaction].clamp(lb, ub);
        let orientation = orientation_of
            .map(|(law, active)| flux_orientation(&values, &law.info, &active))
            .unwrap_or_default();
        let n = self.lp.num_variables();
        Ok(Extremum {
            value,
            fluxes: Some(values[..n].to_vec()),
            orientation,
        })
    }
}
