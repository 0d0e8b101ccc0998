//! Builds the problems shared by every reaction of an analysis
//!
//! The base problem is the model in matrix form: one variable per reaction, one row per
//! metabolite and one per coupling constraint. After the model objective is optimized, a
//! row keeping the objective near its optimum is appended, so every later solve only
//! explores near-optimal fluxes.
use log::debug;

use crate::analysis::loopless::{LoopLaw, LoopPolicy};
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::metabolic_model::model::Model;
use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::LinearProblem;
use crate::optimize::solvers::{linear_solver, mixed_integer_solver};

/// Problems shared (read only) by every reaction of one analysis
#[derive(Clone, Debug)]
pub(crate) struct BaseProblems {
    /// Base problem with the objective constraint
    pub(crate) lp: LinearProblem,
    /// Loop law built on top of `lp`, when loops are removed
    pub(crate) loop_law: Option<LoopLaw>,
    /// Optimum of the model objective
    pub(crate) objective_value: f64,
    /// Fluxes of the model optimum
    pub(crate) reference: Vec<f64>,
}

impl BaseProblems {
    /// Number of model reactions, the leading variables of every problem
    pub(crate) fn num_reactions(&self) -> usize {
        self.lp.num_variables()
    }
}

/// The model in matrix form, optimizing the model objective in `sense`
pub(crate) fn base_problem(model: &Model, sense: ObjectiveSense) -> Result<LinearProblem, FvaError> {
    let mut problem = LinearProblem::from_parts(
        model.stoichiometric_matrix()?,
        model.row_senses(),
        model.row_rhs(),
        model.objective_coefficients(),
        model.lower_bounds(),
        model.upper_bounds(),
        sense,
    )?;
    for (terms, row_sense, rhs) in model.coupling_rows()? {
        problem.add_row(&terms, row_sense, rhs)?;
    }
    Ok(problem)
}

/// Optimize the model objective, then constrain it to `opt_percentage` of the optimum
pub(crate) fn build_base_problems(
    model: &Model,
    sense: ObjectiveSense,
    opt_percentage: f64,
    loop_policy: LoopPolicy,
    configuration: &Configuration,
) -> Result<BaseProblems, FvaError> {
    let mut lp = base_problem(model, sense)?;
    let n = lp.num_variables();
    let mut loop_law = if loop_policy.removes_loops() {
        Some(LoopLaw::new(model, &lp, loop_policy, configuration)?)
    } else {
        None
    };

    let solution = match &loop_law {
        None => linear_solver(configuration.lp_solver)?.solve_lp(&lp)?,
        Some(law) => {
            let mut working = law.milp.clone();
            law.prepare(&mut working, None)?;
            mixed_integer_solver(configuration.milp_solver)?.solve_milp(working.problem())?
        }
    };
    let (objective_value, values) = match (
        solution.status.is_optimal(),
        solution.objective_value,
        solution.variable_values,
    ) {
        (true, Some(objective_value), Some(values)) => (objective_value, values),
        _ => {
            return Err(FvaError::InfeasibleOrUnbounded {
                status: solution.status,
            })
        }
    };
    debug!("Model optimum: {}", objective_value);

    if model.has_objective() {
        let threshold =
            objective_threshold(objective_value, opt_percentage, configuration.tolerance, sense);
        let terms: Vec<(usize, f64)> = lp
            .objective()
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0.)
            .map(|(j, c)| (j, *c))
            .collect();
        let row_sense = match sense {
            ObjectiveSense::Maximize => RowSense::GreaterOrEqual,
            ObjectiveSense::Minimize => RowSense::LessOrEqual,
        };
        lp.add_row(&terms, row_sense, threshold)?;
        if let Some(law) = loop_law.as_mut() {
            law.milp.add_row(&terms, row_sense, threshold)?;
        }
        debug!("Objective constrained to {} {}", row_sense, threshold);
    }

    Ok(BaseProblems {
        lp,
        loop_law,
        objective_value,
        reference: values[..n].to_vec(),
    })
}

/// Round an optimum to the solver tolerance, towards the feasible side
///
/// Maximization optima are rounded down and minimization optima up, and the result never
/// passes the optimum itself.
pub(crate) fn quantize_optimum(optimum: f64, tolerance: f64, sense: ObjectiveSense) -> f64 {
    let steps = optimum / tolerance;
    match sense {
        ObjectiveSense::Maximize => (steps.floor() * tolerance).min(optimum),
        ObjectiveSense::Minimize => (steps.ceil() * tolerance).max(optimum),
    }
}

/// Smallest (maximization) or largest (minimization) objective value still near optimal
pub(crate) fn objective_threshold(
    optimum: f64,
    opt_percentage: f64,
    tolerance: f64,
    sense: ObjectiveSense,
) -> f64 {
    let quantized = quantize_optimum(optimum, tolerance, sense);
    let slack = quantized.abs() * (1. - opt_percentage / 100.);
    match sense {
        ObjectiveSense::Maximize => quantized - slack,
        ObjectiveSense::Minimize => quantized + slack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};
    use crate::optimize::OptimizationStatus;
    use approx::assert_abs_diff_eq;

    fn reaction(id: &str, metabolites: &[(&str, f64)], lb: f64, ub: f64) -> Reaction {
        ReactionBuilder::default()
            .id(id)
            .metabolites(
                metabolites
                    .iter()
                    .map(|(m, c)| (m.to_string(), *c))
                    .collect(),
            )
            .lower_bound(lb)
            .upper_bound(ub)
            .build()
            .unwrap()
    }

    fn toy_model() -> Model {
        let mut model = Model::new_empty();
        model.add_reaction(reaction("v1", &[("a", 1.)], 0., 10.));
        model.add_reaction(reaction("v2", &[("a", -1.)], 0., 10.));
        model.set_objective_coefficient("v2", 1.).unwrap();
        model
    }

    #[test]
    fn quantization_never_passes_the_optimum() {
        let tol = 1e-7;
        let q = quantize_optimum(0.87390000049, tol, ObjectiveSense::Maximize);
        assert!(q <= 0.87390000049);
        assert_abs_diff_eq!(q, 0.8739, epsilon = 2e-7);
        let q = quantize_optimum(-3.00000000051, tol, ObjectiveSense::Minimize);
        assert!(q >= -3.00000000051);
        assert_abs_diff_eq!(q, -3., epsilon = 2e-7);
    }

    #[test]
    fn thresholds() {
        let tol = 1e-7;
        assert_abs_diff_eq!(
            objective_threshold(10., 90., tol, ObjectiveSense::Maximize),
            9.,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            objective_threshold(10., 90., tol, ObjectiveSense::Minimize),
            11.,
            epsilon = 1e-6
        );
        // Negative optima move away from the optimum too
        assert_abs_diff_eq!(
            objective_threshold(-10., 90., tol, ObjectiveSense::Maximize),
            -11.,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            objective_threshold(-10., 50., tol, ObjectiveSense::Minimize),
            -5.,
            epsilon = 1e-6
        );
    }

    #[test]
    fn objective_row_is_appended() {
        let problems = build_base_problems(
            &toy_model(),
            ObjectiveSense::Maximize,
            50.,
            LoopPolicy::None,
            &Configuration::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(problems.objective_value, 10., epsilon = 1e-6);
        assert_eq!(problems.lp.num_rows(), 2);
        assert_eq!(problems.lp.row_senses()[1], RowSense::GreaterOrEqual);
        assert_abs_diff_eq!(problems.lp.rhs()[1], 5., epsilon = 1e-6);
        assert_eq!(problems.reference.len(), 2);
        assert!(problems.loop_law.is_none());
    }

    #[test]
    fn objective_row_reaches_the_loop_law() {
        let problems = build_base_problems(
            &toy_model(),
            ObjectiveSense::Maximize,
            100.,
            LoopPolicy::Original,
            &Configuration::default(),
        )
        .unwrap();
        let law = problems.loop_law.unwrap();
        let milp = law.milp.problem();
        assert_eq!(milp.num_rows(), problems.lp.num_rows());
        assert_eq!(law.milp.rhs0().len(), milp.num_rows());
    }

    #[test]
    fn no_objective_row_without_objective() {
        let mut model = toy_model();
        model.objective.clear();
        let problems = build_base_problems(
            &model,
            ObjectiveSense::Maximize,
            100.,
            LoopPolicy::None,
            &Configuration::default(),
        )
        .unwrap();
        assert_eq!(problems.lp.num_rows(), 1);
    }

    #[test]
    fn infeasible_model() {
        let mut model = toy_model();
        // v1 must run but nothing may consume a
        model.reactions["v1"].lower_bound = 1.;
        model.reactions["v2"].upper_bound = 0.;
        let res = build_base_problems(
            &model,
            ObjectiveSense::Maximize,
            100.,
            LoopPolicy::None,
            &Configuration::default(),
        );
        assert_eq!(
            res.unwrap_err(),
            FvaError::InfeasibleOrUnbounded {
                status: OptimizationStatus::Infeasible
            }
        );
    }
}
