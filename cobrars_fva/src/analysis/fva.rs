//! Flux variability analysis
//!
//! For every queried reaction, find the smallest and largest flux it can carry while the
//! model objective stays within a percentage of its optimum.
use derive_builder::Builder;
use log::{debug, log, Level};
use nalgebra::DMatrix;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::analysis::loopless::LoopPolicy;
use crate::analysis::norm::{NormMethod, NormMinimizer};
use crate::analysis::per_reaction::Workspace;
use crate::analysis::presolve::presolve;
use crate::analysis::problem_builder::{build_base_problems, BaseProblems};
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;

/// Options of a [`flux_variability`] run
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FvaOptions {
    /// Percentage of the objective optimum the objective must reach, in (0, 100]
    #[builder(default = "100.")]
    pub opt_percentage: f64,
    /// Sense the model objective is optimized in, the model's own sense when None
    #[builder(default = "None")]
    pub sense: Option<ObjectiveSense>,
    /// Ids of the reactions to analyze, every reaction when None
    #[builder(default = "None")]
    pub reactions: Option<Vec<String>>,
    /// Log phases at info level when above zero
    #[builder(default = "0")]
    pub verbosity: u8,
    /// How thermodynamically infeasible loops are removed
    #[builder(default = "LoopPolicy::default()")]
    pub loop_policy: LoopPolicy,
    /// How the flux vector of each extremum is chosen, no vectors are returned when None
    #[builder(default = "None")]
    pub method: Option<NormMethod>,
    /// Tolerances, solver backends and the number of worker threads
    #[builder(default = "Configuration::default()")]
    pub configuration: Configuration,
    /// Pass each worker's previous solution to its next solve as a starting point, a hint
    /// the current backends ignore
    #[builder(default = "false")]
    pub use_warm_start: bool,
}

impl Default for FvaOptions {
    fn default() -> Self {
        FvaOptions {
            opt_percentage: 100.,
            sense: None,
            reactions: None,
            verbosity: 0,
            loop_policy: LoopPolicy::default(),
            method: None,
            configuration: Configuration::default(),
            use_warm_start: false,
        }
    }
}

/// Flux ranges of the queried reactions, in query order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FvaResult {
    /// Queried reaction ids
    pub reactions: Vec<String>,
    /// Minimum flux of each reaction, negative infinity when unbounded
    pub min_flux: Vec<f64>,
    /// Maximum flux of each reaction, infinity when unbounded
    pub max_flux: Vec<f64>,
    /// Flux vectors at the minima, one column per queried reaction (rows are model
    /// reactions), only when a norm method was requested
    pub v_min: Option<DMatrix<f64>>,
    /// Flux vectors at the maxima, laid out like `v_min`
    pub v_max: Option<DMatrix<f64>>,
}

/// A solved (query position, sense) pair
struct Solved {
    position: usize,
    sense: ObjectiveSense,
    value: f64,
    fluxes: Option<Vec<f64>>,
}

/// Run flux variability analysis on `model`
///
/// # Errors
/// Options are checked before anything is solved: [`FvaError::InvalidPercentage`],
/// [`FvaError::IncompatibleOptions`] and [`FvaError::UnknownReaction`]. Afterwards the first
/// failing solve aborts the analysis, no partial results are returned.
///
/// # Examples
/// ```rust
/// use cobrars_fva::analysis::{flux_variability, FvaOptionsBuilder};
/// use cobrars_fva::metabolic_model::model::Model;
/// use cobrars_fva::metabolic_model::reaction::ReactionBuilder;
///
/// let mut model = Model::new_empty();
/// model.add_reaction(
///     ReactionBuilder::default()
///         .id("EX_a")
///         .metabolites([("a".to_string(), 1.)].into_iter().collect())
///         .lower_bound(0.)
///         .upper_bound(10.)
///         .build()
///         .unwrap(),
/// );
/// model.add_reaction(
///     ReactionBuilder::default()
///         .id("DM_a")
///         .metabolites([("a".to_string(), -1.)].into_iter().collect())
///         .lower_bound(0.)
///         .upper_bound(10.)
///         .build()
///         .unwrap(),
/// );
/// model.set_objective_coefficient("DM_a", 1.).unwrap();
///
/// let options = FvaOptionsBuilder::default().opt_percentage(50.).build().unwrap();
/// let result = flux_variability(&model, &options).unwrap();
/// assert!((result.min_flux[1] - 5.).abs() < 1e-6);
/// assert!((result.max_flux[1] - 10.).abs() < 1e-6);
/// ```
pub fn flux_variability(model: &Model, options: &FvaOptions) -> Result<FvaResult, FvaError> {
    let level = if options.verbosity > 0 {
        Level::Info
    } else {
        Level::Debug
    };
    if !(options.opt_percentage > 0. && options.opt_percentage <= 100.) {
        return Err(FvaError::InvalidPercentage(options.opt_percentage));
    }
    NormMethod::check_compatible(options.method, options.loop_policy)?;
    let reaction_ids = match &options.reactions {
        Some(requested) => {
            let unknown = model.unknown_reactions(requested);
            if !unknown.is_empty() {
                return Err(FvaError::UnknownReaction(unknown));
            }
            requested.clone()
        }
        None => model.reaction_ids(),
    };
    let queried: Vec<usize> = reaction_ids
        .iter()
        .filter_map(|id| model.reaction_index(id))
        .collect();
    let configuration = &options.configuration;
    let sense = options.sense.unwrap_or(model.objective_sense);

    log!(
        level,
        "Flux variability of {} reactions ({} {}% of optimum, loops: {})",
        queried.len(),
        sense,
        options.opt_percentage,
        options.loop_policy
    );
    let base = build_base_problems(
        model,
        sense,
        options.opt_percentage,
        options.loop_policy,
        configuration,
    )?;
    log!(level, "Objective optimum: {}", base.objective_value);

    let presolved = presolve(&base, &queried, configuration)?;
    log!(
        level,
        "{} of {} extrema found by the boundary presolve",
        presolved.num_pinned(),
        2 * queried.len()
    );

    let mut solved: Vec<Solved> = Vec::with_capacity(2 * queried.len());
    let mut tasks: Vec<(usize, ObjectiveSense)> = Vec::new();
    for sense in [ObjectiveSense::Minimize, ObjectiveSense::Maximize] {
        for (position, pinned) in presolved.pinned(sense).iter().enumerate() {
            match pinned {
                Some(extremum) => solved.push(Solved {
                    position,
                    sense,
                    value: extremum.value,
                    fluxes: options.method.and(extremum.fluxes.clone()),
                }),
                None => tasks.push((position, sense)),
            }
        }
    }

    let context = TaskContext {
        base: &base,
        queried: &queried,
        reaction_ids: &reaction_ids,
        method: options.method,
        configuration,
        use_warm_start: options.use_warm_start,
    };
    let processes = configuration.processes;
    if processes <= 1 {
        log!(level, "Solving {} problems serially", tasks.len());
        let mut worker = context.worker()?;
        for &task in &tasks {
            solved.push(context.solve(&mut worker, task)?);
        }
    } else {
        log!(
            level,
            "Solving {} problems on {} threads",
            tasks.len(),
            processes
        );
        let pool = ThreadPoolBuilder::new()
            .num_threads(processes)
            .build()
            .map_err(|err| FvaError::ThreadPool(err.to_string()))?;
        let parallel: Vec<Solved> = pool.install(|| {
            tasks
                .par_iter()
                .map_init(
                    || context.worker(),
                    |worker, &task| match worker {
                        Ok(worker) => context.solve(worker, task),
                        Err(err) => Err(err.clone()),
                    },
                )
                .collect::<Result<Vec<_>, FvaError>>()
        })?;
        solved.extend(parallel);
    }

    let result = assemble(model.num_reactions(), reaction_ids, solved, options.method);
    log!(level, "Flux variability finished");
    Ok(result)
}

/// Read only state shared by every task
struct TaskContext<'a> {
    base: &'a BaseProblems,
    queried: &'a [usize],
    reaction_ids: &'a [String],
    method: Option<NormMethod>,
    configuration: &'a Configuration,
    use_warm_start: bool,
}

/// Problems and solvers owned by one worker
type Worker = (Workspace, Option<NormMinimizer>);

impl TaskContext<'_> {
    fn worker(&self) -> Result<Worker, FvaError> {
        let workspace = Workspace::new(self.base, self.configuration, self.use_warm_start)?;
        let minimizer = match self.method {
            Some(method) => Some(NormMinimizer::new(method, self.configuration)?),
            None => None,
        };
        Ok((workspace, minimizer))
    }

    fn solve(
        &self,
        (workspace, minimizer): &mut Worker,
        (position, sense): (usize, ObjectiveSense),
    ) -> Result<Solved, FvaError> {
        let reaction = self.queried[position];
        let reaction_id = &self.reaction_ids[position];
        let extremum = workspace.optimize(
            self.base.loop_law.as_ref(),
            reaction,
            reaction_id,
            sense,
        )?;
        debug!("{} {}: {}", reaction_id, sense, extremum.value);
        let fluxes = match minimizer {
            Some(minimizer) => Some(minimizer.fluxes(
                &self.base.lp,
                reaction,
                reaction_id,
                &extremum,
                &self.base.reference,
            )?),
            None => None,
        };
        Ok(Solved {
            position,
            sense,
            value: extremum.value,
            fluxes,
        })
    }
}

/// Write solved extrema into the result by query position
fn assemble(
    num_reactions: usize,
    reactions: Vec<String>,
    solved: Vec<Solved>,
    method: Option<NormMethod>,
) -> FvaResult {
    let q = reactions.len();
    let mut min_flux = vec![f64::NAN; q];
    let mut max_flux = vec![f64::NAN; q];
    let mut vectors = method.map(|_| {
        (
            DMatrix::from_element(num_reactions, q, f64::NAN),
            DMatrix::from_element(num_reactions, q, f64::NAN),
        )
    });
    for entry in solved {
        let (fluxes, column) = match entry.sense {
            ObjectiveSense::Minimize => (&mut min_flux, vectors.as_mut().map(|(v, _)| v)),
            ObjectiveSense::Maximize => (&mut max_flux, vectors.as_mut().map(|(_, v)| v)),
        };
        fluxes[entry.position] = entry.value;
        if let (Some(matrix), Some(values)) = (column, entry.fluxes) {
            for (row, value) in values.into_iter().take(num_reactions).enumerate() {
                matrix[(row, entry.position)] = value;
            }
        }
    }
    let (v_min, v_max) = match vectors {
        Some((v_min, v_max)) => (Some(v_min), Some(v_max)),
        None => (None, None),
    };
    FvaResult {
        reactions,
        min_flux,
        max_flux,
        v_min,
        v_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ConfigurationBuilder;
    use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};
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

    /// v1 -> a -> v2, maximizing v2
    fn toy_model() -> Model {
        let mut model = Model::new_empty();
        model.add_reaction(reaction("v1", &[("a", 1.)], 0., 10.));
        model.add_reaction(reaction("v2", &[("a", -1.)], 0., 10.));
        model.set_objective_coefficient("v2", 1.).unwrap();
        model
    }

    /// Uptake feeding a linear pathway, with a three reaction internal cycle around b
    fn loop_model() -> Model {
        let mut model = Model::new_empty();
        model.add_reaction(reaction("EX_a", &[("a", 1.)], 0., 10.));
        model.add_reaction(reaction("R_ab", &[("a", -1.), ("b", 1.)], 0., 10.));
        model.add_reaction(reaction("L1", &[("b", -1.), ("c", 1.)], -10., 10.));
        model.add_reaction(reaction("L2", &[("c", -1.), ("d", 1.)], -10., 10.));
        model.add_reaction(reaction("L3", &[("d", -1.), ("b", 1.)], -10., 10.));
        model.add_reaction(reaction("DM_b", &[("b", -1.)], 0., 10.));
        model.set_objective_coefficient("DM_b", 1.).unwrap();
        model
    }

    fn options(loop_policy: LoopPolicy) -> FvaOptionsBuilder {
        let mut builder = FvaOptionsBuilder::default();
        builder.loop_policy(loop_policy);
        builder
    }

    #[test]
    fn builder_defaults_match_default() {
        let built = FvaOptionsBuilder::default().build().unwrap();
        assert_eq!(built, FvaOptions::default());
    }

    #[test]
    fn toy_network_is_pinned() {
        let result = flux_variability(&toy_model(), &FvaOptions::default()).unwrap();
        assert_eq!(result.reactions, vec!["v1".to_string(), "v2".to_string()]);
        for r in 0..2 {
            assert_abs_diff_eq!(result.min_flux[r], 10., epsilon = 1e-6);
            assert_abs_diff_eq!(result.max_flux[r], 10., epsilon = 1e-6);
        }
        assert!(result.v_min.is_none());
        assert!(result.v_max.is_none());
    }

    #[test]
    fn loops_are_excluded() {
        let model = loop_model();
        let loopy = flux_variability(&model, &options(LoopPolicy::None).build().unwrap()).unwrap();
        let loopless =
            flux_variability(&model, &options(LoopPolicy::Original).build().unwrap()).unwrap();
        for r in 2..5 {
            assert_abs_diff_eq!(loopy.min_flux[r], -10., epsilon = 1e-6);
            assert_abs_diff_eq!(loopy.max_flux[r], 10., epsilon = 1e-6);
            assert_abs_diff_eq!(loopless.min_flux[r], 0., epsilon = 1e-6);
            assert_abs_diff_eq!(loopless.max_flux[r], 0., epsilon = 1e-6);
        }
        // Reactions outside the cycle are unaffected
        assert_abs_diff_eq!(loopless.max_flux[5], 10., epsilon = 1e-6);
        assert_abs_diff_eq!(loopless.min_flux[5], 10., epsilon = 1e-6);
    }

    #[test]
    fn every_loop_policy_agrees() {
        let model = loop_model();
        let original = flux_variability(
            &model,
            &options(LoopPolicy::Original)
                .opt_percentage(50.)
                .build()
                .unwrap(),
        )
        .unwrap();
        for policy in [
            LoopPolicy::FastSnp,
            LoopPolicy::LocalizedNullspace,
            LoopPolicy::LocalizedEfm,
        ] {
            let result =
                flux_variability(&model, &options(policy).opt_percentage(50.).build().unwrap())
                    .unwrap();
            for r in 0..model.num_reactions() {
                assert_abs_diff_eq!(result.min_flux[r], original.min_flux[r], epsilon = 1e-6);
                assert_abs_diff_eq!(result.max_flux[r], original.max_flux[r], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn loops_sharing_reactions_are_excluded() {
        // Closed network: every direction between a, b and c is its own reaction, so the
        // triangle T, Q1, Q2 shares each of its reactions with a two-cycle
        let mut model = Model::new_empty();
        model.add_reaction(reaction("T", &[("a", -1.), ("b", 1.)], 0., 10.));
        model.add_reaction(reaction("P1", &[("b", -1.), ("a", 1.)], 0., 10.));
        model.add_reaction(reaction("Q1", &[("b", -1.), ("c", 1.)], 0., 10.));
        model.add_reaction(reaction("Q3", &[("c", -1.), ("b", 1.)], 0., 10.));
        model.add_reaction(reaction("Q2", &[("c", -1.), ("a", 1.)], 0., 10.));
        model.add_reaction(reaction("Q4", &[("a", -1.), ("c", 1.)], 0., 10.));
        for policy in [
            LoopPolicy::Original,
            LoopPolicy::FastSnp,
            LoopPolicy::LocalizedNullspace,
            LoopPolicy::LocalizedEfm,
        ] {
            let result = flux_variability(&model, &options(policy).build().unwrap()).unwrap();
            for r in 0..6 {
                assert_abs_diff_eq!(result.min_flux[r], 0., epsilon = 1e-6);
                assert_abs_diff_eq!(result.max_flux[r], 0., epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn ranges_are_bracketed_and_within_bounds() {
        let model = loop_model();
        let result = flux_variability(
            &model,
            &options(LoopPolicy::None).opt_percentage(30.).build().unwrap(),
        )
        .unwrap();
        for (r, reaction) in model.reactions.values().enumerate() {
            assert!(result.min_flux[r] <= result.max_flux[r] + 1e-9);
            assert!(result.min_flux[r] >= reaction.lower_bound - 1e-9);
            assert!(result.max_flux[r] <= reaction.upper_bound + 1e-9);
        }
    }

    #[test]
    fn lower_percentage_widens_ranges() {
        let model = loop_model();
        let full = flux_variability(&model, &options(LoopPolicy::Original).build().unwrap())
            .unwrap();
        let relaxed = flux_variability(
            &model,
            &options(LoopPolicy::Original)
                .opt_percentage(80.)
                .build()
                .unwrap(),
        )
        .unwrap();
        for r in 0..model.num_reactions() {
            assert!(relaxed.min_flux[r] <= full.min_flux[r] + 1e-9);
            assert!(relaxed.max_flux[r] >= full.max_flux[r] - 1e-9);
        }
        assert_abs_diff_eq!(relaxed.min_flux[5], 8., epsilon = 1e-6);
    }

    #[test]
    fn repeated_runs_match() {
        let model = loop_model();
        let options = options(LoopPolicy::None).opt_percentage(90.).build().unwrap();
        let first = flux_variability(&model, &options).unwrap();
        let second = flux_variability(&model, &options).unwrap();
        assert_eq!(first.min_flux, second.min_flux);
        assert_eq!(first.max_flux, second.max_flux);
    }

    #[test]
    fn parallel_matches_serial() {
        let model = loop_model();
        let serial = flux_variability(
            &model,
            &options(LoopPolicy::LocalizedNullspace).build().unwrap(),
        )
        .unwrap();
        let configuration = ConfigurationBuilder::default().processes(3).build().unwrap();
        let parallel = flux_variability(
            &model,
            &options(LoopPolicy::LocalizedNullspace)
                .configuration(configuration)
                .build()
                .unwrap(),
        )
        .unwrap();
        for r in 0..model.num_reactions() {
            assert_abs_diff_eq!(serial.min_flux[r], parallel.min_flux[r], epsilon = 1e-6);
            assert_abs_diff_eq!(serial.max_flux[r], parallel.max_flux[r], epsilon = 1e-6);
        }
    }

    #[test]
    fn warm_start_gives_the_same_ranges() {
        let model = loop_model();
        let cold = flux_variability(&model, &options(LoopPolicy::Original).build().unwrap())
            .unwrap();
        let warm = flux_variability(
            &model,
            &options(LoopPolicy::Original)
                .use_warm_start(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        for r in 0..model.num_reactions() {
            assert_abs_diff_eq!(cold.min_flux[r], warm.min_flux[r], epsilon = 1e-6);
            assert_abs_diff_eq!(cold.max_flux[r], warm.max_flux[r], epsilon = 1e-6);
        }
    }

    #[test]
    fn warm_start_runs_on_every_thread() {
        let model = loop_model();
        let cold = flux_variability(
            &model,
            &options(LoopPolicy::LocalizedNullspace).build().unwrap(),
        )
        .unwrap();
        let configuration = ConfigurationBuilder::default().processes(2).build().unwrap();
        let warm = flux_variability(
            &model,
            &options(LoopPolicy::LocalizedNullspace)
                .configuration(configuration)
                .use_warm_start(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        for r in 0..model.num_reactions() {
            assert_abs_diff_eq!(cold.min_flux[r], warm.min_flux[r], epsilon = 1e-6);
            assert_abs_diff_eq!(cold.max_flux[r], warm.max_flux[r], epsilon = 1e-6);
        }
    }

    #[test]
    fn query_order_sets_output_order() {
        let options = FvaOptionsBuilder::default()
            .reactions(Some(vec!["DM_b".to_string(), "EX_a".to_string()]))
            .opt_percentage(50.)
            .build()
            .unwrap();
        let result = flux_variability(&loop_model(), &options).unwrap();
        assert_eq!(result.reactions, vec!["DM_b".to_string(), "EX_a".to_string()]);
        assert_eq!(result.min_flux.len(), 2);
        // DM_b is the objective, EX_a is only bounded by the uptake
        assert_abs_diff_eq!(result.min_flux[0], 5., epsilon = 1e-6);
        assert_abs_diff_eq!(result.max_flux[1], 10., epsilon = 1e-6);
    }

    #[test]
    fn unknown_reactions_are_rejected() {
        let options = FvaOptionsBuilder::default()
            .reactions(Some(vec![
                "v1".to_string(),
                "nope".to_string(),
                "missing".to_string(),
            ]))
            .build()
            .unwrap();
        assert_eq!(
            flux_variability(&toy_model(), &options).unwrap_err(),
            FvaError::UnknownReaction(vec!["nope".to_string(), "missing".to_string()])
        );
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = FvaOptionsBuilder::default()
            .method(Some(NormMethod::TwoNorm))
            .build()
            .unwrap();
        assert_eq!(
            flux_variability(&toy_model(), &options).unwrap_err(),
            FvaError::IncompatibleOptions {
                loop_policy: LoopPolicy::None,
                method: NormMethod::TwoNorm
            }
        );
        for percentage in [0., -5., 120.] {
            let options = FvaOptionsBuilder::default()
                .opt_percentage(percentage)
                .build()
                .unwrap();
            assert_eq!(
                flux_variability(&toy_model(), &options).unwrap_err(),
                FvaError::InvalidPercentage(percentage)
            );
        }
    }

    #[test]
    fn infeasible_model_is_reported() {
        let mut model = toy_model();
        model.reactions["v1"].lower_bound = 1.;
        model.reactions["v2"].upper_bound = 0.;
        assert!(matches!(
            flux_variability(&model, &FvaOptions::default()),
            Err(FvaError::InfeasibleOrUnbounded { .. })
        ));
    }

    #[test]
    fn vectors_meet_their_extrema() {
        let model = loop_model();
        for method in [
            NormMethod::Fba,
            NormMethod::ZeroNorm,
            NormMethod::OneNorm,
            NormMethod::TwoNorm,
            NormMethod::MinOrigSol,
        ] {
            let result = flux_variability(
                &model,
                &options(LoopPolicy::Original)
                    .opt_percentage(50.)
                    .method(Some(method))
                    .build()
                    .unwrap(),
            )
            .unwrap();
            let v_min = result.v_min.unwrap();
            let v_max = result.v_max.unwrap();
            assert_eq!(v_min.shape(), (6, 6));
            for r in 0..6 {
                assert_abs_diff_eq!(v_min[(r, r)], result.min_flux[r], epsilon = 1e-5);
                assert_abs_diff_eq!(v_max[(r, r)], result.max_flux[r], epsilon = 1e-5);
                // Loop free vectors carry no flux around the cycle
                for l in 2..5 {
                    assert_abs_diff_eq!(v_max[(l, r)], 0., epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn unbounded_extrema() {
        let mut model = Model::new_empty();
        model.add_reaction(reaction("EX_a", &[("a", 1.)], 0., f64::INFINITY));
        model.add_reaction(reaction("DM_a", &[("a", -1.)], 0., f64::INFINITY));
        model.add_reaction(reaction("EX_b", &[("b", 1.)], 0., 5.));
        model.add_reaction(reaction("DM_b", &[("b", -1.)], 0., 5.));
        model.set_objective_coefficient("DM_b", 1.).unwrap();
        let result = flux_variability(
            &model,
            &FvaOptionsBuilder::default()
                .method(Some(NormMethod::Fba))
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(result.max_flux[0], f64::INFINITY);
        assert_eq!(result.max_flux[1], f64::INFINITY);
        assert_abs_diff_eq!(result.min_flux[1], 0., epsilon = 1e-9);
        assert!(result.v_max.unwrap().column(0).iter().all(|v| v.is_nan()));
    }
}
