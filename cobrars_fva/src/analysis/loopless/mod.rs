//! Removal of thermodynamically infeasible internal loops
//!
//! Loops are excluded with the loop law: every internal reaction that can take part in a
//! stoichiometric cycle gets a binary direction indicator `z` and a continuous "potential"
//! `g`, the sign of `g` is tied to the direction of the flux through `z`, and `g` must be
//! orthogonal to every cycle of the loop network. A flux pattern sustained only by a cycle
//! then has no consistent `g` and is cut off.
//!
//! Preprocessing ([`preprocess`]) decides which reactions need the loop law and which cycle
//! basis to use, [`formulation`] builds the mixed integer problem and implements the
//! relax/restore cycle used by the localized policies.
pub(crate) mod formulation;
pub(crate) mod preprocess;

use std::fmt::{Display, Formatter};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::loopless::formulation::{
    add_loop_law, restore_original_bounds, update_llcs, MixedIntegerProblem,
};
use crate::analysis::loopless::preprocess::{
    elementary_modes, find_loop_candidates, reaction_links,
};
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::metabolic_model::model::{Model, SparseRow};
use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{LinearProblem, ProblemError};

/// Column of [`LoopInfo::rxn_in_loops`] for the reverse direction
pub const REVERSE: usize = 0;
/// Column of [`LoopInfo::rxn_in_loops`] for the forward direction
pub const FORWARD: usize = 1;

/// How (and whether) internal loops are excluded from the analysis
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopPolicy {
    /// Loops are allowed, every problem is a plain linear program
    #[default]
    None,
    /// Loop law over every loop capable reaction, candidates found with one pair of linear
    /// programs per internal reaction
    Original,
    /// Loop law over the support of a minimal feasible nullspace (Fast-SNP)
    FastSnp,
    /// Fast-SNP preprocessing, loop law applied only to the always-on components and the
    /// component of the reaction being optimized
    LocalizedNullspace,
    /// Fast-SNP preprocessing, loop law applied to the always-on reactions and the reactions
    /// sharing an elementary flux mode with the reaction being optimized
    LocalizedEfm,
}

impl LoopPolicy {
    /// Whether loop law constraints are added at all
    pub fn removes_loops(&self) -> bool {
        !matches!(self, LoopPolicy::None)
    }

    /// Whether loop law constraints are only applied where they are needed
    pub fn is_localized(&self) -> bool {
        matches!(
            self,
            LoopPolicy::LocalizedNullspace | LoopPolicy::LocalizedEfm
        )
    }

    /// Whether the candidate set comes from the minimal feasible nullspace
    pub(crate) fn uses_fast_snp(&self) -> bool {
        matches!(
            self,
            LoopPolicy::FastSnp | LoopPolicy::LocalizedNullspace | LoopPolicy::LocalizedEfm
        )
    }
}

impl Display for LoopPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopPolicy::None => "none",
            LoopPolicy::Original => "original",
            LoopPolicy::FastSnp => "Fast-SNP",
            LoopPolicy::LocalizedNullspace => "localized-nullspace",
            LoopPolicy::LocalizedEfm => "localized-EFM",
        };
        write!(f, "{}", name)
    }
}

/// Rows added by the loop law, one entry per loop capable reaction
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopConstraintRows {
    /// `v - ub z <= 0`
    pub v_u: Vec<usize>,
    /// `v + lb z >= lb`
    pub v_l: Vec<usize>,
    /// `g + (K + 1) z <= K`
    pub g_u: Vec<usize>,
    /// `g + (K + 1) z >= 1`
    pub g_l: Vec<usize>,
    /// `sum N[i, k] g_i = 0`, one per cycle basis vector
    pub cycles: Vec<usize>,
}

/// Variables added by the loop law, one entry per loop capable reaction
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopVariables {
    /// Continuous potential
    pub g: Vec<usize>,
    /// Binary direction indicator, 1 for forward
    pub z: Vec<usize>,
}

/// Everything the analysis needs to know about the loop law it added
///
/// Built once per analysis and only read afterwards. Loop capable reactions are referred to
/// by their position in `loop_reactions`.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopInfo {
    /// For every model reaction, whether its reverse ([`REVERSE`]) and forward ([`FORWARD`])
    /// directions take part in loops
    pub rxn_in_loops: Vec<[bool; 2]>,
    /// Model indices of the reactions carrying the loop law
    pub loop_reactions: Vec<usize>,
    /// Connected component of every loop capable reaction
    pub con_comp: Vec<usize>,
    /// Number of connected components
    pub num_components: usize,
    /// Loop law rows
    pub con: LoopConstraintRows,
    /// Loop law variables
    pub var: LoopVariables,
    /// For every loop capable reaction, the loop capable reactions it shares an elementary
    /// flux mode with (itself included)
    pub rxn_link: Option<Vec<Vec<usize>>>,
    /// Bound on `g` (BDg)
    pub big_m: f64,
    /// Position in `loop_reactions` of every model reaction
    positions: Vec<Option<usize>>,
}

impl LoopInfo {
    /// Position of a model reaction among the loop capable reactions
    pub fn position(&self, reaction: usize) -> Option<usize> {
        self.positions.get(reaction).copied().flatten()
    }

    /// Whether optimizing `reaction` in `sense` pushes it along a loop
    ///
    /// Maximizing pushes flux forward, minimizing pushes it in reverse.
    pub fn in_loops(&self, reaction: usize, sense: ObjectiveSense) -> bool {
        let direction = match sense {
            ObjectiveSense::Maximize => FORWARD,
            ObjectiveSense::Minimize => REVERSE,
        };
        self.position(reaction).is_some() && self.rxn_in_loops[reaction][direction]
    }

    /// Number of loop capable reactions
    pub fn num_loop_reactions(&self) -> usize {
        self.loop_reactions.len()
    }
}

/// Reactions whose loop law must hold whatever reaction is being optimized
///
/// A loop capable reaction is always on when
/// 1. its forward direction is in loops and the objective pushes it forward,
/// 2. its reverse direction is in loops and the objective pushes it in reverse,
/// 3. loop flux through it could relax a coupling constraint, or its bounds force it to run
///    in one direction only.
pub(crate) fn always_on_reactions(
    objective: &[f64],
    sense: ObjectiveSense,
    rxn_in_loops: &[[bool; 2]],
    coupling: &[SparseRow],
    lower_bounds: &[f64],
    upper_bounds: &[f64],
) -> Vec<bool> {
    let mut always_on: Vec<bool> = rxn_in_loops
        .iter()
        .zip(objective)
        .map(|(directions, c)| {
            let pushed = c * sense.sign();
            (directions[FORWARD] && pushed > 0.) || (directions[REVERSE] && pushed < 0.)
        })
        .collect();

    for (terms, row_sense, _) in coupling {
        for &(reaction, coef) in terms {
            let directions = rxn_in_loops[reaction];
            let relaxes = match row_sense {
                RowSense::Equal => directions[FORWARD] || directions[REVERSE],
                RowSense::LessOrEqual => {
                    (coef > 0. && directions[REVERSE]) || (coef < 0. && directions[FORWARD])
                }
                RowSense::GreaterOrEqual => {
                    (coef > 0. && directions[FORWARD]) || (coef < 0. && directions[REVERSE])
                }
            };
            if relaxes {
                always_on[reaction] = true;
            }
        }
    }

    for (reaction, directions) in rxn_in_loops.iter().enumerate() {
        let in_loops = directions[FORWARD] || directions[REVERSE];
        let one_way = lower_bounds[reaction] > 0. || upper_bounds[reaction] < 0.;
        if in_loops && one_way {
            always_on[reaction] = true;
        }
    }
    always_on
}

/// Components holding at least one always-on reaction
pub(crate) fn always_on_components(loop_info: &LoopInfo, always_on: &[bool]) -> Vec<bool> {
    let mut components = vec![false; loop_info.num_components];
    for (position, &reaction) in loop_info.loop_reactions.iter().enumerate() {
        if always_on[reaction] {
            components[loop_info.con_comp[position]] = true;
        }
    }
    components
}

/// The loop law of one analysis: the tight mixed integer template and what is needed to
/// localize it
#[derive(Clone, Debug)]
pub(crate) struct LoopLaw {
    /// Template with every loop law row tight, never relaxed itself
    pub(crate) milp: MixedIntegerProblem,
    pub(crate) info: LoopInfo,
    pub(crate) policy: LoopPolicy,
    /// Per model reaction, only filled in for localized policies
    pub(crate) always_on_reactions: Vec<bool>,
    /// Per component, only filled in for localized policies
    pub(crate) always_on_components: Vec<bool>,
    pub(crate) use_link_mode: bool,
}

impl LoopLaw {
    /// Find the loop capable reactions of `model` and add their loop law to `base`
    ///
    /// `base` is the problem built from `model`, its objective is the one the always-on
    /// conditions are checked against.
    pub(crate) fn new(
        model: &Model,
        base: &LinearProblem,
        policy: LoopPolicy,
        configuration: &Configuration,
    ) -> Result<Self, FvaError> {
        let mut candidates = find_loop_candidates(model, policy, configuration)?;
        let mut rxn_link = None;
        if policy == LoopPolicy::LocalizedEfm && !candidates.loop_reactions.is_empty() {
            match elementary_modes(model, &candidates)? {
                Some(modes) => {
                    rxn_link = reaction_links(&modes, candidates.loop_reactions.len());
                    if rxn_link.is_none() {
                        warn!("No elementary modes found, localizing by component");
                    }
                    candidates.extend_cycles(&modes);
                }
                None => warn!("Too many elementary modes to enumerate, localizing by component"),
            }
        }
        let use_link_mode = rxn_link.is_some();
        let (milp, info) = add_loop_law(base, &candidates, rxn_link, configuration.big_m)?;

        let (always_on_reactions, always_on_components) = if policy.is_localized() {
            let on = always_on_reactions(
                base.objective(),
                base.objective_sense(),
                &info.rxn_in_loops,
                &model.coupling_rows()?,
                &model.lower_bounds(),
                &model.upper_bounds(),
            );
            let components = always_on_components(&info, &on);
            (on, components)
        } else {
            (Vec::new(), Vec::new())
        };
        debug!(
            "Loop law ({}) over {} reactions in {} components, {} always on",
            policy,
            info.num_loop_reactions(),
            info.num_components,
            always_on_reactions.iter().filter(|on| **on).count()
        );
        Ok(Self {
            milp,
            info,
            policy,
            always_on_reactions,
            always_on_components,
            use_link_mode,
        })
    }

    /// Whether some reaction needs its loop law whatever is being optimized
    pub(crate) fn any_always_on(&self) -> bool {
        self.always_on_reactions.iter().any(|on| *on)
    }

    /// Whether optimizing `reaction` in `sense` has to go through the mixed integer problem
    pub(crate) fn needs_milp(&self, reaction: usize, sense: ObjectiveSense) -> bool {
        !self.policy.is_localized() || self.any_always_on() || self.info.in_loops(reaction, sense)
    }

    /// Bring a working copy of the template into the state needed for optimizing `target`
    /// in `sense` (`None` for the model objective), returns the active loop capable reactions
    pub(crate) fn prepare(
        &self,
        working: &mut MixedIntegerProblem,
        target: Option<(usize, ObjectiveSense)>,
    ) -> Result<Vec<bool>, ProblemError> {
        if !self.policy.is_localized() {
            return Ok(vec![true; self.info.num_loop_reactions()]);
        }
        restore_original_bounds(working, &self.info)?;
        let target = target
            .filter(|(reaction, sense)| self.info.in_loops(*reaction, *sense))
            .map(|(reaction, _)| reaction);
        update_llcs(
            working,
            &self.always_on_components,
            &self.always_on_reactions,
            &self.info,
            target,
            self.use_link_mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_flags() {
        assert!(!LoopPolicy::None.removes_loops());
        assert!(LoopPolicy::Original.removes_loops());
        assert!(!LoopPolicy::Original.uses_fast_snp());
        assert!(LoopPolicy::LocalizedEfm.is_localized());
        assert!(!LoopPolicy::FastSnp.is_localized());
        assert_eq!(LoopPolicy::default(), LoopPolicy::None);
    }

    #[test]
    fn objective_conditions() {
        let in_loops = [[true, true], [false, true], [true, false], [false, false]];
        let objective = [0., 1., 1., 1.];
        let lb = [-10.; 4];
        let ub = [10.; 4];
        let on = always_on_reactions(
            &objective,
            ObjectiveSense::Maximize,
            &in_loops,
            &[],
            &lb,
            &ub,
        );
        // Only reaction 1 is pushed forward along a loop
        assert_eq!(on, vec![false, true, false, false]);

        let on = always_on_reactions(
            &objective,
            ObjectiveSense::Minimize,
            &in_loops,
            &[],
            &lb,
            &ub,
        );
        // Minimizing pushes reaction 2 in reverse, which is in a loop
        assert_eq!(on, vec![false, false, true, false]);
    }

    #[test]
    fn coupling_and_bound_conditions() {
        let in_loops = [[false, true], [true, false], [true, true], [true, true]];
        let objective = [0.; 4];
        let lb = [-10., -10., -10., 1.];
        let ub = [10.; 4];
        let coupling: Vec<SparseRow> = vec![
            // Forward loop flux through 0 lowers the row, helping a <= row
            (vec![(0, -1.)], RowSense::LessOrEqual, 5.),
            // Reverse loop flux through 1 lowers the row, not helping a >= row
            (vec![(1, 1.)], RowSense::GreaterOrEqual, 0.),
        ];
        let on = always_on_reactions(
            &objective,
            ObjectiveSense::Maximize,
            &in_loops,
            &coupling,
            &lb,
            &ub,
        );
        assert_eq!(on, vec![true, false, false, true]);
    }
}
