//! The loop law as a mixed integer problem, and its relaxation outside the active reactions
use log::warn;

use crate::analysis::loopless::preprocess::{connected_components, LoopCandidates};
use crate::analysis::loopless::{LoopConstraintRows, LoopInfo, LoopVariables};
use crate::optimize::constraint::RowSense;
use crate::optimize::problem::{LinearProblem, ProblemError};
use crate::optimize::variable::VariableType;

/// A mixed integer problem together with its untouched right hand side
///
/// Localized loop removal relaxes rows by moving their right hand side to infinity, the
/// snapshot is what [`restore_original_bounds`] goes back to.
#[derive(Debug, Clone)]
pub struct MixedIntegerProblem {
    problem: LinearProblem,
    rhs0: Vec<f64>,
}

impl MixedIntegerProblem {
    pub(crate) fn new(problem: LinearProblem) -> Self {
        let rhs0 = problem.rhs().to_vec();
        Self { problem, rhs0 }
    }

    pub fn problem(&self) -> &LinearProblem {
        &self.problem
    }

    /// Mutable access for objective and bound changes
    ///
    /// Rows added through this reference are missing from the snapshot, use
    /// [`MixedIntegerProblem::add_row`] instead.
    pub(crate) fn problem_mut(&mut self) -> &mut LinearProblem {
        &mut self.problem
    }

    /// Right hand side as it was before any relaxation
    #[cfg(test)]
    pub(crate) fn rhs0(&self) -> &[f64] {
        &self.rhs0
    }

    /// Add a row to the problem and to the snapshot
    pub(crate) fn add_row(
        &mut self,
        terms: &[(usize, f64)],
        sense: RowSense,
        rhs: f64,
    ) -> Result<usize, ProblemError> {
        let row = self.problem.add_row(terms, sense, rhs)?;
        self.rhs0.push(rhs);
        Ok(row)
    }
}

/// Add the loop law for every loop capable reaction to `base`
///
/// `base` must have one variable per model reaction, in model order. Infinite flux bounds
/// are replaced by `big_m` inside the loop law.
pub(crate) fn add_loop_law(
    base: &LinearProblem,
    candidates: &LoopCandidates,
    rxn_link: Option<Vec<Vec<usize>>>,
    big_m: f64,
) -> Result<(MixedIntegerProblem, LoopInfo), ProblemError> {
    let mut problem = base.clone();
    let n_loop = candidates.loop_reactions.len();
    let mut var = LoopVariables {
        g: Vec::with_capacity(n_loop),
        z: Vec::with_capacity(n_loop),
    };
    for _ in 0..n_loop {
        var.g
            .push(problem.add_variable(-big_m, big_m, 0., VariableType::Continuous)?);
        var.z
            .push(problem.add_variable(0., 1., 0., VariableType::Binary)?);
    }

    let mut con = LoopConstraintRows::default();
    for (position, &reaction) in candidates.loop_reactions.iter().enumerate() {
        let (g, z) = (var.g[position], var.z[position]);
        let mut lb = base.lower_bounds()[reaction];
        let mut ub = base.upper_bounds()[reaction];
        if !lb.is_finite() || !ub.is_finite() {
            warn!(
                "Reaction {} has infinite bounds, using +/-{} in the loop law",
                reaction, big_m
            );
            lb = lb.max(-big_m);
            ub = ub.min(big_m);
        }
        con.v_u
            .push(problem.add_row(&[(reaction, 1.), (z, -ub)], RowSense::LessOrEqual, 0.)?);
        con.v_l.push(problem.add_row(
            &[(reaction, 1.), (z, lb)],
            RowSense::GreaterOrEqual,
            lb,
        )?);
        con.g_u.push(problem.add_row(
            &[(g, 1.), (z, big_m + 1.)],
            RowSense::LessOrEqual,
            big_m,
        )?);
        con.g_l.push(problem.add_row(
            &[(g, 1.), (z, big_m + 1.)],
            RowSense::GreaterOrEqual,
            1.,
        )?);
    }
    for cycle in candidates.cycles.column_iter() {
        let terms: Vec<(usize, f64)> = cycle
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0.)
            .map(|(position, value)| (var.g[position], *value))
            .collect();
        con.cycles
            .push(problem.add_row(&terms, RowSense::Equal, 0.)?);
    }

    let (con_comp, num_components) = connected_components(&candidates.cycles);
    let mut positions = vec![None; base.num_variables()];
    for (position, &reaction) in candidates.loop_reactions.iter().enumerate() {
        positions[reaction] = Some(position);
    }
    let info = LoopInfo {
        rxn_in_loops: candidates.rxn_in_loops.clone(),
        loop_reactions: candidates.loop_reactions.clone(),
        con_comp,
        num_components,
        con,
        var,
        rxn_link,
        big_m,
        positions,
    };
    Ok((MixedIntegerProblem::new(problem), info))
}

/// Relax the loop law of every loop capable reaction outside the active set
///
/// The active set is made of the always-on reactions and the target (`None` for no target)
/// together with the reactions they share an elementary mode with in link mode, or the
/// components holding them otherwise. Returns whether each loop capable reaction is active.
/// Expects a problem in its restored state.
pub(crate) fn update_llcs(
    problem: &mut MixedIntegerProblem,
    always_on_components: &[bool],
    always_on_reactions: &[bool],
    loop_info: &LoopInfo,
    target: Option<usize>,
    use_link_mode: bool,
) -> Result<Vec<bool>, ProblemError> {
    let active = active_reactions(
        always_on_components,
        always_on_reactions,
        loop_info,
        target,
        use_link_mode,
    );
    let lp = &mut problem.problem;
    for (position, _) in active.iter().enumerate().filter(|(_, on)| !**on) {
        let con = &loop_info.con;
        for row in [con.v_u[position], con.g_u[position], con.v_l[position], con.g_l[position]] {
            if let Some(rhs) = lp.row_senses()[row].relaxed_rhs() {
                lp.set_rhs(row, rhs)?;
            }
        }
        lp.update_variable_bounds(
            loop_info.var.g[position],
            f64::NEG_INFINITY,
            f64::INFINITY,
        )?;
    }
    Ok(active)
}

fn active_reactions(
    always_on_components: &[bool],
    always_on_reactions: &[bool],
    loop_info: &LoopInfo,
    target: Option<usize>,
    use_link_mode: bool,
) -> Vec<bool> {
    let target_position = target.and_then(|reaction| loop_info.position(reaction));
    match (use_link_mode, &loop_info.rxn_link) {
        (true, Some(links)) => {
            let mut active = vec![false; loop_info.num_loop_reactions()];
            for (position, &reaction) in loop_info.loop_reactions.iter().enumerate() {
                if always_on_reactions[reaction] || target_position == Some(position) {
                    for &linked in &links[position] {
                        active[linked] = true;
                    }
                }
            }
            active
        }
        _ => {
            let target_component = target_position.map(|position| loop_info.con_comp[position]);
            loop_info
                .con_comp
                .iter()
                .map(|&component| {
                    always_on_components[component] || target_component == Some(component)
                })
                .collect()
        }
    }
}

/// Undo every relaxation made by [`update_llcs`]
pub(crate) fn restore_original_bounds(
    problem: &mut MixedIntegerProblem,
    loop_info: &LoopInfo,
) -> Result<(), ProblemError> {
    problem.problem.replace_rhs(&problem.rhs0)?;
    for &g in &loop_info.var.g {
        problem
            .problem
            .update_variable_bounds(g, -loop_info.big_m, loop_info.big_m)?;
    }
    Ok(())
}

/// Direction chosen by the solver for every active loop capable reaction, as
/// (reaction, runs forward) pairs read from the binary indicators in `values`
pub(crate) fn flux_orientation(
    values: &[f64],
    loop_info: &LoopInfo,
    active: &[bool],
) -> Vec<(usize, bool)> {
    loop_info
        .loop_reactions
        .iter()
        .enumerate()
        .filter(|(position, _)| active[*position])
        .map(|(position, &reaction)| (reaction, values[loop_info.var.z[position]] > 0.5))
        .collect()
}
