//! Finds the reactions able to carry flux around internal loops, and the cycles they form
//!
//! Only the internal network matters here: exchange reactions are blocked, every mass
//! balance is closed, and the bounds of internal reactions are reduced to the directions
//! they allow. Any steady state flux of that network is a loop.
use std::collections::BTreeSet;

use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::analysis::loopless::{LoopPolicy, FORWARD, REVERSE};
use crate::analysis::FvaError;
use crate::configuration::Configuration;
use crate::metabolic_model::model::Model;
use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{LinearProblem, ProblemError};
use crate::optimize::solvers::{linear_solver, LinearSolver};
use crate::optimize::ProblemSolution;
use crate::utils::linalg::{nullspace, random_weights, DisjointSets, OrthonormalBasis};

/// Entries of a cycle smaller than this are treated as zero
const CYCLE_ZERO: f64 = 1e-9;
/// Largest number of intermediate rays the mode enumeration keeps before giving up
const MAX_RAYS: usize = 20_000;

/// Loop capable reactions and the cycles constraining their potentials
#[derive(Clone, Debug)]
pub(crate) struct LoopCandidates {
    /// Loop directions of every model reaction, indexed with [`FORWARD`] and [`REVERSE`]
    pub(crate) rxn_in_loops: Vec<[bool; 2]>,
    /// Model indices of the loop capable reactions, ascending
    pub(crate) loop_reactions: Vec<usize>,
    /// Cycle basis, one row per loop capable reaction and one column per cycle
    pub(crate) cycles: DMatrix<f64>,
}

impl LoopCandidates {
    /// Append cycles (over loop capable reactions) to the basis
    pub(crate) fn extend_cycles(&mut self, extra: &[DVector<f64>]) {
        if extra.is_empty() {
            return;
        }
        let rows = self.loop_reactions.len();
        let mut columns: Vec<DVector<f64>> =
            self.cycles.column_iter().map(|c| c.into_owned()).collect();
        columns.extend(extra.iter().cloned());
        self.cycles = DMatrix::from_columns(&columns);
        debug_assert_eq!(self.cycles.nrows(), rows);
    }
}

/// The closed internal network
struct InternalNetwork {
    /// Model indices of the internal reactions
    reactions: Vec<usize>,
    /// Stoichiometry of the internal reactions (metabolites x internal reactions)
    s: CsrMatrix<f64>,
    /// Direction bounds, each in {-1, 0}
    lower: Vec<f64>,
    /// Direction bounds, each in {0, 1}
    upper: Vec<f64>,
}

impl InternalNetwork {
    fn new(model: &Model) -> Result<Self, FvaError> {
        let mut reactions = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        for (index, reaction) in model.reactions.values().enumerate() {
            if reaction.is_boundary() {
                continue;
            }
            let (lb, ub) = reaction.direction_bounds();
            reactions.push(index);
            lower.push(lb);
            upper.push(ub);
        }
        let s = select_columns(&model.stoichiometric_matrix()?, &reactions);
        Ok(Self {
            reactions,
            s,
            lower,
            upper,
        })
    }

    fn len(&self) -> usize {
        self.reactions.len()
    }

    /// `S_int v = 0` within the direction bounds, objective left empty
    fn steady_state_problem(&self, sense: ObjectiveSense) -> Result<LinearProblem, ProblemError> {
        let m = self.s.nrows();
        LinearProblem::from_parts(
            self.s.clone(),
            vec![RowSense::Equal; m],
            vec![0.; m],
            vec![0.; self.len()],
            self.lower.clone(),
            self.upper.clone(),
            sense,
        )
    }
}

/// Decide which reactions carry the loop law, and against which cycles
pub(crate) fn find_loop_candidates(
    model: &Model,
    policy: LoopPolicy,
    configuration: &Configuration,
) -> Result<LoopCandidates, FvaError> {
    let network = InternalNetwork::new(model)?;
    debug!(
        "{} of {} reactions are internal",
        network.len(),
        model.num_reactions()
    );
    let solver = linear_solver(configuration.lp_solver)?;
    if policy.uses_fast_snp() {
        fast_snp_candidates(model, &network, solver.as_ref(), configuration)
    } else {
        original_candidates(model, &network, solver.as_ref(), configuration)
    }
}

/// Two linear programs per internal reaction, the nullspace comes from the echelon form
fn original_candidates(
    model: &Model,
    network: &InternalNetwork,
    solver: &dyn LinearSolver,
    configuration: &Configuration,
) -> Result<LoopCandidates, FvaError> {
    let tol = configuration.tolerance;
    let mut problem = network.steady_state_problem(ObjectiveSense::Maximize)?;
    let mut rxn_in_loops = vec![[false; 2]; model.num_reactions()];
    let mut in_network = Vec::new();
    for (j, &reaction) in network.reactions.iter().enumerate() {
        problem.set_single_objective(j, 1.)?;
        if network.upper[j] > 0. {
            problem.set_objective_sense(ObjectiveSense::Maximize);
            let solution = solver.solve_lp(&problem)?;
            rxn_in_loops[reaction][FORWARD] = value_of(&solution, j).is_some_and(|v| v > tol);
        }
        if network.lower[j] < 0. {
            problem.set_objective_sense(ObjectiveSense::Minimize);
            let solution = solver.solve_lp(&problem)?;
            rxn_in_loops[reaction][REVERSE] = value_of(&solution, j).is_some_and(|v| v < -tol);
        }
        if rxn_in_loops[reaction][FORWARD] || rxn_in_loops[reaction][REVERSE] {
            in_network.push(j);
        }
    }

    let loop_reactions: Vec<usize> = in_network.iter().map(|&j| network.reactions[j]).collect();
    let sub = select_columns(&network.s, &in_network);
    let mut dense = DMatrix::zeros(sub.nrows(), sub.ncols());
    for (row, col, value) in sub.triplet_iter() {
        dense[(row, col)] = *value;
    }
    let cycles = nullspace(&dense, tol);
    debug!(
        "{} loop capable reactions, nullspace of dimension {}",
        loop_reactions.len(),
        cycles.ncols()
    );
    Ok(LoopCandidates {
        rxn_in_loops,
        loop_reactions,
        cycles,
    })
}

/// Minimal feasible nullspace
///
/// Each round projects a pseudo-random weight vector out of the span of the cycles found so
/// far, checks whether some loop has a nonzero component along it, and if so adds the
/// smallest (1-norm) such loop to the basis.
fn fast_snp_candidates(
    model: &Model,
    network: &InternalNetwork,
    solver: &dyn LinearSolver,
    configuration: &Configuration,
) -> Result<LoopCandidates, FvaError> {
    let tol = configuration.tolerance;
    let n = network.len();
    let mut projection = network.steady_state_problem(ObjectiveSense::Maximize)?;
    let mut basis = OrthonormalBasis::default();
    let mut found: Vec<DVector<f64>> = Vec::new();

    for round in 0..n {
        let weights = basis.project_out(&random_weights(n, round as u64));
        if weights.norm() <= tol {
            break;
        }
        projection.set_objective(weights.iter().copied().collect())?;
        let mut along = None;
        for sense in [ObjectiveSense::Maximize, ObjectiveSense::Minimize] {
            projection.set_objective_sense(sense);
            let solution = solver.solve_lp(&projection)?;
            if let (true, Some(value)) = (solution.is_optimal(), solution.objective_value) {
                if value * sense.sign() > tol {
                    along = Some((sense, value));
                    break;
                }
            }
        }
        let Some((sense, value)) = along else {
            break;
        };
        let cycle = match shortest_cycle_along(network, &weights, sense, value, solver)? {
            Some(cycle) => cycle,
            None => break,
        };
        if !basis.push(&cycle, tol) {
            debug!("Round {} found no new cycle direction", round);
            break;
        }
        found.push(cycle);
    }

    let mut in_loops = vec![false; n];
    for cycle in &found {
        for (j, value) in cycle.iter().enumerate() {
            if *value != 0. {
                in_loops[j] = true;
            }
        }
    }
    let in_network: Vec<usize> = (0..n).filter(|&j| in_loops[j]).collect();
    let mut rxn_in_loops = vec![[false; 2]; model.num_reactions()];
    for &j in &in_network {
        let reaction = network.reactions[j];
        rxn_in_loops[reaction][FORWARD] = network.upper[j] > 0.;
        rxn_in_loops[reaction][REVERSE] = network.lower[j] < 0.;
    }
    let loop_reactions: Vec<usize> = in_network.iter().map(|&j| network.reactions[j]).collect();
    let cycles = DMatrix::from_fn(in_network.len(), found.len(), |i, k| {
        found[k][in_network[i]]
    });
    debug!(
        "Fast-SNP found {} cycles over {} reactions",
        found.len(),
        loop_reactions.len()
    );
    Ok(LoopCandidates {
        rxn_in_loops,
        loop_reactions,
        cycles,
    })
}

/// Smallest loop whose weighted flux is at least half of `value` (in the direction of `sense`)
fn shortest_cycle_along(
    network: &InternalNetwork,
    weights: &DVector<f64>,
    sense: ObjectiveSense,
    value: f64,
    solver: &dyn LinearSolver,
) -> Result<Option<DVector<f64>>, FvaError> {
    let n = network.len();
    let reverse_caps: Vec<f64> = network.lower.iter().map(|lb| -lb).collect();
    let mut problem = split_problem(&network.s, &network.upper, &reverse_caps)?;
    let terms: Vec<(usize, f64)> = weights
        .iter()
        .enumerate()
        .flat_map(|(j, w)| [(j, *w), (n + j, -w)])
        .collect();
    let row_sense = match sense {
        ObjectiveSense::Maximize => RowSense::GreaterOrEqual,
        ObjectiveSense::Minimize => RowSense::LessOrEqual,
    };
    problem.add_row(&terms, row_sense, value / 2.)?;
    let solution = solver.solve_lp(&problem)?;
    Ok(solution
        .variable_values
        .filter(|_| solution.status.is_optimal())
        .map(|x| merge_split(&x, n)))
}

/// Every elementary mode of the loop network
///
/// Modes are the extreme rays of `{S v = 0, v >= 0}` over the loop directions of the loop
/// capable reactions, found with the double description method: start from the unit rays of
/// the positive orthant and intersect with one mass balance at a time, combining only
/// adjacent pairs of rays. Two-cycles made of the forward and reverse direction of one
/// reaction are dropped. Returns the modes over loop capable reactions (signed by direction),
/// or None once more than [`MAX_RAYS`] rays are in play.
pub(crate) fn elementary_modes(
    model: &Model,
    candidates: &LoopCandidates,
) -> Result<Option<Vec<DVector<f64>>>, FvaError> {
    let n = candidates.loop_reactions.len();
    let s = select_columns(&model.stoichiometric_matrix()?, &candidates.loop_reactions);
    let mut dense = DMatrix::zeros(s.nrows(), n);
    for (row, col, value) in s.triplet_iter() {
        dense[(row, col)] = *value;
    }
    // Directed copies of the loop capable reactions, as (position, sign)
    let copies: Vec<(usize, f64)> = candidates
        .loop_reactions
        .iter()
        .enumerate()
        .flat_map(|(position, &reaction)| {
            [(FORWARD, 1.), (REVERSE, -1.)]
                .into_iter()
                .filter(move |(direction, _)| candidates.rxn_in_loops[reaction][*direction])
                .map(move |(_, sign)| (position, sign))
        })
        .collect();
    let k = copies.len();

    let mut rays: Vec<DVector<f64>> = (0..k)
        .map(|i| DVector::from_fn(k, |j, _| if i == j { 1. } else { 0. }))
        .collect();
    for row in dense.row_iter() {
        let coefficients: Vec<f64> = copies
            .iter()
            .map(|&(position, sign)| sign * row[position])
            .collect();
        if coefficients.iter().all(|c| c.abs() <= CYCLE_ZERO) {
            continue;
        }
        let products: Vec<f64> = rays
            .iter()
            .map(|ray| ray.iter().zip(&coefficients).map(|(x, c)| x * c).sum())
            .collect();
        let supports: Vec<Vec<bool>> = rays.iter().map(support_mask).collect();
        let mut next: Vec<DVector<f64>> = rays
            .iter()
            .zip(&products)
            .filter(|(_, p)| p.abs() <= CYCLE_ZERO)
            .map(|(ray, _)| ray.clone())
            .collect();
        for (i, &pi) in products.iter().enumerate().filter(|(_, p)| **p > CYCLE_ZERO) {
            for (j, &pj) in products.iter().enumerate().filter(|(_, p)| **p < -CYCLE_ZERO) {
                let union: Vec<bool> = supports[i]
                    .iter()
                    .zip(&supports[j])
                    .map(|(a, b)| *a || *b)
                    .collect();
                let adjacent = !supports
                    .iter()
                    .enumerate()
                    .any(|(l, other)| l != i && l != j && is_subset(other, &union));
                if !adjacent {
                    continue;
                }
                let combined = &rays[i] * (-pj) + &rays[j] * pi;
                let scale = combined.amax();
                next.push(combined.map(|x| if x / scale < CYCLE_ZERO { 0. } else { x / scale }));
                if next.len() > MAX_RAYS {
                    debug!("Mode enumeration passed {} rays", MAX_RAYS);
                    return Ok(None);
                }
            }
        }
        rays = next;
    }

    let mut modes: Vec<DVector<f64>> = Vec::new();
    let mut supports: Vec<Vec<usize>> = Vec::new();
    for ray in rays {
        let mut mode = DVector::zeros(n);
        let mut both_ways = false;
        for (value, &(position, sign)) in ray.iter().zip(&copies) {
            if *value == 0. {
                continue;
            }
            if mode[position] != 0. {
                both_ways = true;
            }
            mode[position] += sign * value;
        }
        if both_ways {
            continue;
        }
        let support = support(&mode);
        if !support.is_empty() && !supports.contains(&support) {
            supports.push(support);
            modes.push(mode);
        }
    }
    debug!("Found {} elementary modes of the loop network", modes.len());
    Ok(Some(modes))
}

fn support_mask(v: &DVector<f64>) -> Vec<bool> {
    v.iter().map(|x| *x != 0.).collect()
}

fn is_subset(a: &[bool], b: &[bool]) -> bool {
    a.iter().zip(b).all(|(x, y)| !*x || *y)
}

/// For every loop capable reaction, the reactions sharing a mode with it (itself included)
///
/// None when there are no modes to link through.
pub(crate) fn reaction_links(modes: &[DVector<f64>], n: usize) -> Option<Vec<Vec<usize>>> {
    if modes.is_empty() {
        return None;
    }
    let mut linked: Vec<BTreeSet<usize>> = (0..n).map(|i| BTreeSet::from([i])).collect();
    for mode in modes {
        let members = support(mode);
        for &a in &members {
            linked[a].extend(members.iter().copied());
        }
    }
    Some(
        linked
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect(),
    )
}

/// Connected components of the graph linking reactions sharing a cycle
///
/// Returns the component of every row of `cycles` and the number of components.
pub(crate) fn connected_components(cycles: &DMatrix<f64>) -> (Vec<usize>, usize) {
    let mut sets = DisjointSets::new(cycles.nrows());
    for column in cycles.column_iter() {
        let mut members = column
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() > CYCLE_ZERO)
            .map(|(i, _)| i);
        if let Some(first) = members.next() {
            for other in members {
                sets.union(first, other);
            }
        }
    }
    let labels = sets.labels();
    let count = labels.iter().max().map_or(0, |max| max + 1);
    (labels, count)
}

/// Optimal value of variable `j`, None if the solve didn't succeed
fn value_of(solution: &ProblemSolution, j: usize) -> Option<f64> {
    if !solution.is_optimal() {
        return None;
    }
    solution.variable_values.as_ref().map(|x| x[j])
}

fn support(v: &DVector<f64>) -> Vec<usize> {
    v.iter()
        .enumerate()
        .filter(|(_, x)| **x != 0.)
        .map(|(i, _)| i)
        .collect()
}

/// `p - q` from the split variables, with negligible entries zeroed
fn merge_split(x: &[f64], n: usize) -> DVector<f64> {
    DVector::from_fn(n, |j, _| {
        let v = x[j] - x[n + j];
        if v.abs() < CYCLE_ZERO {
            0.
        } else {
            v
        }
    })
}

/// Steady state problem over split forward/reverse copies, minimizing their total flux
///
/// Variables `0..n` are the forward copies (capped by `forward_caps`), `n..2n` the reverse
/// copies (capped by `reverse_caps`).
fn split_problem(
    s: &CsrMatrix<f64>,
    forward_caps: &[f64],
    reverse_caps: &[f64],
) -> Result<LinearProblem, ProblemError> {
    let (m, n) = (s.nrows(), s.ncols());
    let mut coo = CooMatrix::new(m, 2 * n);
    for (row, col, value) in s.triplet_iter() {
        coo.push(row, col, *value);
        coo.push(row, n + col, -*value);
    }
    let mut upper = forward_caps.to_vec();
    upper.extend_from_slice(reverse_caps);
    LinearProblem::from_parts(
        CsrMatrix::from(&coo),
        vec![RowSense::Equal; m],
        vec![0.; m],
        vec![1.; 2 * n],
        vec![0.; 2 * n],
        upper,
        ObjectiveSense::Minimize,
    )
}

/// Columns of `s` listed in `columns`, in that order
fn select_columns(s: &CsrMatrix<f64>, columns: &[usize]) -> CsrMatrix<f64> {
    let mut position = vec![None; s.ncols()];
    for (new, &old) in columns.iter().enumerate() {
        position[old] = Some(new);
    }
    let mut coo = CooMatrix::new(s.nrows(), columns.len());
    for (row, col, value) in s.triplet_iter() {
        if let Some(new) = position[col] {
            coo.push(row, new, *value);
        }
    }
    CsrMatrix::from(&coo)
}
