//! Solver settings and the default reaction bounds
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default lower flux bound given to new reactions
pub const DEFAULT_LOWER_BOUND: f64 = -1000.;
/// Default upper flux bound given to new reactions
pub const DEFAULT_UPPER_BOUND: f64 = 1000.;

/// Configuration passed explicitly into every analysis and solve.
///
/// Each parallel worker builds its solver backends from its own copy of this struct, so no
/// solver state is shared between tasks.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Feasibility tolerance, used for quantizing optima, clamping fluxes and
    /// comparing values against bounds
    #[builder(default = "1e-7")]
    pub tolerance: f64,
    /// Bound on the auxiliary loop law variables (also used in place of infinite flux
    /// bounds inside the loop law)
    #[builder(default = "1000.")]
    pub big_m: f64,
    /// Backend used for linear programs
    #[builder(default = "Solver::default_linear()")]
    pub lp_solver: Solver,
    /// Backend used for mixed integer linear programs
    #[builder(default = "Solver::Microlp")]
    pub milp_solver: Solver,
    /// Backend used for quadratic programs
    #[builder(default = "Solver::Clarabel")]
    pub qp_solver: Solver,
    /// Number of worker threads used for the per-reaction optimizations
    #[builder(default = "1")]
    pub processes: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            tolerance: 1e-07,
            big_m: 1000.,
            lp_solver: Solver::default_linear(),
            milp_solver: Solver::Microlp,
            qp_solver: Solver::Clarabel,
            processes: 1,
        }
    }
}

/// Enum used to specify which solver backs a class of problems
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    /// Use the Clarabel interior point solver (linear and quadratic programs)
    Clarabel,
    /// Use the microlp simplex solver (linear and mixed integer programs), requires the
    /// minilp feature to be enabled
    Microlp,
}

impl Solver {
    /// The preferred linear program backend given the enabled features
    pub fn default_linear() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "minilp")] {
                Solver::Microlp
            } else {
                Solver::Clarabel
            }
        }
    }
}
