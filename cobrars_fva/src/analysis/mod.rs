//! Flux variability analysis, with optional loop removal and norm minimization
//!
//! The entry point is [`flux_variability`]. The other modules hold the pieces it is built
//! from: the base problem and the objective constraint ([`problem_builder`]), loop law
//! constraints ([`loopless`]), pruning of reactions already at their bounds ([`presolve`]),
//! the single reaction solves ([`per_reaction`]) and the flux vector selection ([`norm`]).
pub mod fva;
pub mod loopless;
pub mod norm;
pub(crate) mod per_reaction;
pub(crate) mod presolve;
pub(crate) mod problem_builder;
pub(crate) mod sparse;

use thiserror::Error;

use crate::metabolic_model::model::ModelError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;
use crate::optimize::OptimizationStatus;

pub use fva::{flux_variability, FvaOptions, FvaOptionsBuilder, FvaResult};
pub use loopless::LoopPolicy;
pub use norm::NormMethod;

/// Errors raised by the analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FvaError {
    /// Requested reactions which aren't part of the model
    #[error("Reactions not found in the model: {}", .0.join(", "))]
    UnknownReaction(Vec<String>),
    /// The model itself couldn't be optimized
    #[error("The model could not be optimized ({status})")]
    InfeasibleOrUnbounded { status: OptimizationStatus },
    /// Norm minimization other than FBA requires loop removal
    #[error("Norm minimization method {method} can't be used with loop policy {loop_policy}")]
    IncompatibleOptions {
        loop_policy: LoopPolicy,
        method: NormMethod,
    },
    /// A single reaction (or aggregate) solve didn't finish with an optimal solution
    #[error("Optimizing {reaction} failed ({status})")]
    SolveFailed {
        reaction: String,
        status: OptimizationStatus,
    },
    /// The percentage of the optimum must be in (0, 100]
    #[error("Percentage of the optimum must be in (0, 100], got {0}")]
    InvalidPercentage(f64),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The worker pool couldn't be created
    #[error("Failed to build the worker thread pool: {0}")]
    ThreadPool(String),
}
