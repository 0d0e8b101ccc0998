//! Flux variability analysis of constraint based metabolic models.
//!
//! A [`Model`](metabolic_model::model::Model) is turned into a linear program, its objective
//! is optimized and then constrained near the optimum, and every queried reaction is
//! minimized and maximized in turn. Thermodynamically infeasible loops can be excluded with
//! a mixed integer loop law ([`LoopPolicy`]), and a representative flux vector can be chosen
//! for every extremum ([`NormMethod`]).

pub mod analysis;
pub mod configuration;
pub mod metabolic_model;
pub mod optimize;
mod utils;

pub use analysis::{
    flux_variability, FvaError, FvaOptions, FvaOptionsBuilder, FvaResult, LoopPolicy, NormMethod,
};
pub use configuration::{Configuration, ConfigurationBuilder, Solver};
