//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::configuration::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction, negative for consumed metabolites
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound
    #[builder(default = "DEFAULT_LOWER_BOUND")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "DEFAULT_UPPER_BOUND")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
}

impl Reaction {
    /// Whether the reaction can carry flux in both directions
    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0. && self.upper_bound > 0.
    }

    /// Whether the reaction exchanges mass with the environment
    ///
    /// Exchange, sink and demand reactions only consume or only produce metabolites, every
    /// other reaction is internal and may take part in a stoichiometric loop.
    pub fn is_boundary(&self) -> bool {
        let consumes = self.metabolites.values().any(|c| *c < 0.);
        let produces = self.metabolites.values().any(|c| *c > 0.);
        !(consumes && produces)
    }

    /// Bounds of the reaction reduced to its allowed directions, each in {-1, 0, 1}
    ///
    /// Used when the magnitude of the bounds doesn't matter, only which way the reaction
    /// may run.
    pub(crate) fn direction_bounds(&self) -> (f64, f64) {
        let lower = if self.lower_bound < 0. { -1. } else { 0. };
        let upper = if self.upper_bound > 0. { 1. } else { 0. };
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction(metabolites: &[(&str, f64)], lower_bound: f64, upper_bound: f64) -> Reaction {
        ReactionBuilder::default()
            .id("r")
            .metabolites(
                metabolites
                    .iter()
                    .map(|(m, c)| (m.to_string(), *c))
                    .collect(),
            )
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_defaults() {
        let r = ReactionBuilder::default().id("r").build().unwrap();
        assert_eq!(r.lower_bound, DEFAULT_LOWER_BOUND);
        assert_eq!(r.upper_bound, DEFAULT_UPPER_BOUND);
        assert!(r.is_reversible());
        assert!(r.is_boundary());
    }

    #[test]
    fn boundary_detection() {
        assert!(reaction(&[("a", 1.)], 0., 10.).is_boundary());
        assert!(reaction(&[("a", -1.), ("b", -2.)], 0., 10.).is_boundary());
        assert!(!reaction(&[("a", -1.), ("b", 1.)], 0., 10.).is_boundary());
    }

    #[test]
    fn direction_bounds() {
        let r = reaction(&[("a", -1.), ("b", 1.)], -4., 7.);
        assert_eq!(r.direction_bounds(), (-1., 1.));
        let r = reaction(&[("a", -1.), ("b", 1.)], 2., 7.);
        assert_eq!(r.direction_bounds(), (0., 1.));
        let r = reaction(&[("a", -1.), ("b", 1.)], -3., 0.);
        assert_eq!(r.direction_bounds(), (-1., 0.));
    }
}
