//! This module provides the Model struct for representing an entire metabolic model
use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;

/// Represents a Genome Scale Metabolic Model
///
/// The order of `reactions` is the column order of the stoichiometric matrix, and the order
/// of `metabolites` its row order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Whether the objective is maximized or minimized
    pub objective_sense: ObjectiveSense,
    /// Linear constraints on the fluxes in addition to the mass balances
    pub coupling_constraints: Vec<CouplingConstraint>,
    /// Id associated with the Model
    pub id: Option<String>,
}

/// A linear constraint `sum(coefficient * flux) (sense) rhs` over reaction fluxes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouplingConstraint {
    /// Used to identify the constraint
    pub id: String,
    /// Map of reaction ids to coefficients
    pub coefficients: IndexMap<String, f64>,
    /// Sense of the constraint
    pub sense: RowSense,
    /// Right hand side of the constraint
    pub rhs: f64,
}

/// A sparse constraint row, as (column, coefficient) pairs with its sense and right hand side
pub(crate) type SparseRow = (Vec<(usize, f64)>, RowSense, f64);

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            objective_sense: ObjectiveSense::Maximize,
            coupling_constraints: Vec::new(),
            id: None,
        }
    }

    // region Building
    /// Add a reaction to the model
    ///
    /// Metabolites the reaction refers to which aren't in the model yet are added as steady
    /// state metabolites.
    ///
    /// # Examples
    /// ```rust
    /// use cobrars_fva::metabolic_model::model::Model;
    /// use cobrars_fva::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        for met in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met) {
                self.metabolites.insert(met.clone(), Metabolite::new(met));
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add (or replace) a metabolite
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Set the objective coefficient of a reaction
    pub fn set_objective_coefficient(
        &mut self,
        reaction_id: &str,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::UnknownReaction(reaction_id.to_string()));
        }
        self.objective.insert(reaction_id.to_string(), coefficient);
        Ok(())
    }

    /// Add a coupling constraint, all of its reactions must be in the model
    pub fn add_coupling_constraint(
        &mut self,
        constraint: CouplingConstraint,
    ) -> Result<(), ModelError> {
        if let Some(missing) = constraint
            .coefficients
            .keys()
            .find(|r| !self.reactions.contains_key(*r))
        {
            return Err(ModelError::UnknownReaction(missing.clone()));
        }
        self.coupling_constraints.push(constraint);
        Ok(())
    }
    // endregion Building

    // region Lookup
    /// Number of reactions
    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    /// Column index of a reaction
    pub fn reaction_index(&self, reaction_id: &str) -> Option<usize> {
        self.reactions.get_index_of(reaction_id)
    }

    /// Ids of all reactions, in column order
    pub fn reaction_ids(&self) -> Vec<String> {
        self.reactions.keys().cloned().collect()
    }

    /// The ids in `requested` which aren't reactions of this model, in the order given
    pub fn unknown_reactions(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|r| !self.reactions.contains_key(*r))
            .cloned()
            .collect()
    }
    // endregion Lookup

    // region Matrix Form
    /// The stoichiometric matrix S (metabolites x reactions)
    pub fn stoichiometric_matrix(&self) -> Result<CsrMatrix<f64>, ModelError> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (col, reaction) in self.reactions.values().enumerate() {
            for (met, coef) in &reaction.metabolites {
                let row = self.metabolites.get_index_of(met).ok_or_else(|| {
                    ModelError::UnknownMetabolite {
                        metabolite: met.clone(),
                        reaction: reaction.id.clone(),
                    }
                })?;
                if *coef != 0. {
                    coo.push(row, col, *coef);
                }
            }
        }
        Ok(CsrMatrix::from(&coo))
    }

    /// Sense of each mass balance row
    pub fn row_senses(&self) -> Vec<RowSense> {
        self.metabolites.values().map(|m| m.sense).collect()
    }

    /// Right hand side of each mass balance row
    pub fn row_rhs(&self) -> Vec<f64> {
        self.metabolites.values().map(|m| m.rhs).collect()
    }

    /// Lower flux bound of each reaction
    pub fn lower_bounds(&self) -> Vec<f64> {
        self.reactions.values().map(|r| r.lower_bound).collect()
    }

    /// Upper flux bound of each reaction
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.reactions.values().map(|r| r.upper_bound).collect()
    }

    /// Objective coefficient of each reaction
    pub fn objective_coefficients(&self) -> Vec<f64> {
        self.reactions
            .keys()
            .map(|id| self.objective.get(id).copied().unwrap_or(0.))
            .collect()
    }

    /// Whether any reaction has a nonzero objective coefficient
    pub fn has_objective(&self) -> bool {
        self.objective.values().any(|c| *c != 0.)
    }

    /// The coupling constraints as sparse rows over reaction indices
    pub(crate) fn coupling_rows(&self) -> Result<Vec<SparseRow>, ModelError> {
        self.coupling_constraints
            .iter()
            .map(|constraint| {
                let terms = constraint
                    .coefficients
                    .iter()
                    .map(|(r, c)| {
                        self.reaction_index(r)
                            .map(|idx| (idx, *c))
                            .ok_or_else(|| ModelError::UnknownReaction(r.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((terms, constraint.sense, constraint.rhs))
            })
            .collect()
    }
    // endregion Matrix Form
}

/// Errors raised by inconsistent models
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
    #[error("Metabolite {metabolite} of reaction {reaction} is not in the model")]
    UnknownMetabolite {
        metabolite: String,
        reaction: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;

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

    fn setup_model() -> Model {
        let mut model = Model::new_empty();
        model.add_reaction(reaction("EX_a", &[("a", 1.)], 0., 10.));
        model.add_reaction(reaction("R1", &[("a", -1.), ("b", 2.)], -5., 5.));
        model.add_reaction(reaction("DM_b", &[("b", -1.)], 0., 20.));
        model.set_objective_coefficient("DM_b", 1.).unwrap();
        model
    }

    #[test]
    fn metabolites_are_added_with_reactions() {
        let model = setup_model();
        assert_eq!(model.metabolites.len(), 2);
        assert_eq!(model.metabolites["a"].sense, RowSense::Equal);
    }

    #[test]
    fn stoichiometric_matrix() {
        let model = setup_model();
        let s = model.stoichiometric_matrix().unwrap();
        assert_eq!((s.nrows(), s.ncols()), (2, 3));
        let row_b = s.row(1);
        assert_eq!(row_b.col_indices(), &[1, 2]);
        assert_eq!(row_b.values(), &[2., -1.]);
    }

    #[test]
    fn vectors_follow_reaction_order() {
        let model = setup_model();
        assert_eq!(model.lower_bounds(), vec![0., -5., 0.]);
        assert_eq!(model.upper_bounds(), vec![10., 5., 20.]);
        assert_eq!(model.objective_coefficients(), vec![0., 0., 1.]);
        assert!(model.has_objective());
        assert_eq!(model.reaction_index("R1"), Some(1));
    }

    #[test]
    fn unknown_reactions() {
        let mut model = setup_model();
        let missing =
            model.unknown_reactions(&["R1".to_string(), "R9".to_string(), "R8".to_string()]);
        assert_eq!(missing, vec!["R9".to_string(), "R8".to_string()]);
        assert!(model.set_objective_coefficient("R9", 1.).is_err());
    }

    #[test]
    fn coupling_rows() {
        let mut model = setup_model();
        let mut coefficients = IndexMap::new();
        coefficients.insert("R1".to_string(), 1.);
        coefficients.insert("DM_b".to_string(), -2.);
        model
            .add_coupling_constraint(CouplingConstraint {
                id: "c1".to_string(),
                coefficients,
                sense: RowSense::LessOrEqual,
                rhs: 3.,
            })
            .unwrap();
        let rows = model.coupling_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, vec![(1, 1.), (2, -2.)]);

        let mut bad = IndexMap::new();
        bad.insert("nope".to_string(), 1.);
        let res = model.add_coupling_constraint(CouplingConstraint {
            id: "c2".to_string(),
            coefficients: bad,
            sense: RowSense::Equal,
            rhs: 0.,
        });
        assert_eq!(res, Err(ModelError::UnknownReaction("nope".to_string())));
    }
}
