//! This module provides the metabolite struct representing a metabolite

use std::hash::Hash;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::optimize::constraint::RowSense;

/// Represents a metabolite, and the mass balance row it contributes to the model
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Sense of the mass balance, `=` for steady state
    #[builder(default = "RowSense::Equal")]
    pub sense: RowSense,
    /// Right hand side of the mass balance, 0 for steady state
    #[builder(default = "0.")]
    pub rhs: f64,
}

impl Metabolite {
    /// A steady state metabolite with only an id
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            compartment: None,
            charge: 0,
            formula: None,
            sense: RowSense::Equal,
            rhs: 0.,
        }
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state); // Hash by id
                             // If the metabolite has an associated compartment, also hash by that
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}
