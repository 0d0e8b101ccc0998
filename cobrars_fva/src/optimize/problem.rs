//! Provides structs representing linear, mixed integer and quadratic optimization problems
use nalgebra_sparse::CsrMatrix;
use thiserror::Error;

use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::variable::VariableType;

/// A linear (or mixed integer linear) optimization problem
///
/// Stored in matrix form: optimize `c.x` subject to `a x (row_senses) b` and
/// `lb <= x <= ub`. Variables are referenced by their column index, rows by their row index.
/// Problems are cheap enough to clone that every task working on a problem owns its own copy.
#[derive(Debug, Clone)]
pub struct LinearProblem {
    /// Constraint matrix, rows x variables
    a: CsrMatrix<f64>,
    /// Sense of each constraint row
    row_senses: Vec<RowSense>,
    /// Right hand side of each constraint row
    b: Vec<f64>,
    /// Objective coefficients
    c: Vec<f64>,
    /// Variable lower bounds
    lb: Vec<f64>,
    /// Variable upper bounds
    ub: Vec<f64>,
    /// Type of each variable
    variable_types: Vec<VariableType>,
    /// Sense of the objective
    sense: ObjectiveSense,
    /// Primal starting point for backends able to use one
    warm_start: Option<Vec<f64>>,
}

impl LinearProblem {
    // region Creation Functions
    /// Create a new problem without variables or constraints
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            a: CsrMatrix::zeros(0, 0),
            row_senses: Vec::new(),
            b: Vec::new(),
            c: Vec::new(),
            lb: Vec::new(),
            ub: Vec::new(),
            variable_types: Vec::new(),
            sense,
            warm_start: None,
        }
    }

    /// Create a continuous problem from its matrix form
    pub fn from_parts(
        a: CsrMatrix<f64>,
        row_senses: Vec<RowSense>,
        b: Vec<f64>,
        c: Vec<f64>,
        lb: Vec<f64>,
        ub: Vec<f64>,
        sense: ObjectiveSense,
    ) -> Result<Self, ProblemError> {
        check_length("row senses", a.nrows(), row_senses.len())?;
        check_length("right hand side", a.nrows(), b.len())?;
        check_length("objective", a.ncols(), c.len())?;
        check_length("lower bounds", a.ncols(), lb.len())?;
        check_length("upper bounds", a.ncols(), ub.len())?;
        for (index, (&lower, &upper)) in lb.iter().zip(&ub).enumerate() {
            if lower > upper {
                return Err(ProblemError::InvalidVariableBounds {
                    index,
                    lower,
                    upper,
                });
            }
        }
        let variable_types = vec![VariableType::Continuous; a.ncols()];
        Ok(Self {
            a,
            row_senses,
            b,
            c,
            lb,
            ub,
            variable_types,
            sense,
            warm_start: None,
        })
    }
    // endregion Creation Functions

    // region Adding Variables and Rows
    /// Add a variable to the problem, returning its index
    pub fn add_variable(
        &mut self,
        lower_bound: f64,
        upper_bound: f64,
        objective_coefficient: f64,
        variable_type: VariableType,
    ) -> Result<usize, ProblemError> {
        let index = self.num_variables();
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds {
                index,
                lower: lower_bound,
                upper: upper_bound,
            });
        }
        let nrows = self.a.nrows();
        let a = std::mem::replace(&mut self.a, CsrMatrix::zeros(0, 0));
        let (offsets, indices, values) = a.disassemble();
        // Existing column indices stay valid, only the column count grows
        self.a = CsrMatrix::try_from_csr_data(nrows, index + 1, offsets, indices, values)
            .map_err(|e| ProblemError::SparseFormat(e.to_string()))?;
        self.c.push(objective_coefficient);
        self.lb.push(lower_bound);
        self.ub.push(upper_bound);
        self.variable_types.push(variable_type);
        if let Some(start) = self.warm_start.as_mut() {
            start.push(lower_bound.max(0.).min(upper_bound));
        }
        Ok(index)
    }

    /// Add a constraint row `sum(coef * x[var]) (sense) rhs`, returning its index
    ///
    /// Repeated variables in `terms` have their coefficients summed.
    pub fn add_row(
        &mut self,
        terms: &[(usize, f64)],
        sense: RowSense,
        rhs: f64,
    ) -> Result<usize, ProblemError> {
        let ncols = self.num_variables();
        let mut sorted: Vec<(usize, f64)> = Vec::with_capacity(terms.len());
        for &(var, coef) in terms {
            if var >= ncols {
                return Err(ProblemError::NonExistentVariable(var));
            }
            sorted.push((var, coef));
        }
        sorted.sort_by_key(|(var, _)| *var);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(sorted.len());
        for (var, coef) in sorted {
            match merged.last_mut() {
                Some((last, value)) if *last == var => *value += coef,
                _ => merged.push((var, coef)),
            }
        }
        merged.retain(|(_, coef)| *coef != 0.);

        let row = self.a.nrows();
        let a = std::mem::replace(&mut self.a, CsrMatrix::zeros(0, 0));
        let (mut offsets, mut indices, mut values) = a.disassemble();
        for (var, coef) in merged {
            indices.push(var);
            values.push(coef);
        }
        offsets.push(indices.len());
        self.a = CsrMatrix::try_from_csr_data(row + 1, ncols, offsets, indices, values)
            .map_err(|e| ProblemError::SparseFormat(e.to_string()))?;
        self.row_senses.push(sense);
        self.b.push(rhs);
        Ok(row)
    }
    // endregion Adding Variables and Rows

    // region Accessors
    /// Number of variables (columns)
    pub fn num_variables(&self) -> usize {
        self.c.len()
    }

    /// Number of constraint rows
    pub fn num_rows(&self) -> usize {
        self.b.len()
    }

    /// The constraint matrix
    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.a
    }

    /// Sense of every constraint row
    pub fn row_senses(&self) -> &[RowSense] {
        &self.row_senses
    }

    /// Right hand side of every constraint row
    pub fn rhs(&self) -> &[f64] {
        &self.b
    }

    /// Objective coefficients
    pub fn objective(&self) -> &[f64] {
        &self.c
    }

    /// Sense of the objective
    pub fn objective_sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Variable lower bounds
    pub fn lower_bounds(&self) -> &[f64] {
        &self.lb
    }

    /// Variable upper bounds
    pub fn upper_bounds(&self) -> &[f64] {
        &self.ub
    }

    /// Type of every variable
    pub fn variable_types(&self) -> &[VariableType] {
        &self.variable_types
    }

    /// Check if any variable is restricted to integer values
    pub fn has_integer_variables(&self) -> bool {
        self.variable_types.iter().any(|t| t.is_integral())
    }

    /// Primal starting point, if one was set
    pub fn warm_start(&self) -> Option<&[f64]> {
        self.warm_start.as_deref()
    }
    // endregion Accessors

    // region Updates
    /// Update the sense of the objective
    pub fn set_objective_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Replace the objective coefficients
    pub fn set_objective(&mut self, c: Vec<f64>) -> Result<(), ProblemError> {
        check_length("objective", self.num_variables(), c.len())?;
        self.c = c;
        Ok(())
    }

    /// Replace the objective by `coefficient * x[variable]`
    pub fn set_single_objective(
        &mut self,
        variable: usize,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if variable >= self.num_variables() {
            return Err(ProblemError::NonExistentVariable(variable));
        }
        self.c.iter_mut().for_each(|c| *c = 0.);
        self.c[variable] = coefficient;
        Ok(())
    }

    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        variable: usize,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if variable >= self.num_variables() {
            return Err(ProblemError::NonExistentVariable(variable));
        }
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds {
                index: variable,
                lower: lower_bound,
                upper: upper_bound,
            });
        }
        self.lb[variable] = lower_bound;
        self.ub[variable] = upper_bound;
        Ok(())
    }

    /// Update the right hand side of a single row
    pub fn set_rhs(&mut self, row: usize, value: f64) -> Result<(), ProblemError> {
        match self.b.get_mut(row) {
            Some(b) => {
                *b = value;
                Ok(())
            }
            None => Err(ProblemError::NonExistentRow(row)),
        }
    }

    /// Replace the whole right hand side
    pub fn replace_rhs(&mut self, b: &[f64]) -> Result<(), ProblemError> {
        check_length("right hand side", self.num_rows(), b.len())?;
        self.b.copy_from_slice(b);
        Ok(())
    }

    /// Set (or clear) the primal starting point
    pub fn set_warm_start(&mut self, start: Option<Vec<f64>>) -> Result<(), ProblemError> {
        if let Some(start) = &start {
            check_length("warm start", self.num_variables(), start.len())?;
        }
        self.warm_start = start;
        Ok(())
    }
    // endregion Updates

    // region Evaluation
    /// Value of the objective at `x`
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.c.iter().zip(x).map(|(c, x)| c * x).sum()
    }

    /// Value of `a_row . x`
    pub fn row_activity(&self, row: usize, x: &[f64]) -> f64 {
        let row = self.a.row(row);
        row.col_indices()
            .iter()
            .zip(row.values())
            .map(|(&j, v)| v * x[j])
            .sum()
    }

    /// Check that `x` satisfies every row and bound up to `tolerance`
    pub fn is_feasible(&self, x: &[f64], tolerance: f64) -> bool {
        if x.len() != self.num_variables() {
            return false;
        }
        let bounds_ok = x
            .iter()
            .zip(self.lb.iter().zip(&self.ub))
            .all(|(v, (l, u))| *v >= l - tolerance && *v <= u + tolerance);
        bounds_ok
            && (0..self.num_rows()).all(|row| {
                self.row_senses[row].is_satisfied(
                    self.row_activity(row, x),
                    self.b[row],
                    tolerance,
                )
            })
    }
    // endregion Evaluation
}

/// A convex quadratic problem with a diagonal quadratic term
///
/// Minimizes `1/2 sum(q_i x_i^2) + c.x` subject to the constraints of `linear`.
#[derive(Debug, Clone)]
pub struct QuadraticProblem {
    /// Linear part of the objective and every constraint
    pub linear: LinearProblem,
    /// Diagonal of the quadratic term, one entry per variable
    quadratic: Vec<f64>,
}

impl QuadraticProblem {
    /// Create a new quadratic problem, the linear part must be a minimization
    pub fn new(linear: LinearProblem, quadratic: Vec<f64>) -> Result<Self, ProblemError> {
        check_length("quadratic term", linear.num_variables(), quadratic.len())?;
        if let Some(index) = quadratic.iter().position(|q| *q < 0.) {
            return Err(ProblemError::NonConvexQuadratic(index));
        }
        if linear.objective_sense() != ObjectiveSense::Minimize {
            return Err(ProblemError::QuadraticMaximization);
        }
        Ok(Self { linear, quadratic })
    }

    /// Diagonal of the quadratic term
    pub fn quadratic(&self) -> &[f64] {
        &self.quadratic
    }

    /// Value of the full objective at `x`
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        let quadratic: f64 = self
            .quadratic
            .iter()
            .zip(x)
            .map(|(q, x)| 0.5 * q * x * x)
            .sum();
        quadratic + self.linear.objective_value(x)
    }
}

fn check_length(what: &'static str, expected: usize, found: usize) -> Result<(), ProblemError> {
    if expected != found {
        return Err(ProblemError::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Types of optimization problems
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with quadratic objective, linear constraints, and continuous variables
    QuadraticContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to set a variable's bounds with lower > upper
    #[error("Variable {index} given lower bound {lower} > upper bound {upper}")]
    InvalidVariableBounds {
        /// Index of the variable
        index: usize,
        /// Offending lower bound
        lower: f64,
        /// Offending upper bound
        upper: f64,
    },
    /// Error when trying to access a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(usize),
    /// Error when trying to access a constraint row that doesn't exist
    #[error("Tried to access row {0} which doesn't exist")]
    NonExistentRow(usize),
    /// Error when a vector doesn't match the problem dimensions
    #[error("Expected {expected} entries for the {what}, found {found}")]
    DimensionMismatch {
        /// What was being set
        what: &'static str,
        /// Length the problem requires
        expected: usize,
        /// Length that was given
        found: usize,
    },
    /// Error when a quadratic coefficient would make the problem non-convex
    #[error("Quadratic coefficient of variable {0} is negative")]
    NonConvexQuadratic(usize),
    /// Quadratic problems are always minimizations
    #[error("Quadratic problems must be minimized")]
    QuadraticMaximization,
    /// Error from the sparse matrix storage
    #[error("Invalid sparse matrix: {0}")]
    SparseFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_variable_problem() -> LinearProblem {
        let mut problem = LinearProblem::new(ObjectiveSense::Maximize);
        problem
            .add_variable(0., 10., 1., VariableType::Continuous)
            .unwrap();
        problem
            .add_variable(-5., 5., 0., VariableType::Continuous)
            .unwrap();
        problem
    }

    #[test]
    fn add_variables() {
        let mut problem = two_variable_problem();
        assert_eq!(problem.num_variables(), 2);
        assert!(!problem.has_integer_variables());
        let z = problem.add_variable(0., 1., 0., VariableType::Binary).unwrap();
        assert_eq!(z, 2);
        assert!(problem.has_integer_variables());
        assert_eq!(problem.matrix().ncols(), 3);
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = two_variable_problem();
        let res = problem.add_variable(10., 1., 0., VariableType::Continuous);
        if let Err(ProblemError::InvalidVariableBounds { index, .. }) = res {
            assert_eq!(index, 2);
        } else {
            panic!("Invalid variable bounds not caught")
        }
    }

    #[test]
    fn add_rows_merges_repeated_terms() {
        let mut problem = two_variable_problem();
        let row = problem
            .add_row(&[(1, 2.), (0, 1.), (1, 1.)], RowSense::Equal, 4.)
            .unwrap();
        assert_eq!(row, 0);
        let stored = problem.matrix().row(0);
        assert_eq!(stored.col_indices(), &[0, 1]);
        assert_eq!(stored.values(), &[1., 3.]);
        assert!((problem.row_activity(0, &[1., 1.]) - 4.).abs() < 1e-25);

        // Adding a variable after rows keeps the rows intact
        problem
            .add_variable(0., 1., 0., VariableType::Continuous)
            .unwrap();
        assert_eq!(problem.matrix().row(0).values(), &[1., 3.]);
        assert_eq!(problem.matrix().ncols(), 3);
    }

    #[test]
    fn add_row_with_unknown_variable() {
        let mut problem = two_variable_problem();
        let res = problem.add_row(&[(7, 1.)], RowSense::LessOrEqual, 1.);
        assert_eq!(res, Err(ProblemError::NonExistentVariable(7)));
    }

    #[test]
    fn single_objective_and_bounds() {
        let mut problem = two_variable_problem();
        problem.set_single_objective(1, -1.).unwrap();
        assert_eq!(problem.objective(), &[0., -1.]);
        problem.update_variable_bounds(1, -1., 1.).unwrap();
        assert_eq!(problem.lower_bounds()[1], -1.);
        assert!(problem.update_variable_bounds(1, 2., 1.).is_err());
    }

    #[test]
    fn feasibility_check() {
        let mut problem = two_variable_problem();
        problem
            .add_row(&[(0, 1.), (1, 1.)], RowSense::LessOrEqual, 3.)
            .unwrap();
        assert!(problem.is_feasible(&[1., 1.], 1e-9));
        assert!(!problem.is_feasible(&[3., 1.], 1e-9));
        assert!(!problem.is_feasible(&[-1., 0.], 1e-9));
    }

    #[test]
    fn from_parts_checks_dimensions() {
        let a = CsrMatrix::zeros(1, 2);
        let res = LinearProblem::from_parts(
            a,
            vec![RowSense::Equal],
            vec![0.],
            vec![1.],
            vec![0., 0.],
            vec![1., 1.],
            ObjectiveSense::Maximize,
        );
        assert!(matches!(
            res,
            Err(ProblemError::DimensionMismatch { what: "objective", .. })
        ));
    }

    #[test]
    fn quadratic_problem_must_minimize() {
        let problem = two_variable_problem();
        assert_eq!(
            QuadraticProblem::new(problem.clone(), vec![1., 1.]).unwrap_err(),
            ProblemError::QuadraticMaximization
        );
        let mut problem = problem;
        problem.set_objective_sense(ObjectiveSense::Minimize);
        let qp = QuadraticProblem::new(problem, vec![2., 0.]).unwrap();
        assert!((qp.objective_value(&[1., 1.]) - 2.).abs() < 1e-12);
    }
}
