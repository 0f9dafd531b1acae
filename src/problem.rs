//! Least-squares problems over aggregated DOFs.
//!
//! This module defines the `Problem` trait, the flat-vector interface a
//! nonlinear least-squares driver consumes, and the types that expose a
//! [`GlobalDofs`] aggregate through it:
//!
//! - [`LeastSquaresTerm`]: one function with a goal and a weight
//! - [`LeastSquares`]: the weighted residual vector `sqrt(w)·(f - goal)` over
//!   several terms, with its Jacobian
//! - [`DofProblem`]: a [`LeastSquares`] bundled with its owner arena,
//!   implementing [`Problem`]

use crate::aggregator::GlobalDofs;
use crate::error::{DofError, Result};
use crate::function::Function;
use crate::jacobian::DiffConfig;
use crate::owner::Owners;
use ndarray::{s, Array1, Array2};
use std::cell::RefCell;
use std::ops::Range;

/// A trait representing a nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default implementation uses forward differences with a step of
    /// 1e-7.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::jacobian::problem_jacobian(self, params, &DiffConfig::default())
    }

    /// Check if this problem provides a custom Jacobian implementation.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// One function in a least-squares objective.
#[derive(Debug)]
pub struct LeastSquaresTerm {
    pub function: Function,
    /// Target value subtracted from every output of the function
    pub goal: f64,
    /// Non-negative weight; residuals are scaled by its square root
    pub weight: f64,
}

impl LeastSquaresTerm {
    /// # Errors
    ///
    /// [`DofError::InvalidInput`] if the weight is negative or not finite.
    pub fn new(function: Function, goal: f64, weight: f64) -> Result<Self> {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(DofError::InvalidInput(format!(
                "weight of '{}' must be finite and non-negative, got {}",
                function.name(),
                weight
            )));
        }

        Ok(Self {
            function,
            goal,
            weight,
        })
    }

    /// Term with goal zero and weight one.
    pub fn residual(function: Function) -> Self {
        Self {
            function,
            goal: 0.0,
            weight: 1.0,
        }
    }
}

/// Weighted least-squares residuals over the DOFs of several functions.
#[derive(Debug)]
pub struct LeastSquares {
    dofs: GlobalDofs,
    goals: Vec<f64>,
    sqrt_weights: Vec<f64>,
}

impl LeastSquares {
    /// Aggregate the DOFs of the terms' functions.
    ///
    /// # Errors
    ///
    /// Any error of [`GlobalDofs::from_functions`].
    pub fn new(owners: &Owners, terms: Vec<LeastSquaresTerm>) -> Result<Self> {
        let mut functions = Vec::with_capacity(terms.len());
        let mut goals = Vec::with_capacity(terms.len());
        let mut sqrt_weights = Vec::with_capacity(terms.len());

        for term in terms {
            goals.push(term.goal);
            sqrt_weights.push(term.weight.sqrt());
            functions.push(term.function);
        }

        Ok(Self {
            dofs: GlobalDofs::from_functions(owners, functions)?,
            goals,
            sqrt_weights,
        })
    }

    /// Replace the finite-difference settings of the underlying aggregate.
    pub fn with_config(mut self, config: DiffConfig) -> Result<Self> {
        self.dofs = self.dofs.with_config(config)?;
        Ok(self)
    }

    pub fn dofs(&self) -> &GlobalDofs {
        &self.dofs
    }

    /// Stacked `sqrt(w)·(f - goal)` of every term.
    pub fn residuals(&mut self, owners: &Owners) -> Result<Array1<f64>> {
        let mut residuals = self.dofs.f(owners)?;
        for (i, rows) in self.term_rows().into_iter().enumerate() {
            residuals
                .slice_mut(s![rows])
                .mapv_inplace(|v| self.sqrt_weights[i] * (v - self.goals[i]));
        }
        Ok(residuals)
    }

    /// Jacobian of [`residuals`](LeastSquares::residuals).
    pub fn jacobian(&mut self, owners: &mut Owners) -> Result<Array2<f64>> {
        let mut jac = self.dofs.jac(owners)?;
        for (i, rows) in self.term_rows().into_iter().enumerate() {
            let scale = self.sqrt_weights[i];
            jac.slice_mut(s![rows, ..]).mapv_inplace(|d| scale * d);
        }
        Ok(jac)
    }

    /// Sum of squared residuals.
    pub fn objective(&mut self, owners: &Owners) -> Result<f64> {
        Ok(self.residuals(owners)?.iter().map(|r| r.powi(2)).sum())
    }

    fn term_rows(&self) -> Vec<Range<usize>> {
        self.dofs.output_shape().row_ranges().unwrap_or_default()
    }
}

/// A [`LeastSquares`] objective bundled with its owners as a [`Problem`].
///
/// Parameter vectors passed to the [`Problem`] methods are written into the
/// owners before evaluation and stay there afterwards.
///
/// # Examples
///
/// ```
/// use dofopt_rs::models::Identity;
/// use dofopt_rs::owner::Owners;
/// use dofopt_rs::problem::{DofProblem, LeastSquares, LeastSquaresTerm, Problem};
/// use ndarray::array;
///
/// let mut owners = Owners::new();
/// let id = owners.insert_with(|id| Identity::new(id, 0.0));
/// let term = LeastSquaresTerm::new(Identity::function(id), 3.0, 4.0).unwrap();
/// let objective = LeastSquares::new(&owners, vec![term]).unwrap();
///
/// let problem = DofProblem::new(owners, objective).unwrap();
/// assert_eq!(problem.eval(&array![5.0]).unwrap(), array![4.0]);
/// assert_eq!(problem.eval_cost(&array![5.0]).unwrap(), 16.0);
/// ```
#[derive(Debug)]
pub struct DofProblem {
    owners: RefCell<Owners>,
    objective: RefCell<LeastSquares>,
    residual_count: usize,
}

impl DofProblem {
    /// Bundle an objective with its owners, evaluating it once to learn the
    /// residual count.
    pub fn new(owners: Owners, mut objective: LeastSquares) -> Result<Self> {
        let residual_count = objective.residuals(&owners)?.len();
        Ok(Self {
            owners: RefCell::new(owners),
            objective: RefCell::new(objective),
            residual_count,
        })
    }

    /// Current global parameter vector.
    pub fn initial_params(&self) -> Result<Array1<f64>> {
        self.objective.borrow().dofs().x(&self.owners.borrow())
    }

    /// Hand the owners back, carrying the last evaluated parameters.
    pub fn into_owners(self) -> Owners {
        self.owners.into_inner()
    }

    fn write_params(&self, params: &Array1<f64>) -> Result<()> {
        self.objective
            .borrow()
            .dofs()
            .set_x(&mut self.owners.borrow_mut(), params)
    }
}

impl Problem for DofProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.write_params(params)?;
        self.objective.borrow_mut().residuals(&self.owners.borrow())
    }

    fn parameter_count(&self) -> usize {
        self.objective.borrow().dofs().len()
    }

    fn residual_count(&self) -> usize {
        self.residual_count
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        self.write_params(params)?;
        self.objective
            .borrow_mut()
            .jacobian(&mut self.owners.borrow_mut())
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}
