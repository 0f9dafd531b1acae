//! # Jacobian assembly
//!
//! Two ways to differentiate the stacked output of a
//! [`GlobalDofs`](crate::aggregator::GlobalDofs) with respect to its global
//! vector:
//!
//! - [`GlobalDofs::jac`] places each function's analytic Jacobian at its
//!   owner's columns and differentiates the remaining functions numerically
//! - [`GlobalDofs::fd_jac`] differentiates everything numerically
//!
//! Analytic blocks assume a function depends only on its own owner's free
//! parameters. A function whose owner reads other owners should be left
//! without an analytic Jacobian, so that its row block is differentiated over
//! the whole global vector.

mod config;
mod finite_difference;

pub use config::{DiffConfig, DEFAULT_STEP};

use crate::aggregator::GlobalDofs;
use crate::error::{DofError, Result};
use crate::owner::Owners;
use crate::problem::Problem;
use finite_difference::Probe;
use ndarray::{s, Array1, Array2};
use tracing::debug;

/// Probe that writes through a [`GlobalDofs`] and evaluates some of its
/// functions.
struct OwnerProbe<'a> {
    dofs: &'a GlobalDofs,
    owners: &'a mut Owners,
    functions: &'a [usize],
}

impl Probe for OwnerProbe<'_> {
    fn eval_at(&mut self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.dofs.set_x(self.owners, x)?;
        self.dofs.evaluate_subset(self.owners, self.functions)
    }

    fn restore(&mut self, x0: &Array1<f64>) -> Result<()> {
        self.dofs.set_x(self.owners, x0)
    }
}

/// Probe over a [`Problem`], which takes its parameters as an argument.
struct ProblemProbe<'a, P> {
    problem: &'a P,
}

impl<P: Problem> Probe for ProblemProbe<'_, P> {
    fn eval_at(&mut self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.problem.eval(x)
    }

    fn restore(&mut self, _x0: &Array1<f64>) -> Result<()> {
        Ok(())
    }
}

/// Finite-difference Jacobian of a [`Problem`]'s residuals at `params`.
///
/// # Errors
///
/// - [`DofError::InvalidConfig`] for a non-positive or non-finite step
/// - [`DofError::DimensionMismatch`] if the residual count disagrees with
///   [`Problem::residual_count`]
pub fn problem_jacobian<P: Problem>(
    problem: &P,
    params: &Array1<f64>,
    config: &DiffConfig,
) -> Result<Array2<f64>> {
    config.validate()?;

    let f0 = problem.eval(params)?;
    if f0.len() != problem.residual_count() {
        return Err(DofError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            problem.residual_count(),
            f0.len()
        )));
    }

    finite_difference::jacobian(&mut ProblemProbe { problem }, params, &f0, config)
}

impl GlobalDofs {
    /// Jacobian of [`f`](GlobalDofs::f) with respect to the global vector.
    ///
    /// Functions with an analytic Jacobian fill their rows at their owner's
    /// columns and leave the rest zero. Functions without one share a single
    /// finite-difference sweep over their rows, using this aggregate's
    /// [`DiffConfig`] (forward differences with a step of 1e-7 by default).
    ///
    /// # Errors
    ///
    /// - [`DofError::DimensionMismatch`] if an analytic Jacobian does not have
    ///   one row per output value and one column per free DOF of its owner
    /// - any error of [`f`](GlobalDofs::f)
    pub fn jac(&mut self, owners: &mut Owners) -> Result<Array2<f64>> {
        if self.shape.lengths().is_none() {
            self.f(owners)?;
        }
        let rows = self.shape.row_ranges().unwrap_or_default();
        let nvals = rows.last().map_or(0, |r| r.end);

        let mut jac = Array2::zeros((nvals, self.len()));
        let mut numeric = Vec::new();

        for (i, function) in self.functions.iter().enumerate() {
            let Some(local) = function.local_jacobian(owners) else {
                numeric.push(i);
                continue;
            };
            let local = local?;

            let columns = self.owner_columns(function.owner());
            let expected = (rows[i].len(), columns.len());
            if local.dim() != expected {
                return Err(DofError::DimensionMismatch(format!(
                    "Jacobian of '{}' is {:?}, expected {:?}",
                    function.name(),
                    local.dim(),
                    expected
                )));
            }

            jac.slice_mut(s![rows[i].clone(), columns]).assign(&local);
        }

        if !numeric.is_empty() {
            let block = self.numeric_block(owners, &numeric, self.config)?;
            let mut offset = 0;
            for &i in &numeric {
                let len = rows[i].len();
                jac.slice_mut(s![rows[i].clone(), ..])
                    .assign(&block.slice(s![offset..offset + len, ..]));
                offset += len;
            }
        }

        debug!(
            "Assembled {}x{} Jacobian ({} analytic, {} finite-difference functions)",
            nvals,
            self.len(),
            self.functions.len() - numeric.len(),
            numeric.len()
        );

        Ok(jac)
    }

    /// Finite-difference Jacobian of [`f`](GlobalDofs::f) over the whole
    /// global vector.
    ///
    /// Forward differences compute `(f(x0 + h·e_i) - f(x0)) / h`, centered
    /// ones `(f(x0 + h·e_i) - f(x0 - h·e_i)) / (2h)`, with `h` taken from this
    /// aggregate's [`DiffConfig`]. Every probe is written into the owners; the
    /// global vector is restored to `x0` after each column, and also when an
    /// evaluation fails part-way through.
    ///
    /// # Examples
    ///
    /// ```
    /// use dofopt_rs::aggregator::GlobalDofs;
    /// use dofopt_rs::models::Adder;
    /// use dofopt_rs::owner::Owners;
    ///
    /// let mut owners = Owners::new();
    /// let adder = owners.insert_with(|id| Adder::new(id, 3));
    /// let mut dofs = GlobalDofs::from_functions(&owners, vec![Adder::function(adder)]).unwrap();
    ///
    /// let jac = dofs.fd_jac(&mut owners, true).unwrap();
    /// assert_eq!(jac.dim(), (1, 3));
    /// assert!(jac.iter().all(|d| (d - 1.0).abs() < 1e-8));
    /// ```
    pub fn fd_jac(&mut self, owners: &mut Owners, centered: bool) -> Result<Array2<f64>> {
        if self.shape.lengths().is_none() {
            self.f(owners)?;
        }

        let all: Vec<usize> = (0..self.functions.len()).collect();
        let config = DiffConfig {
            centered,
            ..self.config
        };
        self.numeric_block(owners, &all, config)
    }

    /// Finite-difference rows of the functions at `which`, stacked in that
    /// order.
    fn numeric_block(
        &self,
        owners: &mut Owners,
        which: &[usize],
        config: DiffConfig,
    ) -> Result<Array2<f64>> {
        let x0 = self.x(owners)?;
        let f0 = self.evaluate_subset(owners, which)?;

        debug!(
            "Finite-difference sweep over {} columns for {} functions (centered = {})",
            x0.len(),
            which.len(),
            config.centered
        );

        let mut probe = OwnerProbe {
            dofs: self,
            owners,
            functions: which,
        };
        finite_difference::jacobian(&mut probe, &x0, &f0, &config)
    }
}
