//! Two-DOF Rosenbrock owner exposing its residual terms.

use crate::dofs::{Dof, DofRegistry};
use crate::error::{DofError, Result};
use crate::function::Function;
use crate::models::free_columns;
use crate::owner::{Optimizable, OwnerId};
use ndarray::{array, s, Array1, Array2};

/// Owner with DOFs `x` and `y` and residual terms
///
/// - `term1 = x - a`
/// - `term2 = (x² - y) / b`
#[derive(Debug, Clone)]
pub struct Rosenbrock {
    a: f64,
    b: f64,
    dofs: DofRegistry,
    depends_on: Vec<OwnerId>,
}

impl Rosenbrock {
    /// Create a Rosenbrock owner with `a = 1`, `b = 100` and `x = y = 0`.
    pub fn new(id: OwnerId) -> Self {
        Self {
            a: 1.0,
            b: 100.0,
            dofs: [Dof::new(id, "x", 0.0), Dof::new(id, "y", 0.0)]
                .into_iter()
                .collect(),
            depends_on: Vec::new(),
        }
    }

    /// Create a Rosenbrock owner with custom coefficients.
    ///
    /// # Errors
    ///
    /// [`DofError::InvalidInput`] if `b` is zero or not finite.
    pub fn with_coefficients(id: OwnerId, a: f64, b: f64) -> Result<Self> {
        if b == 0.0 || !b.is_finite() || !a.is_finite() {
            return Err(DofError::InvalidInput(format!(
                "Rosenbrock coefficients must be finite with b != 0, got a = {}, b = {}",
                a, b
            )));
        }

        Ok(Self {
            a,
            b,
            ..Self::new(id)
        })
    }

    pub fn set_depends_on(&mut self, depends_on: Vec<OwnerId>) {
        self.depends_on = depends_on;
    }

    /// Current `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`DofError::DimensionMismatch`] if entries were added to or removed
    /// from the registry.
    fn xy(&self) -> Result<(f64, f64)> {
        let x = self.dofs.full_x();
        if x.len() != 2 {
            return Err(DofError::DimensionMismatch(format!(
                "Rosenbrock needs 2 DOFs, registry holds {}",
                x.len()
            )));
        }
        Ok((x[0], x[1]))
    }

    pub fn term1(&self) -> Result<f64> {
        let (x, _) = self.xy()?;
        Ok(x - self.a)
    }

    pub fn term2(&self) -> Result<f64> {
        let (x, y) = self.xy()?;
        Ok((x * x - y) / self.b)
    }

    /// Both terms as a vector.
    pub fn terms(&self) -> Result<Array1<f64>> {
        Ok(array![self.term1()?, self.term2()?])
    }

    /// Jacobian of [`terms`](Rosenbrock::terms) over the free DOFs.
    pub fn terms_jacobian(&self) -> Result<Array2<f64>> {
        let (x, _) = self.xy()?;
        let full = array![[1.0, 0.0], [2.0 * x / self.b, -1.0 / self.b]];
        Ok(free_columns(&full, &self.dofs))
    }

    pub fn term1_function(id: OwnerId) -> Function {
        Function::try_of(id, "term1", |r: &Rosenbrock| r.term1()).with_try_jacobian_of(
            |r: &Rosenbrock| Ok(r.terms_jacobian()?.slice_move(s![0..1, ..])),
        )
    }

    pub fn term2_function(id: OwnerId) -> Function {
        Function::try_of(id, "term2", |r: &Rosenbrock| r.term2()).with_try_jacobian_of(
            |r: &Rosenbrock| Ok(r.terms_jacobian()?.slice_move(s![1..2, ..])),
        )
    }

    pub fn terms_function(id: OwnerId) -> Function {
        Function::try_of(id, "terms", |r: &Rosenbrock| r.terms())
            .with_try_jacobian_of(|r: &Rosenbrock| r.terms_jacobian())
    }
}

impl Optimizable for Rosenbrock {
    fn depends_on(&self) -> Vec<OwnerId> {
        self.depends_on.clone()
    }

    fn dofs(&self) -> Option<&DofRegistry> {
        Some(&self.dofs)
    }

    fn dofs_mut(&mut self) -> Option<&mut DofRegistry> {
        Some(&mut self.dofs)
    }
}
