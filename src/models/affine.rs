//! Vector-valued affine owner, `y = A·x + B`.

use crate::dofs::{Dof, DofRegistry};
use crate::error::{DofError, Result};
use crate::function::Function;
use crate::models::free_columns;
use crate::owner::{Optimizable, OwnerId};
use ndarray::{Array1, Array2};
use rand::Rng;

/// Owner computing `A·x + B` from its DOF vector `x`.
#[derive(Debug, Clone)]
pub struct Affine {
    a: Array2<f64>,
    b: Array1<f64>,
    dofs: DofRegistry,
    depends_on: Vec<OwnerId>,
}

impl Affine {
    /// Create an affine map from explicit coefficients. DOFs start at zero.
    ///
    /// # Errors
    ///
    /// [`DofError::DimensionMismatch`] if `b` does not have one entry per row
    /// of `a`.
    pub fn new(id: OwnerId, a: Array2<f64>, b: Array1<f64>) -> Result<Self> {
        if a.nrows() != b.len() {
            return Err(DofError::DimensionMismatch(format!(
                "A has {} rows but B has {} entries",
                a.nrows(),
                b.len()
            )));
        }

        let dofs = (0..a.ncols())
            .map(|i| Dof::new(id, &format!("x{}", i), 0.0))
            .collect();

        Ok(Self {
            a,
            b,
            dofs,
            depends_on: Vec::new(),
        })
    }

    /// Create an affine map with coefficients drawn uniformly from `[-1, 1)`.
    pub fn random<R: Rng>(id: OwnerId, nparams: usize, nvals: usize, rng: &mut R) -> Self {
        let a = Array2::from_shape_simple_fn((nvals, nparams), || rng.gen_range(-1.0..1.0));
        let b = Array1::from_shape_simple_fn(nvals, || rng.gen_range(-1.0..1.0));

        Self {
            a,
            b,
            dofs: (0..nparams)
                .map(|i| Dof::new(id, &format!("x{}", i), 0.0))
                .collect(),
            depends_on: Vec::new(),
        }
    }

    pub fn set_depends_on(&mut self, depends_on: Vec<OwnerId>) {
        self.depends_on = depends_on;
    }

    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    pub fn b(&self) -> &Array1<f64> {
        &self.b
    }

    /// Full DOF vector, checked against the column count of `A`.
    fn checked_x(&self) -> Result<Array1<f64>> {
        let x = self.dofs.full_x();
        if x.len() != self.a.ncols() {
            return Err(DofError::DimensionMismatch(format!(
                "A has {} columns but the registry holds {} DOFs",
                self.a.ncols(),
                x.len()
            )));
        }
        Ok(x)
    }

    /// `A·x + B` over the full DOF vector.
    ///
    /// # Errors
    ///
    /// [`DofError::DimensionMismatch`] if the registry no longer has one
    /// entry per column of `A`.
    pub fn value(&self) -> Result<Array1<f64>> {
        Ok(self.a.dot(&self.checked_x()?) + &self.b)
    }

    /// Columns of `A` belonging to free DOFs.
    pub fn jacobian(&self) -> Result<Array2<f64>> {
        self.checked_x()?;
        Ok(free_columns(&self.a, &self.dofs))
    }

    /// The affine function with its analytic Jacobian.
    pub fn function(id: OwnerId) -> Function {
        Function::try_of(id, "affine", |affine: &Affine| affine.value())
            .with_try_jacobian_of(|affine: &Affine| affine.jacobian())
    }
}

impl Optimizable for Affine {
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
