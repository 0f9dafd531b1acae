//! Owner whose output is the sum of its DOFs.

use crate::dofs::{Dof, DofRegistry};
use crate::error::{DofError, Result};
use crate::function::Function;
use crate::owner::{Optimizable, OwnerId};
use ndarray::Array2;

/// Owner with `n` DOFs; its function returns their sum.
#[derive(Debug, Clone)]
pub struct Adder {
    dofs: DofRegistry,
    depends_on: Vec<OwnerId>,
}

impl Adder {
    /// Create an adder with `n` zero-valued DOFs named `x0`, `x1`, ...
    pub fn new(id: OwnerId, n: usize) -> Self {
        Self {
            dofs: (0..n).map(|i| Dof::new(id, &format!("x{}", i), 0.0)).collect(),
            depends_on: Vec::new(),
        }
    }

    /// Create an adder with explicit initial values and DOF names.
    ///
    /// # Errors
    ///
    /// [`DofError::DimensionMismatch`] if the slices differ in length,
    /// [`DofError::DuplicateDof`] if a name repeats.
    pub fn with_names(id: OwnerId, values: &[f64], names: &[&str]) -> Result<Self> {
        if values.len() != names.len() {
            return Err(DofError::DimensionMismatch(format!(
                "{} values for {} names",
                values.len(),
                names.len()
            )));
        }

        let dofs = names
            .iter()
            .zip(values)
            .map(|(name, &value)| Dof::new(id, name, value))
            .collect();

        Ok(Self {
            dofs: DofRegistry::from_dofs(dofs)?,
            depends_on: Vec::new(),
        })
    }

    /// Builder-style form of [`set_depends_on`](Adder::set_depends_on).
    pub fn depending_on(mut self, depends_on: Vec<OwnerId>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn set_depends_on(&mut self, depends_on: Vec<OwnerId>) {
        self.depends_on = depends_on;
    }

    /// Sum over all DOFs, fixed ones included.
    pub fn sum(&self) -> f64 {
        self.dofs.full_x().sum()
    }

    /// The sum function, with its analytic Jacobian (a row of ones over the
    /// free DOFs).
    pub fn function(id: OwnerId) -> Function {
        Function::of(id, "sum", |adder: &Adder| adder.sum())
            .with_jacobian_of(|adder: &Adder| Array2::ones((1, adder.dofs.free_count())))
    }
}

impl Optimizable for Adder {
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
