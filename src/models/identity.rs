//! Single-DOF owner whose output is its own value.

use crate::dofs::{Dof, DofRegistry};
use crate::function::Function;
use crate::owner::{Optimizable, OwnerId};
use ndarray::Array2;

/// Owner with one DOF; its function returns the DOF value.
#[derive(Debug, Clone)]
pub struct Identity {
    dofs: DofRegistry,
    depends_on: Vec<OwnerId>,
}

impl Identity {
    /// Create an identity with a DOF named `x`.
    pub fn new(id: OwnerId, value: f64) -> Self {
        Self::with_name(id, value, "x")
    }

    /// Create an identity with a custom DOF name.
    pub fn with_name(id: OwnerId, value: f64, name: &str) -> Self {
        Self {
            dofs: [Dof::new(id, name, value)].into_iter().collect(),
            depends_on: Vec::new(),
        }
    }

    /// Builder-style form of [`set_depends_on`](Identity::set_depends_on).
    pub fn depending_on(mut self, depends_on: Vec<OwnerId>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn set_depends_on(&mut self, depends_on: Vec<OwnerId>) {
        self.depends_on = depends_on;
    }

    /// Current value of the DOF; zero if it was removed from the registry.
    pub fn value(&self) -> f64 {
        self.dofs.iter().next().map_or(0.0, Dof::value)
    }

    /// The identity function `f = x`, with its analytic Jacobian.
    pub fn function(id: OwnerId) -> Function {
        Function::of(id, "identity", |identity: &Identity| identity.value()).with_jacobian_of(
            |identity: &Identity| Array2::ones((1, identity.dofs.free_count())),
        )
    }
}

impl Optimizable for Identity {
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
