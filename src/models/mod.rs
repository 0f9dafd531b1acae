//! Built-in owners.
//!
//! Small owners with closed-form outputs and analytic Jacobians. They are
//! handy as building blocks in tests and benchmarks and show how an owner is
//! wired up: keep a [`DofRegistry`](crate::dofs::DofRegistry) tagged with the
//! owner's own handle, expose it through
//! [`Optimizable`](crate::owner::Optimizable), and hand out
//! [`Function`](crate::function::Function)s bound to that handle.

mod adder;
mod affine;
mod identity;
mod rosenbrock;

pub use adder::Adder;
pub use affine::Affine;
pub use identity::Identity;
pub use rosenbrock::Rosenbrock;

use crate::dofs::DofRegistry;
use ndarray::{Array2, Axis};

/// Keep only the Jacobian columns that belong to free DOFs.
pub(crate) fn free_columns(full: &Array2<f64>, dofs: &DofRegistry) -> Array2<f64> {
    full.select(Axis(1), &dofs.free_indices())
}
