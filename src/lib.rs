//! # dofopt-rs
//!
//! `dofopt-rs` joins the parameters of many interdependent objects into one
//! least-squares problem.
//!
//! Objects ("owners") expose a subset of their scalar parameters as degrees
//! of freedom (DOFs) that can be fixed or freed individually. Given a list of
//! owner-bound evaluation functions, the library discovers every owner the
//! functions depend on, builds the global vector of free parameters, stacks
//! the function outputs, and assembles the Jacobian analytically or by finite
//! differences.
//!
//! The library provides:
//! - Owner-local DOF registries with bounds and free/fixed bookkeeping
//! - Cycle-checked dependency discovery across owners
//! - A global parameter vector that writes through to the owners
//! - Analytic and finite-difference Jacobians
//! - A least-squares [`Problem`] view for external solvers
//!
//! ## Basic Usage
//!
//! ```
//! use dofopt_rs::aggregator::GlobalDofs;
//! use dofopt_rs::models::{Adder, Rosenbrock};
//! use dofopt_rs::owner::{Optimizable, Owners};
//!
//! let mut owners = Owners::new();
//! let adder = owners.insert_with(|id| Adder::new(id, 3));
//! let rosen = owners.insert_with(Rosenbrock::new);
//!
//! // Keep the second adder input out of the optimization
//! owners.get_mut(adder)?.dofs_mut().unwrap().fix("x1")?;
//!
//! let mut dofs = GlobalDofs::from_functions(
//!     &owners,
//!     vec![Adder::function(adder), Rosenbrock::terms_function(rosen)],
//! )?;
//!
//! assert_eq!(dofs.len(), 4);
//! assert_eq!(dofs.f(&owners)?.len(), 3);
//! assert_eq!(dofs.jac(&mut owners)?.dim(), (3, 4));
//! # Ok::<(), dofopt_rs::DofError>(())
//! ```

pub mod aggregator;
pub mod dofs;
pub mod error;
pub mod function;
pub mod graph;
pub mod jacobian;
pub mod models;
pub mod owner;
pub mod problem;

// Re-exports for convenience
pub use aggregator::GlobalDofs;
pub use dofs::{Dof, DofRegistry};
pub use error::{DofError, Result};
pub use function::{Function, FunctionOutput};
pub use jacobian::DiffConfig;
pub use owner::{Optimizable, OwnerId, Owners};
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
