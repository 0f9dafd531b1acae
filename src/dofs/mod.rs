//! # Degrees of Freedom
//!
//! Owner-local bookkeeping of optimizable parameters.
//!
//! ## Core Components
//!
//! - [`Dof`]: one named scalar with a value, bounds and a fixed flag
//! - [`DofRegistry`]: an ordered, name-addressable list of DOFs kept by an owner
//! - [`Bounds`]: lower/upper bound pair
//!
//! ## Example Usage
//!
//! ```rust
//! use dofopt_rs::dofs::{Dof, DofRegistry};
//! use dofopt_rs::owner::OwnerId;
//!
//! let owner = OwnerId::default();
//! let mut dofs = DofRegistry::from_dofs(vec![
//!     Dof::new(owner, "rc00", 1.0),
//!     Dof::new(owner, "rc01", 0.1),
//!     Dof::new(owner, "zs01", 0.1),
//! ]).unwrap();
//!
//! // Only rc00 is optimized
//! dofs.fix_all();
//! dofs.unfix("rc00").unwrap();
//!
//! assert_eq!(dofs.x().to_vec(), vec![1.0]);
//! assert_eq!(dofs.full_x().len(), 3);
//! ```

pub mod bounds;
pub mod dof;
pub mod registry;


pub use bounds::Bounds;
pub use dof::Dof;
pub use registry::{DofKey, DofRegistry};
