//! # Global DOF aggregation
//!
//! [`GlobalDofs`] joins the parameters of every owner reachable from a set of
//! [`Function`]s into one global free-parameter vector.
//!
//! Construction walks the dependency graph of each function's owner, merges the
//! results in first-seen order and appends the free entries of every owner in
//! its registry order. Each global entry remembers where it came from (owner
//! handle and position in that owner's full parameter vector), which is what
//! [`GlobalDofs::set_x`] uses to route values back.
//!
//! The aggregate is a view. It reads and writes parameter values through the
//! owners and never caches them, but the mapping itself is fixed at
//! construction: fixing or freeing an owner's DOFs afterwards requires building
//! a new aggregate (see [`GlobalDofs::needs_rebuild`]).
//!
//! ## Example
//!
//! ```rust
//! use dofopt_rs::aggregator::GlobalDofs;
//! use dofopt_rs::models::{Adder, Identity};
//! use dofopt_rs::owner::Owners;
//! use ndarray::array;
//!
//! let mut owners = Owners::new();
//! let adder = owners.insert_with(|id| Adder::new(id, 2));
//! let identity = owners.insert_with(|id| Identity::new(id, 5.0));
//!
//! let mut dofs = GlobalDofs::from_functions(
//!     &owners,
//!     vec![Adder::function(adder), Identity::function(identity)],
//! ).unwrap();
//!
//! assert_eq!(dofs.len(), 3);
//! dofs.set_x(&mut owners, &array![1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(dofs.f(&owners).unwrap(), array![3.0, 3.0]);
//! ```

mod evaluator;

pub use evaluator::OutputShape;

use crate::dofs::{Bounds, DofRegistry};
use crate::error::{DofError, Result};
use crate::function::Function;
use crate::graph::collect_owners;
use crate::jacobian::DiffConfig;
use crate::owner::{Optimizable, OwnerId, Owners};
use ndarray::Array1;
use std::borrow::Cow;
use std::ops::Range;
use tracing::debug;

/// Contiguous run of global columns belonging to one owner.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OwnerBlock {
    pub(crate) owner: OwnerId,
    pub(crate) columns: Range<usize>,
}

/// Global parameter vector over the owners reachable from a list of functions.
#[derive(Debug)]
pub struct GlobalDofs {
    pub(crate) functions: Vec<Function>,
    pub(crate) all_owners: Vec<OwnerId>,
    pub(crate) blocks: Vec<OwnerBlock>,
    pub(crate) dof_owners: Vec<OwnerId>,
    pub(crate) indices: Vec<usize>,
    pub(crate) names: Vec<String>,
    pub(crate) bounds: Vec<Bounds>,
    pub(crate) shape: OutputShape,
    pub(crate) config: DiffConfig,
}

impl GlobalDofs {
    /// Build the aggregate for `functions`.
    ///
    /// # Errors
    ///
    /// - [`DofError::CyclicDependency`] if an owner's dependencies loop back
    /// - [`DofError::UnknownOwner`] if a function or dependency handle is stale
    pub fn from_functions(owners: &Owners, functions: Vec<Function>) -> Result<Self> {
        let all_owners = collect_owners(owners, functions.iter().map(Function::owner))?;

        let mut blocks = Vec::with_capacity(all_owners.len());
        let mut dof_owners = Vec::new();
        let mut indices = Vec::new();
        let mut names = Vec::new();
        let mut bounds = Vec::new();

        for &id in &all_owners {
            let registry = local_registry(id, owners.get(id)?);
            let start = dof_owners.len();

            for (local, dof) in registry.iter().enumerate().filter(|(_, d)| d.is_free()) {
                dof_owners.push(id);
                indices.push(local);
                names.push(dof.name().to_string());
                bounds.push(*dof.bounds());
            }

            blocks.push(OwnerBlock {
                owner: id,
                columns: start..dof_owners.len(),
            });
        }

        debug!(
            "Aggregated {} functions over {} owners with {} free DOFs",
            functions.len(),
            all_owners.len(),
            dof_owners.len()
        );

        Ok(Self {
            functions,
            all_owners,
            blocks,
            dof_owners,
            indices,
            names,
            bounds,
            shape: OutputShape::Unknown,
            config: DiffConfig::default(),
        })
    }

    /// Replace the finite-difference settings used by
    /// [`jac`](GlobalDofs::jac).
    ///
    /// # Errors
    ///
    /// [`DofError::InvalidConfig`] if the step is not a positive finite number.
    pub fn with_config(mut self, config: DiffConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Number of free parameters in the global vector.
    pub fn len(&self) -> usize {
        self.dof_owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dof_owners.is_empty()
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Every owner involved, deduplicated in first-seen order.
    pub fn all_owners(&self) -> &[OwnerId] {
        &self.all_owners
    }

    /// Owner of each global entry.
    pub fn dof_owners(&self) -> &[OwnerId] {
        &self.dof_owners
    }

    /// Position of each global entry in its owner's full parameter vector.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Name of each global entry as recorded in its owner's registry.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn lower_bounds(&self) -> Array1<f64> {
        self.bounds.iter().map(|b| b.min).collect()
    }

    pub fn upper_bounds(&self) -> Array1<f64> {
        self.bounds.iter().map(|b| b.max).collect()
    }

    /// Global columns holding `owner`'s free parameters. Empty for an owner
    /// that is not part of the aggregate.
    pub fn owner_columns(&self, owner: OwnerId) -> Range<usize> {
        self.blocks
            .iter()
            .find(|block| block.owner == owner)
            .map_or(0..0, |block| block.columns.clone())
    }

    /// Current global vector, read from the owners.
    pub fn x(&self, owners: &Owners) -> Result<Array1<f64>> {
        let mut x = Array1::zeros(self.len());

        for block in self.blocks.iter().filter(|b| !b.columns.is_empty()) {
            let full = owners.get(block.owner)?.full_x();
            for column in block.columns.clone() {
                let local = self.indices[column];
                x[column] = *full.get(local).ok_or_else(|| stale_layout(owners, block))?;
            }
        }

        Ok(x)
    }

    /// Write a global vector back into the owners.
    ///
    /// Every affected owner receives one `set_full_x` call with its fixed
    /// entries unchanged.
    ///
    /// # Errors
    ///
    /// [`DofError::DimensionMismatch`] if `x` does not have one entry per free
    /// parameter.
    pub fn set_x(&self, owners: &mut Owners, x: &Array1<f64>) -> Result<()> {
        if x.len() != self.len() {
            return Err(DofError::DimensionMismatch(format!(
                "expected a global vector of length {}, got {}",
                self.len(),
                x.len()
            )));
        }

        for block in self.blocks.iter().filter(|b| !b.columns.is_empty()) {
            let mut full = owners.get(block.owner)?.full_x();
            for column in block.columns.clone() {
                let local = self.indices[column];
                let slot = full
                    .get_mut(local)
                    .ok_or_else(|| stale_layout(owners, block))?;
                *slot = x[column];
            }
            owners.get_mut(block.owner)?.set_full_x(&full)?;
        }

        Ok(())
    }

    /// Whether the owners' free sets no longer match this aggregate.
    ///
    /// True when an owner was removed or when fixing, freeing or a structural
    /// registry edit changed which local entries are free.
    pub fn needs_rebuild(&self, owners: &Owners) -> bool {
        self.blocks.iter().any(|block| match owners.get(block.owner) {
            Ok(owner) => {
                let current = local_registry(block.owner, owner).free_indices();
                current.as_slice() != &self.indices[block.columns.clone()]
            }
            Err(_) => true,
        })
    }
}

/// The owner's registry, or an all-free one synthesized from its parameters.
fn local_registry(id: OwnerId, owner: &dyn Optimizable) -> Cow<'_, DofRegistry> {
    match owner.dofs() {
        Some(registry) => Cow::Borrowed(registry),
        None => Cow::Owned(DofRegistry::synthesized(id, &owner.full_x())),
    }
}

fn stale_layout(owners: &Owners, block: &OwnerBlock) -> DofError {
    DofError::DimensionMismatch(format!(
        "parameters of {} shrank since the aggregate was built",
        owners.label(block.owner)
    ))
}
