//! Owners and the arena that holds them.
//!
//! An owner is any object that carries parameters and can be referenced by
//! evaluation functions. Owners live in an [`Owners`] arena and are referred
//! to everywhere else through copyable [`OwnerId`] handles, so DOFs,
//! registries and aggregators never control an owner's lifetime. A handle to a
//! removed owner is detected on access instead of dangling.

use crate::dofs::DofRegistry;
use crate::error::{DofError, Result};
use ndarray::Array1;
use slotmap::{new_key_type, SlotMap};
use std::any::Any;

new_key_type! {
    /// Non-owning handle to an owner stored in an [`Owners`] arena.
    pub struct OwnerId;
}

/// Upcast helper so owners can be downcast to their concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Capabilities an owner exposes to the DOF machinery.
///
/// Every method has a default, so the smallest owner is an empty `impl`.
/// Owners with a [`DofRegistry`] get parameter access for free; owners without
/// one must override [`full_x`](Optimizable::full_x) and
/// [`set_full_x`](Optimizable::set_full_x), and all their parameters are
/// treated as free.
pub trait Optimizable: AsAny {
    /// Owners this owner reads from when it is evaluated, in order.
    fn depends_on(&self) -> Vec<OwnerId> {
        Vec::new()
    }

    /// The owner's local DOF registry, if it keeps one.
    fn dofs(&self) -> Option<&DofRegistry> {
        None
    }

    /// Mutable access to the owner's local DOF registry.
    fn dofs_mut(&mut self) -> Option<&mut DofRegistry> {
        None
    }

    /// The full local parameter vector, fixed entries included.
    fn full_x(&self) -> Array1<f64> {
        self.dofs()
            .map(|dofs| dofs.full_x())
            .unwrap_or_else(|| Array1::zeros(0))
    }

    /// Overwrite the full local parameter vector.
    ///
    /// Owners that cache derived state should override this and invalidate
    /// their cache after delegating to the registry.
    fn set_full_x(&mut self, x: &Array1<f64>) -> Result<()> {
        match self.dofs_mut() {
            Some(dofs) => dofs.set_full_x(x),
            None if x.is_empty() => Ok(()),
            None => Err(DofError::DimensionMismatch(format!(
                "owner has no parameters, got a vector of length {}",
                x.len()
            ))),
        }
    }

    /// Short name used in log events and error messages.
    fn label(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }
}

/// Arena holding every owner taking part in an optimization.
#[derive(Default)]
pub struct Owners {
    slots: SlotMap<OwnerId, Box<dyn Optimizable>>,
}

impl Owners {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an owner that does not need to know its own handle.
    pub fn insert<O: Optimizable + 'static>(&mut self, owner: O) -> OwnerId {
        self.slots.insert(Box::new(owner))
    }

    /// Insert an owner built from its own handle.
    ///
    /// Owners with a registry need their handle to tag their DOFs, so the
    /// handle is allocated first and passed to `build`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dofopt_rs::models::Adder;
    /// use dofopt_rs::owner::Owners;
    ///
    /// let mut owners = Owners::new();
    /// let id = owners.insert_with(|id| Adder::new(id, 3));
    /// assert_eq!(owners.get(id).unwrap().full_x().len(), 3);
    /// ```
    pub fn insert_with<O, F>(&mut self, build: F) -> OwnerId
    where
        O: Optimizable + 'static,
        F: FnOnce(OwnerId) -> O,
    {
        self.slots
            .insert_with_key(|id| Box::new(build(id)) as Box<dyn Optimizable>)
    }

    /// Remove an owner. Handles to it become stale.
    pub fn remove(&mut self, id: OwnerId) -> Option<Box<dyn Optimizable>> {
        self.slots.remove(id)
    }

    pub fn contains(&self, id: OwnerId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Look up an owner by handle.
    pub fn get(&self, id: OwnerId) -> Result<&dyn Optimizable> {
        self.slots
            .get(id)
            .map(|owner| owner.as_ref())
            .ok_or_else(|| DofError::UnknownOwner(format!("{:?}", id)))
    }

    /// Look up an owner mutably by handle.
    pub fn get_mut(&mut self, id: OwnerId) -> Result<&mut dyn Optimizable> {
        match self.slots.get_mut(id) {
            Some(owner) => Ok(owner.as_mut()),
            None => Err(DofError::UnknownOwner(format!("{:?}", id))),
        }
    }

    /// Look up an owner and downcast it to its concrete type.
    pub fn get_as<T: Optimizable + 'static>(&self, id: OwnerId) -> Result<&T> {
        let owner = self.get(id)?;
        owner
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| DofError::OwnerTypeMismatch {
                owner: format!("{:?}", id),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// Mutable counterpart of [`get_as`](Owners::get_as).
    pub fn get_as_mut<T: Optimizable + 'static>(&mut self, id: OwnerId) -> Result<&mut T> {
        let owner = self.get_mut(id)?;
        owner
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| DofError::OwnerTypeMismatch {
                owner: format!("{:?}", id),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// Iterate over all handles in the arena.
    pub fn ids(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.slots.keys()
    }

    /// Label of an owner for diagnostics, falling back to the raw handle.
    pub fn label(&self, id: OwnerId) -> String {
        match self.slots.get(id) {
            Some(owner) => format!("{}{:?}", owner.label(), id),
            None => format!("{:?}", id),
        }
    }
}

impl std::fmt::Debug for Owners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(id, owner)| (id, owner.label())))
            .finish()
    }
}
