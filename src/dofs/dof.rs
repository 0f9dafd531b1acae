//! A single degree of freedom.
//!
//! A [`Dof`] is one named scalar bound to one owner. It carries a value,
//! bounds and a fixed flag; only free DOFs take part in the global
//! optimization vector.

use crate::dofs::bounds::Bounds;
use crate::error::Result;
use crate::owner::OwnerId;
use serde::{Deserialize, Serialize};

/// One named scalar parameter of an owner.
///
/// Equality compares the owner handle, the name and the value; bounds and the
/// fixed flag are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dof {
    /// Owner this DOF belongs to (non-owning handle)
    owner: OwnerId,

    /// Name, unique for its owner within a registry
    name: String,

    /// Current value
    value: f64,

    /// Whether the DOF is excluded from optimization
    #[serde(default)]
    fixed: bool,

    /// Lower and upper bounds
    #[serde(default)]
    bounds: Bounds,
}

impl PartialEq for Dof {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name && self.value == other.value
    }
}

impl Dof {
    /// Create a free, unbounded DOF.
    ///
    /// # Examples
    ///
    /// ```
    /// use dofopt_rs::dofs::Dof;
    /// use dofopt_rs::owner::OwnerId;
    ///
    /// let dof = Dof::new(OwnerId::default(), "x", 2.0);
    /// assert_eq!(dof.name(), "x");
    /// assert_eq!(dof.value(), 2.0);
    /// assert!(dof.is_free());
    /// ```
    pub fn new(owner: OwnerId, name: &str, value: f64) -> Self {
        Self {
            owner,
            name: name.to_string(),
            value,
            fixed: false,
            bounds: Bounds::default(),
        }
    }

    /// Builder-style setter for the fixed flag.
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Builder-style setter for the bounds.
    ///
    /// The value is not clamped; see [`set_bounds`](Dof::set_bounds).
    pub fn with_bounds(mut self, min: f64, max: f64) -> Result<Self> {
        self.set_bounds(min, max)?;
        Ok(self)
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value. Bounds are not checked.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn is_free(&self) -> bool {
        !self.fixed
    }

    /// Exclude this DOF from optimization.
    pub fn fix(&mut self) {
        self.fixed = true;
    }

    /// Include this DOF in optimization.
    pub fn unfix(&mut self) {
        self.fixed = false;
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Replace both bounds.
    ///
    /// `min <= max` is enforced. A current value outside the new bounds is
    /// kept as is and reported with a warning.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<()> {
        self.bounds = Bounds::new(min, max)?;

        if !self.bounds.is_within_bounds(self.value) {
            tracing::warn!(
                dof = %self.name,
                value = self.value,
                min,
                max,
                "DOF value lies outside its new bounds"
            );
        }

        Ok(())
    }

    pub fn set_min(&mut self, min: f64) -> Result<()> {
        self.set_bounds(min, self.bounds.max)
    }

    pub fn set_max(&mut self, max: f64) -> Result<()> {
        self.set_bounds(self.bounds.min, max)
    }
}
