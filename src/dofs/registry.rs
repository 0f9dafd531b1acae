//! Ordered registry of DOFs.
//!
//! A [`DofRegistry`] is the local DOF container of an owner: an ordered list
//! of [`Dof`] records addressable by position or by name. Entries carry their
//! own owner handle, so a registry may hold DOFs of several owners after
//! replacement or concatenation.

use crate::dofs::dof::Dof;
use crate::error::{DofError, Result};
use crate::owner::OwnerId;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Address of an entry in a [`DofRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofKey<'a> {
    /// Position in the current ordering
    Index(usize),
    /// Name of the entry; the first match wins
    Name(&'a str),
}

impl From<usize> for DofKey<'_> {
    fn from(index: usize) -> Self {
        DofKey::Index(index)
    }
}

impl<'a> From<&'a str> for DofKey<'a> {
    fn from(name: &'a str) -> Self {
        DofKey::Name(name)
    }
}

impl<'a> From<&'a String> for DofKey<'a> {
    fn from(name: &'a String) -> Self {
        DofKey::Name(name.as_str())
    }
}

impl fmt::Display for DofKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DofKey::Index(index) => write!(f, "at index {}", index),
            DofKey::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Ordered collection of DOFs.
///
/// Deserialization goes through [`from_dofs`](DofRegistry::from_dofs), so a
/// document repeating an (owner, name) pair is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DofRegistry {
    dofs: Vec<Dof>,
}

impl DofRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of DOFs, rejecting duplicate
    /// (owner, name) pairs.
    pub fn from_dofs(dofs: Vec<Dof>) -> Result<Self> {
        let mut registry = Self::new();
        for dof in dofs {
            registry.push(dof)?;
        }
        Ok(registry)
    }

    /// Registry for an owner that keeps none: every value becomes a free DOF
    /// named `x0`, `x1`, ...
    pub fn synthesized(owner: OwnerId, values: &Array1<f64>) -> Self {
        Self {
            dofs: values
                .iter()
                .enumerate()
                .map(|(i, &v)| Dof::new(owner, &format!("x{}", i), v))
                .collect(),
        }
    }

    /// Resolve a key to a position.
    ///
    /// # Errors
    ///
    /// [`DofError::IndexOutOfRange`] for an unknown name as well as for an
    /// index past the end.
    pub fn position<'k>(&self, key: impl Into<DofKey<'k>>) -> Result<usize> {
        let key = key.into();
        let found = match key {
            DofKey::Index(index) => (index < self.dofs.len()).then_some(index),
            DofKey::Name(name) => self.dofs.iter().position(|dof| dof.name() == name),
        };

        found.ok_or_else(|| self.out_of_range(key))
    }

    fn out_of_range(&self, key: DofKey<'_>) -> DofError {
        DofError::IndexOutOfRange {
            key: key.to_string(),
            len: self.dofs.len(),
        }
    }

    /// Look up an entry by index or name.
    ///
    /// # Examples
    ///
    /// ```
    /// use dofopt_rs::dofs::{Dof, DofRegistry};
    /// use dofopt_rs::owner::OwnerId;
    ///
    /// let owner = OwnerId::default();
    /// let registry = DofRegistry::from_dofs(vec![
    ///     Dof::new(owner, "x", 2.0),
    ///     Dof::new(owner, "y", 3.0),
    /// ]).unwrap();
    ///
    /// assert_eq!(registry.get(1).unwrap().name(), "y");
    /// assert_eq!(registry.get("x").unwrap().value(), 2.0);
    /// assert!(registry.get("w").is_err());
    /// assert!(registry.get(2).is_err());
    /// ```
    pub fn get<'k>(&self, key: impl Into<DofKey<'k>>) -> Result<&Dof> {
        let index = self.position(key)?;
        Ok(&self.dofs[index])
    }

    /// Mutable lookup by index or name.
    pub fn get_mut<'k>(&mut self, key: impl Into<DofKey<'k>>) -> Result<&mut Dof> {
        let index = self.position(key)?;
        Ok(&mut self.dofs[index])
    }

    /// Replace the entry at `index`, returning the previous one.
    ///
    /// The replacement may belong to another owner; the length is unchanged.
    pub fn set(&mut self, index: usize, dof: Dof) -> Result<Dof> {
        let index = self.position(index)?;
        Ok(std::mem::replace(&mut self.dofs[index], dof))
    }

    /// Remove one entry by index or name, shifting later entries down.
    pub fn remove<'k>(&mut self, key: impl Into<DofKey<'k>>) -> Result<Dof> {
        let index = self.position(key)?;
        Ok(self.dofs.remove(index))
    }

    /// Append a DOF.
    pub fn push(&mut self, dof: Dof) -> Result<()> {
        self.check_unique(&dof)?;
        self.dofs.push(dof);
        Ok(())
    }

    /// Insert a DOF at `index`, shifting later entries up. `index == len()`
    /// appends.
    pub fn insert(&mut self, index: usize, dof: Dof) -> Result<()> {
        if index > self.dofs.len() {
            return Err(self.out_of_range(DofKey::Index(index)));
        }
        self.check_unique(&dof)?;
        self.dofs.insert(index, dof);
        Ok(())
    }

    fn check_unique(&self, dof: &Dof) -> Result<()> {
        let taken = self
            .dofs
            .iter()
            .any(|d| d.owner() == dof.owner() && d.name() == dof.name());
        if taken {
            return Err(DofError::DuplicateDof {
                name: dof.name().to_string(),
            });
        }
        Ok(())
    }

    /// Remove and return the last entry.
    pub fn pop(&mut self) -> Option<Dof> {
        self.dofs.pop()
    }

    /// Reverse the ordering in place.
    pub fn reverse(&mut self) {
        self.dofs.reverse();
    }

    pub fn len(&self) -> usize {
        self.dofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dofs.is_empty()
    }

    /// Check whether a key addresses an entry.
    pub fn contains<'k>(&self, key: impl Into<DofKey<'k>>) -> bool {
        self.position(key).is_ok()
    }

    /// Check whether an equal DOF (owner, name, value) is present.
    pub fn contains_dof(&self, dof: &Dof) -> bool {
        self.dofs.iter().any(|d| d == dof)
    }

    /// Iterate in the current ordering; `.rev()` iterates backwards.
    pub fn iter(&self) -> std::slice::Iter<'_, Dof> {
        self.dofs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Dof> {
        self.dofs.iter_mut()
    }

    /// Concatenate several registries in order.
    pub fn concat(registries: &[&DofRegistry]) -> Self {
        registries
            .iter()
            .flat_map(|registry| registry.iter().cloned())
            .collect()
    }

    /// Fix one entry.
    pub fn fix<'k>(&mut self, key: impl Into<DofKey<'k>>) -> Result<()> {
        self.get_mut(key)?.fix();
        Ok(())
    }

    /// Free one entry.
    pub fn unfix<'k>(&mut self, key: impl Into<DofKey<'k>>) -> Result<()> {
        self.get_mut(key)?.unfix();
        Ok(())
    }

    pub fn fix_all(&mut self) {
        self.dofs.iter_mut().for_each(Dof::fix);
    }

    pub fn unfix_all(&mut self) {
        self.dofs.iter_mut().for_each(Dof::unfix);
    }

    pub fn any_free(&self) -> bool {
        self.dofs.iter().any(Dof::is_free)
    }

    pub fn any_fixed(&self) -> bool {
        self.dofs.iter().any(Dof::is_fixed)
    }

    /// True for an empty registry.
    pub fn all_free(&self) -> bool {
        self.dofs.iter().all(Dof::is_free)
    }

    /// True for an empty registry.
    pub fn all_fixed(&self) -> bool {
        self.dofs.iter().all(Dof::is_fixed)
    }

    /// Number of free entries.
    pub fn free_count(&self) -> usize {
        self.dofs.iter().filter(|dof| dof.is_free()).count()
    }

    /// Positions of the free entries in the full ordering.
    pub fn free_indices(&self) -> Vec<usize> {
        self.dofs
            .iter()
            .enumerate()
            .filter(|(_, dof)| dof.is_free())
            .map(|(i, _)| i)
            .collect()
    }

    /// Fixed flag of every entry.
    pub fn fixed_mask(&self) -> Vec<bool> {
        self.dofs.iter().map(Dof::is_fixed).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.dofs.iter().map(|dof| dof.name().to_string()).collect()
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        self.dofs.iter().map(Dof::owner).collect()
    }

    /// Values of the free entries.
    pub fn x(&self) -> Array1<f64> {
        self.free().map(Dof::value).collect()
    }

    /// Overwrite the values of the free entries.
    pub fn set_x(&mut self, x: &Array1<f64>) -> Result<()> {
        let free = self.free_count();
        if x.len() != free {
            return Err(DofError::DimensionMismatch(format!(
                "expected {} free values, got {}",
                free,
                x.len()
            )));
        }

        for (dof, &value) in self.dofs.iter_mut().filter(|d| d.is_free()).zip(x.iter()) {
            dof.set_value(value);
        }
        Ok(())
    }

    /// Values of all entries, fixed ones included.
    pub fn full_x(&self) -> Array1<f64> {
        self.dofs.iter().map(Dof::value).collect()
    }

    /// Overwrite the values of all entries.
    pub fn set_full_x(&mut self, x: &Array1<f64>) -> Result<()> {
        if x.len() != self.dofs.len() {
            return Err(DofError::DimensionMismatch(format!(
                "expected {} values, got {}",
                self.dofs.len(),
                x.len()
            )));
        }

        for (dof, &value) in self.dofs.iter_mut().zip(x.iter()) {
            dof.set_value(value);
        }
        Ok(())
    }

    /// Lower bounds of the free entries.
    pub fn lower_bounds(&self) -> Array1<f64> {
        self.free().map(Dof::min).collect()
    }

    /// Upper bounds of the free entries.
    pub fn upper_bounds(&self) -> Array1<f64> {
        self.free().map(Dof::max).collect()
    }

    /// Lower and upper bounds of the free entries.
    pub fn bounds(&self) -> (Array1<f64>, Array1<f64>) {
        (self.lower_bounds(), self.upper_bounds())
    }

    /// Rewrite the bounds of one entry.
    pub fn update_bounds<'k>(
        &mut self,
        key: impl Into<DofKey<'k>>,
        min: f64,
        max: f64,
    ) -> Result<()> {
        self.get_mut(key)?.set_bounds(min, max)
    }

    fn free(&self) -> impl Iterator<Item = &Dof> + '_ {
        self.dofs.iter().filter(|dof| dof.is_free())
    }
}

impl<'de> Deserialize<'de> for DofRegistry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RegistryHelper {
            dofs: Vec<Dof>,
        }

        let helper = RegistryHelper::deserialize(deserializer)?;
        DofRegistry::from_dofs(helper.dofs).map_err(serde::de::Error::custom)
    }
}

impl FromIterator<Dof> for DofRegistry {
    fn from_iter<I: IntoIterator<Item = Dof>>(iter: I) -> Self {
        Self {
            dofs: iter.into_iter().collect(),
        }
    }
}

/// Concatenation keeps every entry, duplicates across owners included.
impl Extend<Dof> for DofRegistry {
    fn extend<I: IntoIterator<Item = Dof>>(&mut self, iter: I) {
        self.dofs.extend(iter);
    }
}

impl IntoIterator for DofRegistry {
    type Item = Dof;
    type IntoIter = std::vec::IntoIter<Dof>;

    fn into_iter(self) -> Self::IntoIter {
        self.dofs.into_iter()
    }
}

impl<'a> IntoIterator for &'a DofRegistry {
    type Item = &'a Dof;
    type IntoIter = std::slice::Iter<'a, Dof>;

    fn into_iter(self) -> Self::IntoIter {
        self.dofs.iter()
    }
}

impl Add for DofRegistry {
    type Output = DofRegistry;

    fn add(mut self, rhs: DofRegistry) -> DofRegistry {
        self.extend(rhs);
        self
    }
}

impl Add<&DofRegistry> for &DofRegistry {
    type Output = DofRegistry;

    fn add(self, rhs: &DofRegistry) -> DofRegistry {
        DofRegistry::concat(&[self, rhs])
    }
}

impl Add<&DofRegistry> for DofRegistry {
    type Output = DofRegistry;

    fn add(mut self, rhs: &DofRegistry) -> DofRegistry {
        self.extend(rhs.iter().cloned());
        self
    }
}
