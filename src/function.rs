//! Owner-bound evaluation functions.
//!
//! A [`Function`] computes a scalar or a vector from the current state of the
//! owner arena. It is bound to exactly one owner, whose dependency graph
//! decides which parameters the function is differentiated against, and may
//! carry an analytic Jacobian with respect to that owner's free DOFs.

use crate::error::{DofError, Result};
use crate::owner::{Optimizable, OwnerId, Owners};
use ndarray::{Array1, Array2};
use std::fmt;

/// Output of one evaluation function.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutput {
    Scalar(f64),
    Vector(Array1<f64>),
}

impl FunctionOutput {
    /// Number of values; 1 for a scalar.
    pub fn len(&self) -> usize {
        match self {
            FunctionOutput::Scalar(_) => 1,
            FunctionOutput::Vector(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into a vector.
    pub fn into_array(self) -> Array1<f64> {
        match self {
            FunctionOutput::Scalar(value) => Array1::from_elem(1, value),
            FunctionOutput::Vector(values) => values,
        }
    }
}

impl From<f64> for FunctionOutput {
    fn from(value: f64) -> Self {
        FunctionOutput::Scalar(value)
    }
}

impl From<Array1<f64>> for FunctionOutput {
    fn from(values: Array1<f64>) -> Self {
        FunctionOutput::Vector(values)
    }
}

impl From<Vec<f64>> for FunctionOutput {
    fn from(values: Vec<f64>) -> Self {
        FunctionOutput::Vector(Array1::from_vec(values))
    }
}

type EvalFn = dyn Fn(&Owners) -> Result<FunctionOutput>;
type JacobianFn = dyn Fn(&Owners) -> Result<Array2<f64>>;

/// An evaluation function bound to one owner.
pub struct Function {
    owner: OwnerId,
    name: String,
    eval: Box<EvalFn>,
    jacobian: Option<Box<JacobianFn>>,
}

impl Function {
    /// Create a function from a closure over the whole arena.
    ///
    /// Use this form when the function reads owners other than its own.
    pub fn new<F>(owner: OwnerId, name: &str, eval: F) -> Self
    where
        F: Fn(&Owners) -> Result<FunctionOutput> + 'static,
    {
        Self {
            owner,
            name: name.to_string(),
            eval: Box::new(eval),
            jacobian: None,
        }
    }

    /// Create a function reading only its owner's concrete type.
    ///
    /// # Examples
    ///
    /// ```
    /// use dofopt_rs::function::Function;
    /// use dofopt_rs::models::Adder;
    /// use dofopt_rs::owner::Owners;
    ///
    /// let mut owners = Owners::new();
    /// let id = owners.insert_with(|id| Adder::new(id, 2));
    /// let sum = Function::of(id, "sum", |adder: &Adder| adder.sum());
    /// assert_eq!(sum.evaluate(&owners).unwrap().len(), 1);
    /// ```
    pub fn of<T, F, R>(owner: OwnerId, name: &str, eval: F) -> Self
    where
        T: Optimizable + 'static,
        F: Fn(&T) -> R + 'static,
        R: Into<FunctionOutput>,
    {
        Self::new(owner, name, move |owners: &Owners| {
            Ok(eval(owners.get_as::<T>(owner)?).into())
        })
    }

    /// Like [`of`](Function::of), for evaluations that can fail.
    pub fn try_of<T, F, R>(owner: OwnerId, name: &str, eval: F) -> Self
    where
        T: Optimizable + 'static,
        F: Fn(&T) -> Result<R> + 'static,
        R: Into<FunctionOutput>,
    {
        Self::new(owner, name, move |owners: &Owners| {
            Ok(eval(owners.get_as::<T>(owner)?)?.into())
        })
    }

    /// Attach an analytic Jacobian over the arena.
    ///
    /// The matrix must have one row per output value and one column per free
    /// DOF of this function's owner, in registry order.
    pub fn with_jacobian<J>(mut self, jacobian: J) -> Self
    where
        J: Fn(&Owners) -> Result<Array2<f64>> + 'static,
    {
        self.jacobian = Some(Box::new(jacobian));
        self
    }

    /// Attach an analytic Jacobian computed from the owner's concrete type.
    pub fn with_jacobian_of<T, J>(self, jacobian: J) -> Self
    where
        T: Optimizable + 'static,
        J: Fn(&T) -> Array2<f64> + 'static,
    {
        let owner = self.owner;
        self.with_jacobian(move |owners: &Owners| Ok(jacobian(owners.get_as::<T>(owner)?)))
    }

    /// Like [`with_jacobian_of`](Function::with_jacobian_of), for Jacobians
    /// that can fail.
    pub fn with_try_jacobian_of<T, J>(self, jacobian: J) -> Self
    where
        T: Optimizable + 'static,
        J: Fn(&T) -> Result<Array2<f64>> + 'static,
    {
        let owner = self.owner;
        self.with_jacobian(move |owners: &Owners| jacobian(owners.get_as::<T>(owner)?))
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_jacobian(&self) -> bool {
        self.jacobian.is_some()
    }

    /// Evaluate the function on the current owner state.
    pub fn evaluate(&self, owners: &Owners) -> Result<FunctionOutput> {
        (self.eval)(owners)
    }

    /// Evaluate the analytic Jacobian, if one is attached.
    pub fn local_jacobian(&self, owners: &Owners) -> Option<Result<Array2<f64>>> {
        self.jacobian.as_ref().map(|jacobian| jacobian(owners))
    }

    /// Evaluate and reject non-finite values.
    pub(crate) fn evaluate_finite(&self, owners: &Owners) -> Result<Array1<f64>> {
        let values = self.evaluate(owners)?.into_array();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DofError::FunctionEvaluation(format!(
                "function '{}' returned a non-finite value",
                self.name
            )));
        }
        Ok(values)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("has_jacobian", &self.has_jacobian())
            .finish()
    }
}
