//! Finite-difference settings.

use crate::error::{DofError, Result};
use serde::{Deserialize, Serialize};

/// Default absolute step for finite differences.
pub const DEFAULT_STEP: f64 = 1e-7;

/// Configuration of numerical differentiation.
///
/// Used by [`GlobalDofs::jac`](crate::aggregator::GlobalDofs::jac) for
/// functions without an analytic Jacobian and, for its step, by
/// [`GlobalDofs::fd_jac`](crate::aggregator::GlobalDofs::fd_jac).
///
/// # Examples
///
/// ```
/// use dofopt_rs::jacobian::DiffConfig;
///
/// let config: DiffConfig = serde_json::from_str(r#"{ "centered": true }"#).unwrap();
/// assert!(config.centered);
/// assert_eq!(config.step, 1e-7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Absolute perturbation applied to each parameter. Default: 1e-7
    pub step: f64,

    /// Use centered instead of forward differences. Default: false
    pub centered: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            centered: false,
        }
    }
}

impl DiffConfig {
    /// Forward differences with the given step.
    pub fn forward(step: f64) -> Self {
        Self {
            step,
            centered: false,
        }
    }

    /// Centered differences with the given step.
    pub fn centered(step: f64) -> Self {
        Self {
            step,
            centered: true,
        }
    }

    /// Check that the step is a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(DofError::InvalidConfig(format!(
                "finite-difference step must be positive and finite, got {}",
                self.step
            )));
        }
        Ok(())
    }
}
