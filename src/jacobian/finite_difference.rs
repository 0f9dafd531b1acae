//! Finite-difference Jacobians of a state-mutating evaluation.
//!
//! The evaluation being differentiated reads its inputs from shared state
//! rather than from an argument, so every probe goes through a [`Probe`] that
//! writes the perturbed point first and can put the original point back.

use super::config::DiffConfig;
use crate::error::{DofError, Result};
use ndarray::{Array1, Array2};
use tracing::trace;

/// A point-wise evaluation over mutable state.
pub(crate) trait Probe {
    /// Move the state to `x` and evaluate.
    fn eval_at(&mut self, x: &Array1<f64>) -> Result<Array1<f64>>;

    /// Move the state back to `x0` without evaluating.
    fn restore(&mut self, x0: &Array1<f64>) -> Result<()>;
}

/// Compute the Jacobian at `x0` column by column.
///
/// `f0` is the evaluation at `x0` and fixes the row count; it is only used by
/// forward differences. The state is restored to `x0` after every column and
/// before an error is returned.
pub(crate) fn jacobian<P: Probe>(
    probe: &mut P,
    x0: &Array1<f64>,
    f0: &Array1<f64>,
    config: &DiffConfig,
) -> Result<Array2<f64>> {
    let h = config.step;
    let mut jac = Array2::zeros((f0.len(), x0.len()));

    for j in 0..x0.len() {
        let column = match probe_column(probe, x0, f0, j, h, config.centered) {
            Ok(column) => column,
            Err(err) => {
                probe.restore(x0)?;
                return Err(err);
            }
        };
        probe.restore(x0)?;

        trace!(
            "FD column {} (h = {:e}, centered = {}): max |d| = {:e}",
            j,
            h,
            config.centered,
            column.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
        );

        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}

fn probe_column<P: Probe>(
    probe: &mut P,
    x0: &Array1<f64>,
    f0: &Array1<f64>,
    j: usize,
    h: f64,
    centered: bool,
) -> Result<Array1<f64>> {
    let mut x = x0.clone();
    x[j] = x0[j] + h;
    let f_plus = checked_len(probe.eval_at(&x)?, f0.len(), j)?;

    if centered {
        x[j] = x0[j] - h;
        let f_minus = checked_len(probe.eval_at(&x)?, f0.len(), j)?;
        Ok((f_plus - f_minus) / (2.0 * h))
    } else {
        Ok((f_plus - f0) / h)
    }
}

fn checked_len(values: Array1<f64>, expected: usize, j: usize) -> Result<Array1<f64>> {
    if values.len() != expected {
        return Err(DofError::DimensionMismatch(format!(
            "Perturbing column {} gave {} values, expected {}",
            j,
            values.len(),
            expected
        )));
    }
    Ok(values)
}
