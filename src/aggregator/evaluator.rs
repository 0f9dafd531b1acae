//! Evaluation of the aggregated functions.

use super::GlobalDofs;
use crate::error::{DofError, Result};
use crate::owner::Owners;
use ndarray::Array1;
use std::ops::Range;

/// Output lengths of the aggregated functions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// No successful evaluation yet
    #[default]
    Unknown,
    /// One length per function, recorded on the first successful evaluation
    Known(Vec<usize>),
}

impl OutputShape {
    pub fn lengths(&self) -> Option<&[usize]> {
        match self {
            OutputShape::Unknown => None,
            OutputShape::Known(lengths) => Some(lengths),
        }
    }

    pub fn total(&self) -> Option<usize> {
        self.lengths().map(|lengths| lengths.iter().sum())
    }

    /// Row range of each function in the stacked output.
    pub(crate) fn row_ranges(&self) -> Option<Vec<Range<usize>>> {
        let lengths = self.lengths()?;
        let mut start = 0;
        Some(
            lengths
                .iter()
                .map(|&len| {
                    let range = start..start + len;
                    start += len;
                    range
                })
                .collect(),
        )
    }
}

impl GlobalDofs {
    /// Evaluate every function and stack the outputs.
    ///
    /// The first successful call records each function's output length; later
    /// calls must reproduce them.
    ///
    /// # Errors
    ///
    /// - [`DofError::InconsistentOutputLength`] if a function changes its
    ///   output length
    /// - [`DofError::FunctionEvaluation`] if a function fails or returns a
    ///   non-finite value
    pub fn f(&mut self, owners: &Owners) -> Result<Array1<f64>> {
        let all: Vec<usize> = (0..self.functions.len()).collect();

        if let OutputShape::Known(_) = self.shape {
            return self.evaluate_subset(owners, &all);
        }

        let outputs = self
            .functions
            .iter()
            .map(|function| function.evaluate_finite(owners))
            .collect::<Result<Vec<_>>>()?;

        self.shape = OutputShape::Known(outputs.iter().map(Array1::len).collect());
        Ok(stack(&outputs))
    }

    /// Output length of each function, once known.
    pub fn nvals_per_func(&self) -> Option<&[usize]> {
        self.shape.lengths()
    }

    /// Total output length, once known.
    pub fn nvals(&self) -> Option<usize> {
        self.shape.total()
    }

    pub fn output_shape(&self) -> &OutputShape {
        &self.shape
    }

    /// Evaluate the functions at `which` and stack their outputs, checking
    /// each against the recorded lengths.
    pub(crate) fn evaluate_subset(&self, owners: &Owners, which: &[usize]) -> Result<Array1<f64>> {
        let lengths = self.shape.lengths().ok_or_else(|| {
            DofError::InvalidInput("output lengths are unknown before the first evaluation".into())
        })?;

        let outputs = which
            .iter()
            .map(|&i| {
                let function = &self.functions[i];
                let values = function.evaluate_finite(owners)?;
                if values.len() != lengths[i] {
                    return Err(DofError::InconsistentOutputLength {
                        function: function.name().to_string(),
                        expected: lengths[i],
                        found: values.len(),
                    });
                }
                Ok(values)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(stack(&outputs))
    }
}

fn stack(outputs: &[Array1<f64>]) -> Array1<f64> {
    outputs.iter().flat_map(|values| values.iter().copied()).collect()
}
