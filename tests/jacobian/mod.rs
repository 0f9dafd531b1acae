//! Tests comparing analytic and finite-difference Jacobians.

mod composite_tests;
mod restoration_tests;
