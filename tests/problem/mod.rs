//! Tests for the least-squares view over aggregated DOFs.

mod least_squares_tests;
