//! Tests for building the global vector and evaluating the stacked output.

mod vector_valued_tests;
