//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `subswarm` application.
//!
//! It centralizes the error types shared between modules and the logging
//! bootstrap used by the binary.

pub mod error;
pub mod logging;
