//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `linesub` application.
//!
//! This module centralizes the error/outcome types of connection handling and
//! the logging initialization helper.

pub mod error;
pub mod logging;
