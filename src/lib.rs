//! Srsim - Site response simulator
//!
//! Builds a two-dimensional coupled solid-fluid (u-p) site model for nonlinear
//! dynamic ground-response analyses and drives it through staged static and
//! transient phases. This crate owns the model-assembly and domain-decomposition
//! layer; element kernels, equation solving, and time integration live behind
//! the [crate::fem::SolverEngine] trait.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod fem;
pub mod model;
pub mod prelude;
