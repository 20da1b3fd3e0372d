//! Command line interface module
//!
//! Argument parsing (with environment fallbacks) and the runner that drives
//! the registry client and renders its results.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::{RunError, Runner};
