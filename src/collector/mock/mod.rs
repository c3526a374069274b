//! Mock command runner for testing.
//!
//! This module provides `MockRunner` and pre-built scenarios for testing the
//! sysstat pipeline without `sadc`/`sadf` installed.

mod runner;
mod scenarios;

pub use runner::{Invocation, MockRunner};
