//! sarglot - sysstat-based system activity collector library.
//!
//! This library provides the collection pipeline used by:
//! - `sarglotd` - daemon that samples system activity and writes metrics
//!
//! Modules:
//! - `collector` — `sadc`/`sadf` orchestration, parsing, output shaping
//! - `config` — collector configuration
//! - `sink` — metric sink contract and implementations
//! - `util` — helper utilities

pub mod collector;
pub mod config;
pub mod sink;
pub mod util;
