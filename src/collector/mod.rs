//! System activity collector built on sysstat.
//!
//! This module drives the sysstat tools (`sadc` to capture, `sadf` to
//! extract) through an injectable command runner, so the whole pipeline can
//! run against canned output in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SysstatCollector                        │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  capture (sadc)     │   │  extract (sadf) × options   │  │
//! │  │  - temp artifact    │   │  - parser, shaper           │  │
//! │  │  - learned interval │   │  - DeviceTags               │  │
//! │  └──────────┬──────────┘   └──────────────┬──────────────┘  │
//! │             └──────────────┬──────────────┘                 │
//! │                            │                                │
//! │                   ┌────────▼───────┐                        │
//! │                   │ CommandRunner  │ (trait)                │
//! │                   └────────┬───────┘                        │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!                ┌─────────────┼─────────────┐
//!                │                           │
//!         ┌──────▼──────┐             ┌──────▼──────┐
//!         │ SystemRunner│             │ MockRunner  │
//!         │ (processes) │             │ (Testing)   │
//!         └─────────────┘             └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use sarglot::collector::{SystemRunner, sysstat::SysstatCollector};
//! use sarglot::config::SysstatConfig;
//! use sarglot::sink::JsonLinesSink;
//!
//! let config = SysstatConfig::new("/usr/lib/sa/sadc");
//! let mut collector = SysstatCollector::new(SystemRunner::new(), config);
//! let sink = JsonLinesSink::new(std::io::stdout());
//! collector.run_cycle(&sink)?;
//! ```

pub mod mock;
pub mod sysstat;
pub mod traits;

pub use mock::MockRunner;
pub use sysstat::{CycleError, SysstatCollector, SysstatError};
pub use traits::{CommandOutput, CommandRunner, CommandStatus, RunningCommand, SystemRunner};
