//! Sysstat collection pipeline.
//!
//! Drives `sadc` over a sampling window, then extracts metric families from
//! the binary capture with concurrent `sadf` runs.
//!
//! ```text
//!  SysstatCollector::run_cycle
//!    │
//!    ├── sadc -S DISK ... <secs> 2 <artifact>        (capture)
//!    │
//!    ├── sadf -p -- -p -d     <artifact> ─┐
//!    ├── sadf -p -- -p -n ALL <artifact> ─┼─ parser → shaper → MetricSink
//!    ├── sadf -p -- -p -q     <artifact> ─┘
//!    │
//!    └── remove <artifact>, aggregate errors
//! ```
//!
//! # Usage
//!
//! ```
//! use sarglot::collector::MockRunner;
//! use sarglot::collector::sysstat::SysstatCollector;
//! use sarglot::config::SysstatConfig;
//! use sarglot::sink::MemorySink;
//!
//! let mut config = SysstatConfig::new("/usr/lib/sa/sadc");
//! config.sadf_path = "/usr/bin/sadf".into();
//! config.options = MockRunner::typical_options();
//!
//! let mut collector = SysstatCollector::new(MockRunner::typical_system(), config);
//! let sink = MemorySink::new();
//! collector.run_cycle(&sink).unwrap();
//! assert_eq!(sink.by_name("disk").len(), 2);
//! ```

#[allow(clippy::module_inception)]
mod collector;
mod error;
mod extract;
pub mod parser;
mod shaper;
mod tags;

pub use collector::{CycleTiming, SysstatCollector, sadc_args};
pub use error::{CycleError, SysstatError};
pub use extract::{Extraction, extract, sadf_args};
pub use parser::{ParseError, Record, escape_field, parse_record};
pub use shaper::{GroupAccumulator, OutputShaper, VALUE_FIELD};
pub use tags::DeviceTags;
