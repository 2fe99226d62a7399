//! Memory bus stress generator.
//!
//! A buffer several times larger than the targeted cache is walked over and
//! over, dirtying one word per cache line, either in address order or along a
//! randomly shuffled chain of lines that defeats stride prefetchers.
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use thrasher::{run, MmapProvisioner, MonotonicClock, Pattern, RunParameters};
//!
//! let params = RunParameters {
//!     pattern: Pattern::Random,
//!     iterations: Some(100),
//!     ..RunParameters::default()
//! };
//! let report = run(&params, &MmapProvisioner, &MonotonicClock, &AtomicBool::new(false))?;
//! println!("{}", report);
//! # Ok::<(), thrasher::Error>(())
//! ```

pub mod chain;
pub mod cli;
pub mod clock;
pub mod error;
pub mod geometry;
pub mod region;
pub mod run;
pub mod walk;

pub use chain::Chain;
pub use clock::{Clock, MonotonicClock};
pub use error::{Error, Result};
pub use geometry::{Geometry, Platform};
pub use region::{MmapProvisioner, Provision, Region};
pub use run::{run, Report, RunParameters};
pub use walk::{ChainWalk, Pattern, SequentialWalk, Traversal};
