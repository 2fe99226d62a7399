//! Command line front end.

use std::ffi::OsString;
use std::io::Write;
use std::sync::atomic::AtomicBool;

use clap::Parser;

use crate::clock::Clock;
use crate::geometry::{Geometry, Platform};
use crate::region::Provision;
use crate::run::{run, RunParameters};
use crate::walk::Pattern;

/// # Memory bus thrasher.
///
/// Walks a buffer several times larger than the last level cache so that every
/// access misses, keeping the memory controller busy.
///
/// ## Example
/// `thrasher random 1000`
///
#[derive(Parser, Debug)]
#[command(name = "thrasher")]
pub struct Options {
    /// Access pattern. Anything starting with `r` walks a shuffled chain, any
    /// other value walks the buffer sequentially.
    pattern: Option<String>,
    /// Passes over the buffer. 0 or absent runs until interrupted.
    iterations: Option<u64>,
    /// Cache geometry preset of the target
    #[arg(long = "platform", value_enum, default_value = "imx6q", env = "THRASHER_PLATFORM")]
    platform: Platform,
    /// Capacity in bytes of the cache to miss in, overrides the preset
    #[arg(long = "cache-size", env = "THRASHER_CACHE_SIZE")]
    cache_size: Option<usize>,
    /// Cache line size in bytes, overrides the preset
    #[arg(long = "line-size", env = "THRASHER_LINE_SIZE")]
    line_size: Option<usize>,
    /// Buffer size as a multiple of the cache size, overrides the preset
    #[arg(long = "multiplier", env = "THRASHER_MULTIPLIER")]
    multiplier: Option<usize>,
    /// Seed of the random chain order. Drawn and logged when absent.
    #[arg(short = 's', long = "seed", env = "THRASHER_SEED")]
    seed: Option<u64>,
}

impl Options {
    pub fn into_parameters(self) -> RunParameters {
        let preset = Geometry::for_platform(self.platform);
        let geometry = Geometry {
            cache_bytes: self.cache_size.unwrap_or(preset.cache_bytes),
            line_size: self.line_size.unwrap_or(preset.line_size),
            multiplier: self.multiplier.unwrap_or(preset.multiplier),
        };
        RunParameters {
            pattern: self
                .pattern
                .as_deref()
                .map_or(Pattern::Sequential, Pattern::from_selector),
            // On the command line zero means no bound
            iterations: self.iterations.filter(|n| *n != 0),
            geometry,
            seed: self.seed,
        }
    }
}

/// Parses `args`, runs the benchmark and returns the process exit status.
///
/// The completion line goes to `out`, usage and diagnostics to `err`.
pub fn execute<I, T, P, C>(
    args: I,
    out: &mut dyn Write,
    err: &mut dyn Write,
    provisioner: &P,
    clock: &C,
    stop: &AtomicBool,
) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    P: Provision + ?Sized,
    C: Clock + ?Sized,
{
    // Help is a bad invocation too: it never runs the benchmark
    let opts = match Options::try_parse_from(args) {
        Ok(opts) => opts,
        Err(e) => {
            let _ = write!(err, "{}", e);
            return 1;
        }
    };

    let params = opts.into_parameters();
    log::debug!("{:?}", params);

    match run(&params, provisioner, clock, stop) {
        Ok(report) => {
            if let Err(e) = writeln!(out, "{}", report) {
                log::warn!("unable to write the report: {}", e);
            }
            0
        }
        Err(e) => {
            let _ = match std::error::Error::source(&e) {
                Some(source) => writeln!(err, "thrasher: {}: {}", e, source),
                None => writeln!(err, "thrasher: {}", e),
            };
            e.exit_code()
        }
    }
}
