//! Drives passes of a traversal and measures them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::chain::Chain;
use crate::clock::Clock;
use crate::error::Result;
use crate::geometry::{Geometry, RECOMMENDED_MULTIPLIER};
use crate::region::Provision;
use crate::walk::{ChainWalk, Pattern, SequentialWalk, Traversal};

const GIB: f64 = (1u64 << 30) as f64;
const MIB: f64 = (1u64 << 20) as f64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunParameters {
    pub pattern: Pattern,
    /// `None` keeps going until the stop flag is raised.
    pub iterations: Option<u64>,
    pub geometry: Geometry,
    /// Seed of the chain shuffle. Drawn at random when absent.
    pub seed: Option<u64>,
}

impl Default for RunParameters {
    fn default() -> Self {
        RunParameters {
            pattern: Pattern::Sequential,
            iterations: None,
            geometry: Geometry::default(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub pattern: Pattern,
    /// Completed passes over the region.
    pub passes: u64,
    pub region_bytes: usize,
    pub elapsed_ms: u64,
}

impl Report {
    pub fn bytes_touched(&self) -> u128 {
        self.passes as u128 * self.region_bytes as u128
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes_touched() as f64;
        if bytes >= GIB {
            write!(f, "Completed generating {:.1}GiB", bytes / GIB)?;
        } else {
            write!(f, "Completed generating {:.1}MiB", bytes / MIB)?;
        }
        write!(f, " of memory requests in {:.2}s.", self.elapsed_secs())
    }
}

/// Runs the requested passes and reports what was generated.
///
/// The region lives for the duration of the call and is released on every
/// return path. `stop` is only looked at between passes.
pub fn run<P, C>(
    params: &RunParameters,
    provisioner: &P,
    clock: &C,
    stop: &AtomicBool,
) -> Result<Report>
where
    P: Provision + ?Sized,
    C: Clock + ?Sized,
{
    let region_bytes = params.geometry.validate()?;
    if params.geometry.multiplier < RECOMMENDED_MULTIPLIER {
        log::warn!(
            "multiplier {} is below {}, some accesses may hit in cache",
            params.geometry.multiplier,
            RECOMMENDED_MULTIPLIER
        );
    }
    let mut report = Report {
        pattern: params.pattern,
        passes: 0,
        region_bytes,
        elapsed_ms: 0,
    };
    if params.iterations == Some(0) {
        log::debug!("no iterations requested");
        return Ok(report);
    }

    log::info!(
        "{} walk over {} bytes ({} lines of {} bytes), {}",
        params.pattern,
        region_bytes,
        params.geometry.lines(),
        params.geometry.line_size,
        match params.iterations {
            Some(n) => format!("{} iterations", n),
            None => "until stopped".to_string(),
        }
    );

    let mut region = provisioner.provision(&params.geometry)?;
    let line_size = region.line_size();

    match params.pattern {
        Pattern::Sequential => {
            let mut walk = SequentialWalk::new(region.bytes_mut(), line_size);
            drive(&mut walk, params.iterations, clock, stop, &mut report)?;
        }
        Pattern::Random => {
            let seed = params.seed.unwrap_or_else(rand::random);
            log::info!("chain seed {}", seed);
            let mut rng = SmallRng::seed_from_u64(seed);
            let chain = Chain::shuffled(&mut region, &mut rng)?;
            let mut walk = ChainWalk::new(chain);
            drive(&mut walk, params.iterations, clock, stop, &mut report)?;
        }
    }

    log::debug!("{} passes in {}ms", report.passes, report.elapsed_ms);
    Ok(report)
}

fn drive<T, C>(
    walk: &mut T,
    iterations: Option<u64>,
    clock: &C,
    stop: &AtomicBool,
    report: &mut Report,
) -> Result<()>
where
    T: Traversal + ?Sized,
    C: Clock + ?Sized,
{
    let start = clock.now_ms()?;
    loop {
        if iterations.map_or(false, |n| report.passes >= n) {
            break;
        }
        if stop.load(Ordering::Relaxed) {
            log::info!("stop requested after {} passes", report.passes);
            break;
        }
        walk.pass();
        report.passes += 1;
    }
    let end = clock.now_ms()?;
    report.elapsed_ms = end.saturating_sub(start);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::region::{MmapProvisioner, Region};
    use std::cell::Cell;
    use std::io;

    fn small(pattern: Pattern, iterations: Option<u64>) -> RunParameters {
        RunParameters {
            pattern,
            iterations,
            geometry: Geometry {
                cache_bytes: 8192,
                line_size: 64,
                multiplier: 4,
            },
            seed: Some(3),
        }
    }

    /// Advances 250ms per reading.
    struct StepClock(Cell<u64>);

    impl Clock for StepClock {
        fn now_ms(&self) -> Result<u64> {
            let now = self.0.get();
            self.0.set(now + 250);
            Ok(now)
        }
    }

    struct BrokenClock;

    impl Clock for BrokenClock {
        fn now_ms(&self) -> Result<u64> {
            Err(Error::Clock(io::Error::from_raw_os_error(libc::EINVAL)))
        }
    }

    #[derive(Default)]
    struct CountingProvisioner(Cell<usize>);

    impl Provision for CountingProvisioner {
        fn provision(&self, geometry: &Geometry) -> Result<Region> {
            self.0.set(self.0.get() + 1);
            MmapProvisioner.provision(geometry)
        }
    }

    struct FailingProvisioner;

    impl Provision for FailingProvisioner {
        fn provision(&self, geometry: &Geometry) -> Result<Region> {
            Err(Error::Allocation {
                bytes: geometry.region_bytes(),
                source: io::Error::from(io::ErrorKind::OutOfMemory),
            })
        }
    }

    #[test]
    fn zero_iterations_touch_nothing() {
        let provisioner = CountingProvisioner::default();
        let clock = StepClock(Cell::new(0));
        let stop = AtomicBool::new(false);
        for pattern in [Pattern::Sequential, Pattern::Random] {
            let report = run(&small(pattern, Some(0)), &provisioner, &clock, &stop).unwrap();
            assert_eq!(report.passes, 0);
            assert_eq!(report.bytes_touched(), 0);
            assert_eq!(report.elapsed_ms, 0);
            assert_eq!(
                report.to_string(),
                "Completed generating 0.0MiB of memory requests in 0.00s."
            );
        }
        assert_eq!(provisioner.0.get(), 0);
        assert_eq!(clock.0.get(), 0);
    }

    #[test]
    fn bounded_runs_complete_every_pass() {
        let stop = AtomicBool::new(false);
        for pattern in [Pattern::Sequential, Pattern::Random] {
            let clock = StepClock(Cell::new(1000));
            let report = run(&small(pattern, Some(5)), &MmapProvisioner, &clock, &stop).unwrap();
            assert_eq!(report.passes, 5);
            assert_eq!(report.region_bytes, 32768);
            assert_eq!(report.bytes_touched(), 5 * 32768);
            assert_eq!(report.elapsed_ms, 250);
        }
    }

    #[test]
    fn raised_stop_flag_ends_an_unbounded_run() {
        let stop = AtomicBool::new(true);
        let clock = StepClock(Cell::new(0));
        let report = run(&small(Pattern::Random, None), &MmapProvisioner, &clock, &stop).unwrap();
        assert_eq!(report.passes, 0);
    }

    #[test]
    fn allocation_failure_stops_before_traversal() {
        let stop = AtomicBool::new(false);
        let clock = StepClock(Cell::new(0));
        let err = run(&small(Pattern::Sequential, Some(2)), &FailingProvisioner, &clock, &stop)
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        // The clock is only read around the timed loop
        assert_eq!(clock.0.get(), 0);
    }

    #[test]
    fn clock_failure_aborts_the_run() {
        let stop = AtomicBool::new(false);
        let err = run(&small(Pattern::Random, Some(2)), &MmapProvisioner, &BrokenClock, &stop)
            .unwrap_err();
        assert!(matches!(err, Error::Clock(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn invalid_geometry_is_rejected_before_provisioning() {
        let provisioner = CountingProvisioner::default();
        let mut params = small(Pattern::Sequential, Some(1));
        params.geometry.multiplier = 1;
        let err = run(&params, &provisioner, &StepClock(Cell::new(0)), &AtomicBool::new(false))
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(provisioner.0.get(), 0);
    }

    #[test]
    fn report_switches_to_gib() {
        let mut report = Report {
            pattern: Pattern::Sequential,
            passes: 1,
            region_bytes: 4 << 20,
            elapsed_ms: 1234,
        };
        assert_eq!(
            report.to_string(),
            "Completed generating 4.0MiB of memory requests in 1.23s."
        );
        report.passes = 256;
        assert_eq!(
            report.to_string(),
            "Completed generating 1.0GiB of memory requests in 1.23s."
        );
        report.passes = 384;
        report.elapsed_ms = 60_000;
        assert_eq!(
            report.to_string(),
            "Completed generating 1.5GiB of memory requests in 60.00s."
        );
    }
}
