use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use thrasher::{MmapProvisioner, MonotonicClock};

/// Exit status when a second signal arrives while a stop is pending.
const INTERRUPTED: i32 = 130;

fn main() -> ExitCode {
    // Init logs
    env_logger::init();

    // The first signal lets the current pass finish and the run report, a
    // second one terminates right away.
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        let registered =
            signal_hook::flag::register_conditional_shutdown(signal, INTERRUPTED, Arc::clone(&stop))
                .and_then(|_| signal_hook::flag::register(signal, Arc::clone(&stop)));
        if let Err(e) = registered {
            log::warn!("unable to handle signal {}: {}", signal, e);
        }
    }

    let code = thrasher::cli::execute(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
        &MmapProvisioner,
        &MonotonicClock,
        &stop,
    );
    ExitCode::from(code)
}
