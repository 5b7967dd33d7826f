//! Process environment for the two binaries.
//!
//! Reads `CASTLE_PORT`, `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`) and
//! installs the tracing subscriber (`RUST_LOG`, default `info`).

use std::str::FromStr;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::constants::DEFAULT_PORT;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// First of `names` that is set and parses as `T`. Unparsable values are skipped.
fn first_parsed<T: FromStr>(names: &[&str]) -> Option<T> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|raw| raw.trim().parse().ok())
}

/// Size the global rayon pool for batch runs.
///
/// Thread count comes from the environment, else from the machine's available
/// parallelism. A pool that already exists is kept, with a warning.
pub fn init_rayon_threads() -> usize {
    let num_threads = first_parsed(&["RAYON_NUM_THREADS", "OMP_NUM_THREADS"])
        .filter(|&n: &usize| n > 0)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from));
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        warn!(error = %e, "rayon global pool already initialized");
    }
    info!(threads = num_threads, "rayon pool ready");
    num_threads
}

/// Listening port for `castle-server`; `CASTLE_PORT` overrides the default.
pub fn server_port() -> u16 {
    first_parsed(&["CASTLE_PORT"]).unwrap_or(DEFAULT_PORT)
}
