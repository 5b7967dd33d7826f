//! Default configuration values.
//!
//! The board is the 10×8 castle used by the renderer, with six soldiers.
//! Thresholds are defaults for [`crate::simulation::Thresholds`] and can be
//! overridden from the command line.

/// Grid width in cells.
pub const WIDTH: usize = 10;

/// Grid height in cells.
pub const HEIGHT: usize = 8;

/// Number of rescue agents placed on the board.
pub const AGENTS: usize = 6;

/// Per-run step cap for batch analysis.
pub const DEFAULT_MAX_STEPS: u32 = 500;

/// Number of runs in a default batch.
pub const DEFAULT_NUM_SIMULATIONS: usize = 1000;

/// A run is a win when at least this many victims are saved
/// (used only when the engine does not report `win` itself).
pub const WIN_THRESHOLD: u32 = 7;

/// A run is a "success" when strictly more than this many victims are saved.
pub const SUCCESS_THRESHOLD: u32 = 5;

/// Log batch progress every N completed runs.
pub const PROGRESS_INTERVAL: usize = 100;

/// The first N runs of a batch log their outcome at info level.
pub const VERBOSE_RUNS: usize = 5;

/// Verbose runs also log their progress every N steps.
pub const VERBOSE_STEP_INTERVAL: u32 = 50;

/// Base RNG seed. Run `i` of a batch is built with `seed + i`.
pub const DEFAULT_SEED: u64 = 42;

/// Reason recorded when the engine does not report one.
pub const REASON_UNKNOWN: &str = "unknown";

/// Reason recorded for a run that failed and was degraded.
pub const REASON_ERROR: &str = "error";

/// Default HTTP port for the session server.
pub const DEFAULT_PORT: u16 = 9000;
