//! The engine contract and the grid types it exposes.
//!
//! A [`SimulationModel`] is one mutable game instance. The crate never looks
//! inside the rules; it only reads the fields below and calls `step()`.
//!
//! Walls and doors are `height × width` matrices of [`EdgeCodes`]: a fixed
//! four-slot record indexed by [`Direction`]. A slot is `None` when the engine
//! has no entry for that edge of the cell.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::constants::{AGENTS, HEIGHT, WIDTH};
use crate::error::{CastleError, ModelError};

// ── Grid ────────────────────────────────────────────────────────────

/// Row-major `height × width` matrix. Cell `(x, y)` is at `y * width + x`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    /// A grid filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    /// Build from a row-major flat vector. Fails if the length is not `width * height`.
    pub fn from_flat(width: usize, height: usize, cells: Vec<T>) -> Result<Self, CastleError> {
        if cells.len() != width * height {
            return Err(CastleError::invalid_state(format!(
                "flat grid has {} cells, expected {}x{}={}",
                cells.len(),
                width,
                height,
                width * height
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build from rows (outer index y). All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, CastleError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(CastleError::invalid_state("ragged grid rows"));
        }
        let cells = rows.into_iter().flatten().collect();
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Rows of the grid, outer index y.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        if self.width == 0 {
            return vec![Vec::new(); self.height];
        }
        self.cells
            .chunks(self.width)
            .take(self.height)
            .map(<[T]>::to_vec)
            .collect()
    }

    /// Row-major flattening (index = y * width + x).
    pub fn flatten(&self) -> Vec<T> {
        self.cells.clone()
    }

    /// Same cells, each mapped through `f`.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

impl<T> Grid<T> {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if self.contains(x, y) {
            self.cells.get(self.index(x, y))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if self.contains(x, y) {
            let i = self.index(x, y);
            self.cells.get_mut(i)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Iterate `(x, y, &cell)` in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let w = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (i % w, i / w, c))
    }
}

// ── Edges ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    N,
    E,
    S,
    W,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::N, Direction::E, Direction::S, Direction::W];

    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            Direction::N => 0,
            Direction::E => 1,
            Direction::S => 2,
            Direction::W => 3,
        }
    }

    /// Cell offset `(dx, dy)`; y grows southwards.
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Direction::N => (0, -1),
            Direction::E => (1, 0),
            Direction::S => (0, 1),
            Direction::W => (-1, 0),
        }
    }
}

/// Severity codes for the four edges of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeCodes([Option<i32>; 4]);

impl EdgeCodes {
    pub const EMPTY: EdgeCodes = EdgeCodes([None; 4]);

    pub const fn new(slots: [Option<i32>; 4]) -> Self {
        Self(slots)
    }

    #[inline]
    pub fn get(&self, dir: Direction) -> Option<i32> {
        self.0[dir.slot()]
    }

    #[inline]
    pub fn set(&mut self, dir: Direction, code: i32) {
        self.0[dir.slot()] = Some(code);
    }

    pub fn clear(&mut self, dir: Direction) {
        self.0[dir.slot()] = None;
    }

    /// Recorded `(direction, code)` pairs in N, E, S, W order.
    pub fn entries(&self) -> impl Iterator<Item = (Direction, i32)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.get(d).map(|code| (d, code)))
    }
}

// ── Agents and configuration ────────────────────────────────────────

/// An agent's identifier and grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Agent {
    pub id: u32,
    pub x: usize,
    pub y: usize,
}

/// Fixed construction arguments for every instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelConfig {
    pub width: usize,
    pub height: usize,
    pub agents: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            agents: AGENTS,
        }
    }
}

// ── Engine contract ─────────────────────────────────────────────────

/// One mutable game instance.
///
/// `finished`, `win` and `reason` are optional: an engine that does not track
/// them keeps the defaults, and callers fall back to computed values.
pub trait SimulationModel: Send {
    /// Advance exactly one discrete turn.
    fn step(&mut self) -> Result<(), ModelError>;

    /// Terminal query. Must not mutate.
    fn finish_game(&self) -> bool;

    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn victims_saved(&self) -> i64;
    fn victims_dead(&self) -> i64;
    fn damage_counter(&self) -> i64;

    fn finished(&self) -> Option<bool> {
        None
    }

    fn win(&self) -> Option<bool> {
        None
    }

    fn reason(&self) -> Option<String> {
        None
    }

    /// Agents in scheduling order.
    fn agents(&self) -> &[Agent];

    /// POI matrix; a cell holds a POI when its value is > 0.
    fn pois(&self) -> &Grid<i32>;

    /// Fire/smoke severity matrix.
    fn fire(&self) -> &Grid<i32>;

    fn walls(&self) -> &Grid<EdgeCodes>;
    fn doors(&self) -> &Grid<EdgeCodes>;
}

/// Builds fresh instances. `seed` lets batches be reproducible run by run.
pub trait ModelFactory: Send + Sync {
    type Model: SimulationModel;

    fn build(&self, config: &ModelConfig, seed: u64) -> Result<Self::Model, ModelError>;
}

impl<M, F> ModelFactory for F
where
    M: SimulationModel,
    F: Fn(&ModelConfig, u64) -> Result<M, ModelError> + Send + Sync,
{
    type Model = M;

    fn build(&self, config: &ModelConfig, seed: u64) -> Result<M, ModelError> {
        self(config, seed)
    }
}

/// Validated outcome counters read from a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub victims_saved: u32,
    pub victims_dead: u32,
    pub damage_counter: u32,
}

impl Counters {
    /// Read the counters, rejecting negative or out-of-range values.
    pub fn read<M: SimulationModel + ?Sized>(model: &M) -> Result<Self, CastleError> {
        Ok(Self {
            victims_saved: checked_counter("victims_saved", model.victims_saved())?,
            victims_dead: checked_counter("victims_dead", model.victims_dead())?,
            damage_counter: checked_counter("damage_counter", model.damage_counter())?,
        })
    }
}

fn checked_counter(name: &str, value: i64) -> Result<u32, CastleError> {
    u32::try_from(value)
        .map_err(|_| CastleError::invalid_state(format!("{name} = {value} is out of range")))
}

// ── Failure isolation ───────────────────────────────────────────────

/// Run an engine call, converting a panic into [`ModelError::Panicked`].
pub fn guarded<T>(f: impl FnOnce() -> Result<T, ModelError>) -> Result<T, ModelError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(ModelError::Panicked { message })
        }
    }
}
