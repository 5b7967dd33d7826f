//! Seeded stand-in engine.
//!
//! `SandboxModel` implements [`SimulationModel`] with deliberately simple
//! dynamics so the server and the batch harness have something to drive:
//! fire advances on one random cell per turn, agents walk greedily to the
//! nearest POI and carry victims to the outer ring, and explosions damage the
//! structure. It is not the board game.
//!
//! Wall codes: 0 unset, 1 intact, 2 damaged, 3 destroyed.
//! Door codes: 0 doorway without a door, 1 closed, 2 open.
//! Fire codes: 0 clear, 1 smoke, 2 fire.
//! POI codes: 1 victim, 2 false alarm.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::ModelError;
use crate::model::{Agent, Direction, EdgeCodes, Grid, ModelConfig, SimulationModel};

const POIS_ON_BOARD: usize = 3;
const VICTIMS_IN_POOL: u32 = 10;
const FALSE_ALARMS_IN_POOL: u32 = 5;
const SAVED_TO_WIN: i64 = 7;
const DEAD_TO_LOSE: i64 = 4;
const MAX_DAMAGE: i64 = 24;
const INITIAL_FIRES: usize = 3;

const POI_VICTIM: i32 = 1;
const POI_FALSE_ALARM: i32 = 2;
const FIRE: i32 = 2;
const WALL_DESTROYED: i32 = 3;

pub struct SandboxModel {
    width: usize,
    height: usize,
    rng: SmallRng,
    agents: Vec<Agent>,
    carrying: Vec<bool>,
    pois: Grid<i32>,
    fire: Grid<i32>,
    walls: Grid<EdgeCodes>,
    doors: Grid<EdgeCodes>,
    victims_left: u32,
    false_alarms_left: u32,
    victims_saved: i64,
    victims_dead: i64,
    damage_counter: i64,
    finished: bool,
    win: bool,
    reason: Option<String>,
}

impl SandboxModel {
    pub fn new(config: &ModelConfig, seed: u64) -> Result<Self, ModelError> {
        let ModelConfig {
            width,
            height,
            agents,
        } = *config;
        if width < 3 || height < 3 {
            return Err(ModelError::construction(format!(
                "grid {width}x{height} is smaller than 3x3"
            )));
        }
        if agents == 0 || agents > width {
            return Err(ModelError::construction(format!(
                "{agents} agents do not fit on a board {width} cells wide"
            )));
        }

        let mut model = Self {
            width,
            height,
            rng: SmallRng::seed_from_u64(seed),
            agents: (0..agents)
                .map(|i| Agent {
                    id: i as u32 + 1,
                    x: i * width / agents,
                    y: 0,
                })
                .collect(),
            carrying: vec![false; agents],
            pois: Grid::new(width, height),
            fire: Grid::new(width, height),
            walls: build_walls(width, height),
            doors: build_doors(width, height),
            victims_left: VICTIMS_IN_POOL,
            false_alarms_left: FALSE_ALARMS_IN_POOL,
            victims_saved: 0,
            victims_dead: 0,
            damage_counter: 0,
            finished: false,
            win: false,
            reason: None,
        };

        for _ in 0..INITIAL_FIRES {
            let (x, y) = model.random_cell();
            if let Some(f) = model.fire.get_mut(x, y) {
                *f = FIRE;
            }
        }
        model.replenish_pois();
        Ok(model)
    }

    fn random_cell(&mut self) -> (usize, usize) {
        (
            self.rng.random_range(0..self.width),
            self.rng.random_range(0..self.height),
        )
    }

    fn on_outer_ring(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x == self.width - 1 || y == self.height - 1
    }

    fn pois_on_board(&self) -> usize {
        self.pois.as_slice().iter().filter(|&&p| p > 0).count()
    }

    /// Draw from the pool until the board holds `POIS_ON_BOARD` markers.
    fn replenish_pois(&mut self) {
        let mut attempts = 0;
        while self.pois_on_board() < POIS_ON_BOARD
            && self.victims_left + self.false_alarms_left > 0
            && attempts < 100
        {
            attempts += 1;
            let (x, y) = self.random_cell();
            let occupied = self.pois.get(x, y).is_some_and(|&p| p > 0);
            let burning = self.fire.get(x, y).is_some_and(|&f| f == FIRE);
            if occupied || burning {
                continue;
            }
            let pool = self.victims_left + self.false_alarms_left;
            let code = if self.rng.random_range(0..pool) < self.victims_left {
                self.victims_left -= 1;
                POI_VICTIM
            } else {
                self.false_alarms_left -= 1;
                POI_FALSE_ALARM
            };
            if let Some(p) = self.pois.get_mut(x, y) {
                *p = code;
            }
        }
    }

    fn nearest_poi(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        self.pois
            .iter_cells()
            .filter(|&(_, _, p)| *p > 0)
            .min_by_key(|(px, py, _)| px.abs_diff(x) + py.abs_diff(y))
            .map(|(px, py, _)| (px, py))
    }

    fn move_agents(&mut self) {
        for i in 0..self.agents.len() {
            let Agent { x, y, .. } = self.agents[i];

            let target = if self.carrying[i] {
                Some(self.nearest_exit(x, y))
            } else {
                self.nearest_poi(x, y)
            };
            // at most one agent per cell
            let (nx, ny) = target
                .into_iter()
                .flat_map(|(tx, ty)| moves_towards(x, y, tx, ty))
                .find(|&(cx, cy)| !self.agents.iter().any(|a| a.x == cx && a.y == cy))
                .unwrap_or((x, y));
            self.agents[i].x = nx;
            self.agents[i].y = ny;

            if let Some(f) = self.fire.get_mut(nx, ny) {
                if *f > 0 {
                    *f -= 1;
                }
            }

            if self.carrying[i] {
                if self.on_outer_ring(nx, ny) {
                    self.carrying[i] = false;
                    self.victims_saved += 1;
                }
            } else if let Some(p) = self.pois.get_mut(nx, ny) {
                if *p == POI_VICTIM {
                    self.carrying[i] = true;
                }
                *p = 0;
            }
        }
    }

    fn nearest_exit(&self, x: usize, y: usize) -> (usize, usize) {
        let candidates = [
            (0, y),
            (self.width - 1, y),
            (x, 0),
            (x, self.height - 1),
        ];
        candidates
            .into_iter()
            .min_by_key(|&(ex, ey)| ex.abs_diff(x) + ey.abs_diff(y))
            .unwrap_or((x, y))
    }

    fn advance_fire(&mut self) {
        let (x, y) = self.random_cell();
        let Some(level) = self.fire.get(x, y).copied() else {
            return;
        };
        if level < FIRE {
            if let Some(f) = self.fire.get_mut(x, y) {
                *f = level + 1;
            }
        } else {
            self.explode(x, y);
        }

        if self.fire.get(x, y) == Some(&FIRE) {
            if let Some(p) = self.pois.get_mut(x, y) {
                if *p == POI_VICTIM {
                    self.victims_dead += 1;
                }
                *p = 0;
            }
        }
    }

    fn explode(&mut self, x: usize, y: usize) {
        self.damage_counter += 1;
        if let Some(codes) = self.walls.get_mut(x, y) {
            for dir in Direction::ALL {
                if let Some(code) = codes.get(dir) {
                    codes.set(dir, (code.max(1) + 1).min(WALL_DESTROYED));
                }
            }
        }
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
                continue;
            };
            if let Some(f) = self.fire.get_mut(nx, ny) {
                *f = (*f + 1).min(FIRE);
            }
        }
    }

    fn check_terminal(&mut self) {
        let exhausted = self.victims_left + self.false_alarms_left == 0
            && self.pois_on_board() == 0
            && !self.carrying.iter().any(|&c| c);

        let outcome = if self.victims_saved >= SAVED_TO_WIN {
            Some((true, "victory"))
        } else if self.victims_dead >= DEAD_TO_LOSE {
            Some((false, "victims_lost"))
        } else if self.damage_counter >= MAX_DAMAGE {
            Some((false, "collapse"))
        } else if exhausted {
            Some((false, "no_victims_left"))
        } else {
            None
        };

        if let Some((win, reason)) = outcome {
            self.finished = true;
            self.win = win;
            self.reason = Some(reason.to_string());
        }
    }
}

impl SimulationModel for SandboxModel {
    fn step(&mut self) -> Result<(), ModelError> {
        if self.finished {
            return Ok(());
        }
        self.move_agents();
        self.advance_fire();
        self.replenish_pois();
        self.check_terminal();
        Ok(())
    }

    fn finish_game(&self) -> bool {
        self.finished
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn victims_saved(&self) -> i64 {
        self.victims_saved
    }

    fn victims_dead(&self) -> i64 {
        self.victims_dead
    }

    fn damage_counter(&self) -> i64 {
        self.damage_counter
    }

    fn finished(&self) -> Option<bool> {
        Some(self.finished)
    }

    fn win(&self) -> Option<bool> {
        Some(self.win)
    }

    fn reason(&self) -> Option<String> {
        self.reason.clone()
    }

    fn agents(&self) -> &[Agent] {
        &self.agents
    }

    fn pois(&self) -> &Grid<i32> {
        &self.pois
    }

    fn fire(&self) -> &Grid<i32> {
        &self.fire
    }

    fn walls(&self) -> &Grid<EdgeCodes> {
        &self.walls
    }

    fn doors(&self) -> &Grid<EdgeCodes> {
        &self.doors
    }
}

/// Factory for [`SandboxModel`], usable wherever a [`crate::model::ModelFactory`] is expected.
pub fn sandbox_factory(config: &ModelConfig, seed: u64) -> Result<SandboxModel, ModelError> {
    SandboxModel::new(config, seed)
}

/// Outer walls on the perimeter, plus an interior wall east of the middle column.
fn build_walls(width: usize, height: usize) -> Grid<EdgeCodes> {
    let mut walls = Grid::filled(width, height, EdgeCodes::EMPTY);
    let mid = width / 2;
    for y in 0..height {
        for x in 0..width {
            let Some(codes) = walls.get_mut(x, y) else {
                continue;
            };
            if y == 0 {
                codes.set(Direction::N, 0);
            }
            if y == height - 1 {
                codes.set(Direction::S, 0);
            }
            if x == 0 {
                codes.set(Direction::W, 0);
            }
            if x == width - 1 {
                codes.set(Direction::E, 0);
            }
            if x == mid {
                codes.set(Direction::E, 1);
            }
        }
    }
    walls
}

/// A closed and an open door in the interior wall, plus a bare entrance on the west side.
fn build_doors(width: usize, height: usize) -> Grid<EdgeCodes> {
    let mut doors = Grid::filled(width, height, EdgeCodes::EMPTY);
    let mid = width / 2;
    if let Some(codes) = doors.get_mut(mid, height / 2) {
        codes.set(Direction::E, 1);
    }
    if let Some(codes) = doors.get_mut(mid, 1) {
        codes.set(Direction::E, 2);
    }
    if let Some(codes) = doors.get_mut(0, height / 2) {
        codes.set(Direction::W, 0);
    }
    doors
}

/// Single-cell moves that bring `(x, y)` closer to the target, x axis first.
fn moves_towards(x: usize, y: usize, tx: usize, ty: usize) -> Vec<(usize, usize)> {
    let mut moves = Vec::with_capacity(2);
    if x != tx {
        moves.push((if tx > x { x + 1 } else { x - 1 }, y));
    }
    if y != ty {
        moves.push((x, if ty > y { y + 1 } else { y - 1 }));
    }
    moves
}
