//! State encoder: read-only projection of a model into the renderer's wire format.
//!
//! All matrices are flattened row-major (index = y * width + x). Walls and doors
//! are emitted as sparse edge lists:
//!
//! - **walls**: every recorded `(cell, direction)` slot is emitted; a raw code
//!   of 0 (unset) is reported as 1 (intact). A negative code is an invalid
//!   model state.
//! - **doors**: a slot is emitted only when its raw code is > 0, unmodified.

use serde::{Deserialize, Serialize};

use crate::error::CastleError;
use crate::model::{Direction, EdgeCodes, Grid, SimulationModel};

/// One edge of one cell, as sent to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub x: usize,
    pub y: usize,
    pub direction: Direction,
    pub state: i32,
}

/// Snapshot of a model. Every flat array has `width * height` entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireState {
    pub width: usize,
    pub height: usize,
    pub fire: Vec<i32>,
    pub agents: Vec<u32>,
    pub pois: Vec<u8>,
    pub walls: Vec<EdgeRecord>,
    pub doors: Vec<EdgeRecord>,
    pub game_status: bool,
}

/// Encode the current state of `model`. Never mutates the model.
pub fn encode<M: SimulationModel + ?Sized>(model: &M) -> Result<WireState, CastleError> {
    let width = model.width();
    let height = model.height();

    check_dims("fire", model.fire(), width, height)?;
    check_dims("pois", model.pois(), width, height)?;
    check_dims("walls", model.walls(), width, height)?;
    check_dims("doors", model.doors(), width, height)?;

    Ok(WireState {
        width,
        height,
        fire: model.fire().flatten(),
        agents: agents_grid(model)?.flatten(),
        pois: pois_grid(model.pois()).flatten(),
        walls: walls_list(model.walls())?,
        doors: doors_list(model.doors()),
        game_status: model.finish_game(),
    })
}

/// Occupancy matrix: agent id at its cell, 0 elsewhere.
pub fn agents_grid<M: SimulationModel + ?Sized>(model: &M) -> Result<Grid<u32>, CastleError> {
    let mut grid = Grid::new(model.width(), model.height());
    for agent in model.agents() {
        if agent.id == 0 {
            return Err(CastleError::invalid_state(format!(
                "agent at ({}, {}) has identifier 0",
                agent.x, agent.y
            )));
        }
        let cell = grid.get_mut(agent.x, agent.y).ok_or_else(|| {
            CastleError::invalid_state(format!(
                "agent {} at ({}, {}) is outside the {}x{} grid",
                agent.id,
                agent.x,
                agent.y,
                model.width(),
                model.height()
            ))
        })?;
        *cell = agent.id;
    }
    Ok(grid)
}

/// Presence matrix: 1 where the POI value is > 0.
pub fn pois_grid(pois: &Grid<i32>) -> Grid<u8> {
    pois.map(|&v| u8::from(v > 0))
}

pub fn walls_list(walls: &Grid<EdgeCodes>) -> Result<Vec<EdgeRecord>, CastleError> {
    let mut out = Vec::new();
    for (x, y, codes) in walls.iter_cells() {
        for (direction, raw) in codes.entries() {
            if raw < 0 {
                return Err(CastleError::invalid_state(format!(
                    "wall {direction:?} of ({x}, {y}) has code {raw}"
                )));
            }
            let state = raw.max(1);
            out.push(EdgeRecord {
                x,
                y,
                direction,
                state,
            });
        }
    }
    Ok(out)
}

pub fn doors_list(doors: &Grid<EdgeCodes>) -> Vec<EdgeRecord> {
    let mut out = Vec::new();
    for (x, y, codes) in doors.iter_cells() {
        for (direction, state) in codes.entries() {
            if state > 0 {
                out.push(EdgeRecord {
                    x,
                    y,
                    direction,
                    state,
                });
            }
        }
    }
    out
}

fn check_dims<T>(
    name: &str,
    grid: &Grid<T>,
    width: usize,
    height: usize,
) -> Result<(), CastleError> {
    if grid.width() != width || grid.height() != height {
        return Err(CastleError::invalid_state(format!(
            "{name} matrix is {}x{}, model is {}x{}",
            grid.width(),
            grid.height(),
            width,
            height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::model::Agent;

    struct Frozen {
        width: usize,
        height: usize,
        agents: Vec<Agent>,
        pois: Grid<i32>,
        fire: Grid<i32>,
        walls: Grid<EdgeCodes>,
        doors: Grid<EdgeCodes>,
    }

    impl Frozen {
        fn new(width: usize, height: usize) -> Self {
            Self {
                width,
                height,
                agents: Vec::new(),
                pois: Grid::new(width, height),
                fire: Grid::new(width, height),
                walls: Grid::new(width, height),
                doors: Grid::new(width, height),
            }
        }
    }

    impl SimulationModel for Frozen {
        fn step(&mut self) -> Result<(), ModelError> {
            Ok(())
        }
        fn finish_game(&self) -> bool {
            false
        }
        fn width(&self) -> usize {
            self.width
        }
        fn height(&self) -> usize {
            self.height
        }
        fn victims_saved(&self) -> i64 {
            0
        }
        fn victims_dead(&self) -> i64 {
            0
        }
        fn damage_counter(&self) -> i64 {
            0
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

    #[test]
    fn test_flat_arrays_have_full_length() {
        let m = Frozen::new(10, 8);
        let s = encode(&m).unwrap();
        assert_eq!(s.fire.len(), 80);
        assert_eq!(s.agents.len(), 80);
        assert_eq!(s.pois.len(), 80);
        assert!(s.walls.is_empty());
        assert!(s.doors.is_empty());
    }

    #[test]
    fn test_agents_placed_row_major() {
        let mut m = Frozen::new(4, 3);
        m.agents = vec![Agent { id: 5, x: 3, y: 2 }, Agent { id: 1, x: 1, y: 0 }];
        let s = encode(&m).unwrap();
        assert_eq!(s.agents[2 * 4 + 3], 5);
        assert_eq!(s.agents[1], 1);
        assert_eq!(s.agents.iter().filter(|&&a| a != 0).count(), 2);
    }

    #[test]
    fn test_pois_presence_and_fire_copy() {
        let mut m = Frozen::new(3, 1);
        m.pois = Grid::from_flat(3, 1, vec![0, 3, -1]).unwrap();
        m.fire = Grid::from_flat(3, 1, vec![2, 0, 1]).unwrap();
        let s = encode(&m).unwrap();
        assert_eq!(s.pois, vec![0, 1, 0]);
        assert_eq!(s.fire, vec![2, 0, 1]);
    }

    #[test]
    fn test_wall_zero_is_reported_intact() {
        let mut m = Frozen::new(2, 1);
        m.walls = Grid::from_flat(
            2,
            1,
            vec![
                EdgeCodes::new([Some(0), None, Some(2), None]),
                EdgeCodes::EMPTY,
            ],
        )
        .unwrap();
        let s = encode(&m).unwrap();
        assert_eq!(
            s.walls,
            vec![
                EdgeRecord { x: 0, y: 0, direction: Direction::N, state: 1 },
                EdgeRecord { x: 0, y: 0, direction: Direction::S, state: 2 },
            ]
        );
    }

    #[test]
    fn test_negative_wall_code_rejected() {
        let mut m = Frozen::new(1, 1);
        m.walls = Grid::from_flat(1, 1, vec![EdgeCodes::new([None, None, Some(-1), None])])
            .unwrap();
        let err = encode(&m).unwrap_err();
        assert!(matches!(err, CastleError::InvalidModelState { .. }));
        assert!(err.to_string().contains("code -1"));
    }

    #[test]
    fn test_door_zero_is_omitted() {
        let mut m = Frozen::new(1, 2);
        m.doors = Grid::from_flat(
            1,
            2,
            vec![
                EdgeCodes::new([Some(0), Some(1), None, None]),
                EdgeCodes::new([None, None, None, Some(2)]),
            ],
        )
        .unwrap();
        let s = encode(&m).unwrap();
        assert_eq!(
            s.doors,
            vec![
                EdgeRecord { x: 0, y: 0, direction: Direction::E, state: 1 },
                EdgeRecord { x: 0, y: 1, direction: Direction::W, state: 2 },
            ]
        );
    }

    #[test]
    fn test_agent_out_of_bounds_rejected() {
        let mut m = Frozen::new(2, 2);
        m.agents = vec![Agent { id: 1, x: 2, y: 0 }];
        let err = encode(&m).unwrap_err();
        assert!(matches!(err, CastleError::InvalidModelState { .. }));
    }

    #[test]
    fn test_zero_agent_id_rejected() {
        let mut m = Frozen::new(2, 2);
        m.agents = vec![Agent { id: 0, x: 0, y: 0 }];
        assert!(encode(&m).is_err());
    }

    #[test]
    fn test_mismatched_matrix_rejected() {
        let mut m = Frozen::new(2, 2);
        m.fire = Grid::new(3, 2);
        assert!(encode(&m).is_err());
    }

    #[test]
    fn test_wire_json_field_names() {
        let m = Frozen::new(1, 1);
        let json = serde_json::to_value(encode(&m).unwrap()).unwrap();
        assert_eq!(json["gameStatus"], false);
        assert_eq!(json["width"], 1);
        assert!(json.get("game_status").is_none());
    }
}
