//! Property-based tests for the encoder and the aggregator.

use std::ops::Range;

use proptest::prelude::*;

use castle_rescue::encoder::{doors_list, walls_list};
use castle_rescue::model::{Direction, EdgeCodes, Grid};
use castle_rescue::simulation::{aggregate_results, SimulationResult, Thresholds};

/// Strategy: a height×width matrix as rows.
fn rows_strategy() -> impl Strategy<Value = Vec<Vec<i32>>> {
    (0..8usize, 1..8usize).prop_flat_map(|(w, h)| {
        prop::collection::vec(prop::collection::vec(-3..5i32, w), h)
    })
}

/// Strategy: one cell's edge record, each slot absent or a code in `codes`.
fn edges_strategy(codes: Range<i32>) -> impl Strategy<Value = EdgeCodes> {
    prop::array::uniform4(prop::option::of(codes)).prop_map(EdgeCodes::new)
}

fn edge_grid_strategy(codes: Range<i32>) -> impl Strategy<Value = Grid<EdgeCodes>> {
    (1..6usize, 1..6usize).prop_flat_map(move |(w, h)| {
        prop::collection::vec(edges_strategy(codes.clone()), w * h)
            .prop_map(move |cells| Grid::from_flat(w, h, cells).unwrap())
    })
}

fn result_strategy() -> impl Strategy<Value = SimulationResult> {
    (
        0..12u32,
        0..5u32,
        0..30u32,
        0..500u32,
        any::<bool>(),
        prop::sample::select(vec!["victory", "collapse", "victims_lost", "error"]),
    )
        .prop_map(|(saved, dead, damage, steps, win, reason)| SimulationResult {
            simulation: 0,
            victims_saved: saved,
            victims_dead: dead,
            damage_counter: damage,
            steps,
            finished: true,
            win,
            reason: reason.to_string(),
            error: None,
        })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

proptest! {
    // 1. Reshaping the row-major flattening reproduces the matrix
    #[test]
    fn flatten_round_trip(rows in rows_strategy()) {
        let g = Grid::from_rows(rows.clone()).unwrap();
        let flat = g.flatten();
        prop_assert_eq!(flat.len(), g.width() * g.height());
        let back = Grid::from_flat(g.width(), g.height(), flat).unwrap();
        prop_assert_eq!(back.to_rows(), rows);
    }

    // 2. Every recorded wall slot is emitted exactly once with state >= 1
    #[test]
    fn wall_emission_total(walls in edge_grid_strategy(0..4)) {
        let emitted = walls_list(&walls).unwrap();
        let recorded: usize = walls.as_slice().iter().map(|c| c.entries().count()).sum();
        prop_assert_eq!(emitted.len(), recorded);
        for e in &emitted {
            prop_assert!(e.state >= 1);
            let raw = walls.get(e.x, e.y).and_then(|c| c.get(e.direction));
            prop_assert!(raw.is_some());
            let raw = raw.unwrap();
            prop_assert_eq!(e.state, if raw == 0 { 1 } else { raw });
        }
    }

    // 2b. A single negative wall code anywhere rejects the whole grid
    #[test]
    fn negative_wall_code_rejected(
        mut walls in edge_grid_strategy(-1..4),
        cell in any::<prop::sample::Index>(),
        slot in 0..4usize,
    ) {
        let (w, h) = (walls.width(), walls.height());
        let i = cell.index(w * h);
        if let Some(codes) = walls.get_mut(i % w, i / w) {
            codes.set(Direction::ALL[slot], -1);
        }
        prop_assert!(walls_list(&walls).is_err());
    }

    // 3. A door is emitted iff its raw code is > 0, with the raw value
    #[test]
    fn door_emission_selective(doors in edge_grid_strategy(-1..4)) {
        let emitted = doors_list(&doors);
        for (x, y, codes) in doors.iter_cells() {
            for d in Direction::ALL {
                let hits: Vec<_> = emitted
                    .iter()
                    .filter(|e| e.x == x && e.y == y && e.direction == d)
                    .collect();
                match codes.get(d) {
                    Some(raw) if raw > 0 => {
                        prop_assert_eq!(hits.len(), 1);
                        prop_assert_eq!(hits[0].state, raw);
                    }
                    _ => prop_assert!(hits.is_empty()),
                }
            }
        }
    }

    // 4. Aggregating two halves and merging equals aggregating the whole
    #[test]
    fn aggregation_additive(
        results in prop::collection::vec(result_strategy(), 2..60),
        split in any::<prop::sample::Index>(),
    ) {
        let cut = 1 + split.index(results.len() - 1);
        let (a, b) = results.split_at(cut);
        let t = Thresholds::default();
        let merged = aggregate_results(a, t).unwrap().merge(&aggregate_results(b, t).unwrap()).unwrap();
        let full = aggregate_results(&results, t).unwrap();

        prop_assert_eq!(merged.num_simulations, full.num_simulations);
        prop_assert_eq!(&merged.victims_saved_distribution, &full.victims_saved_distribution);
        prop_assert_eq!(&merged.reasons, &full.reasons);
        prop_assert_eq!(merged.successful, full.successful);
        prop_assert_eq!(merged.total_wins, full.total_wins);
        prop_assert!(close(merged.success_rate, full.success_rate));
        prop_assert!(close(merged.win_rate, full.win_rate));
        prop_assert!(close(merged.average_victims_saved, full.average_victims_saved));
        prop_assert!(close(merged.average_steps, full.average_steps));
    }

    // 5. Statistics do not depend on result order
    #[test]
    fn aggregation_order_independent(results in prop::collection::vec(result_strategy(), 1..40)) {
        let t = Thresholds::default();
        let forward = aggregate_results(&results, t).unwrap();
        let mut reversed = results.clone();
        reversed.reverse();
        let backward = aggregate_results(&reversed, t).unwrap();
        prop_assert_eq!(forward.victims_saved_distribution, backward.victims_saved_distribution);
        prop_assert_eq!(forward.reasons, backward.reasons);
        prop_assert_eq!(forward.successful, backward.successful);
        prop_assert!(close(forward.average_victims_saved, backward.average_victims_saved));
        prop_assert!(close(forward.average_steps, backward.average_steps));
    }
}
