//! # Castle Rescue: live session server and Monte-Carlo harness
//!
//! The rules of the rescue game (fire and smoke spread, agent moves, victim
//! resolution) live behind the [`model::SimulationModel`] trait. This crate
//! only captures, serves and summarizes the state such an engine produces.
//!
//! ## Components
//!
//! | Component | Rust module | Description |
//! |-----------|-------------|-------------|
//! | StateEncoder | [`encoder`] | Read-only projection of engine state into a [`encoder::WireState`] |
//! | SessionController | [`session`] | Owns one live engine instance; `step` / `reset` for the renderer |
//! | BatchHarness | [`simulation::harness`] | Runs N independent instances on rayon, isolating per-run failures |
//! | ResultAggregator | [`simulation::statistics`] | Folds per-run results into an [`simulation::AggregateReport`] |
//!
//! The HTTP surface is in [`server`]; [`sandbox`] provides a seeded stand-in
//! engine used by the binaries and tests.
//!
//! ## Grid layout
//!
//! Every per-cell matrix is `height × width`, stored row-major: cell `(x, y)`
//! lives at index `y * width + x`. The wire format flattens matrices in the
//! same order, so the renderer can reshape by `(width, height)`.

pub mod constants;
pub mod encoder;
pub mod env_config;
pub mod error;
pub mod model;
pub mod sandbox;
pub mod server;
pub mod session;
pub mod simulation;
