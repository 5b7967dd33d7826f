//! Live session: one engine instance polled by the renderer.
//!
//! The controller owns the instance behind a mutex, so concurrent `step` and
//! `reset` calls are serialized. Once the game reports terminal, `step` stops
//! advancing and keeps returning the same snapshot until the next reset.
//!
//! Every engine call goes through [`guarded`]: a failing or panicking turn is
//! returned as an error and the session keeps serving.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::encoder::{encode, WireState};
use crate::error::CastleError;
use crate::model::{guarded, Counters, ModelConfig, ModelFactory, SimulationModel};

/// Snapshot returned to the renderer: the encoded board plus session counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: WireState,
    /// Turns taken since the last reset.
    pub turn: u32,
    pub victims_saved: u32,
    pub victims_dead: u32,
    pub damage_counter: u32,
}

struct Session<M> {
    model: M,
    turns: u32,
    generation: u64,
}

pub struct SessionController<F: ModelFactory> {
    factory: F,
    config: ModelConfig,
    base_seed: u64,
    inner: Mutex<Session<F::Model>>,
}

impl<F: ModelFactory> SessionController<F> {
    /// Build the first instance. Fails if the engine cannot be constructed.
    pub fn new(factory: F, config: ModelConfig, base_seed: u64) -> Result<Self, CastleError> {
        let model = guarded(|| factory.build(&config, base_seed))?;
        info!(
            width = config.width,
            height = config.height,
            agents = config.agents,
            seed = base_seed,
            "session.created"
        );
        Ok(Self {
            factory,
            config,
            base_seed,
            inner: Mutex::new(Session {
                model,
                turns: 0,
                generation: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Session<F::Model>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance one turn unless the game is over, then snapshot.
    pub fn step(&self) -> Result<SessionSnapshot, CastleError> {
        let mut session = self.lock();
        let Session { model, turns, .. } = &mut *session;

        let advanced = guarded(|| {
            if model.finish_game() {
                Ok(false)
            } else {
                model.step().map(|()| true)
            }
        });
        match advanced {
            Ok(true) => *turns += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(turn = *turns, error = %e, "session.step_failed");
                return Err(e.into());
            }
        }

        snapshot_of(&*model, *turns)
    }

    /// Snapshot without advancing.
    pub fn snapshot(&self) -> Result<SessionSnapshot, CastleError> {
        let session = self.lock();
        snapshot_of(&session.model, session.turns)
    }

    /// Replace the instance with a fresh one. On failure the old instance stays.
    pub fn reset(&self) -> Result<(), CastleError> {
        let mut session = self.lock();
        let generation = session.generation + 1;
        let seed = self.base_seed.wrapping_add(generation);
        let model = guarded(|| self.factory.build(&self.config, seed)).map_err(|e| {
            warn!(generation, error = %e, "session.reset_failed");
            CastleError::from(e)
        })?;
        *session = Session {
            model,
            turns: 0,
            generation,
        };
        info!(generation, seed, "session.reset");
        Ok(())
    }

    /// Turns taken since the last reset.
    pub fn turns(&self) -> u32 {
        self.lock().turns
    }
}

fn snapshot_of<M: SimulationModel>(model: &M, turn: u32) -> Result<SessionSnapshot, CastleError> {
    let state = guarded(|| Ok(encode(model)))??;
    let counters = Counters::read(model)?;
    Ok(SessionSnapshot {
        state,
        turn,
        victims_saved: counters.victims_saved,
        victims_dead: counters.victims_dead,
        damage_counter: counters.damage_counter,
    })
}
