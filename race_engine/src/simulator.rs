use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::aggregate::{AggregateResult, Aggregator, Tally};
use crate::config::{Preset, SimConfig};
use crate::error::{Result, SimError};
use crate::sampling::fresh_seed;
use crate::tables::EntityTables;
use crate::types::{Driver, Track, TrialResult};

/// Entry point for hosts: owns the entity tables and the model configuration.
///
/// Every run draws from its own `ChaChaRng`. Unseeded runs pick a fresh seed
/// and log it, so any run can be replayed with [`Simulator::run_simulation_seeded`].
/// Unknown track names are an error; there is no fallback circuit.
#[derive(Debug, Clone)]
pub struct Simulator {
    tables: EntityTables,
    config: SimConfig,
}

impl Simulator {
    pub fn new(tables: EntityTables, config: SimConfig) -> Self {
        Self { tables, config }
    }

    pub fn builtin(preset: Preset) -> Result<Self> {
        Ok(Self::new(EntityTables::builtin()?, SimConfig::preset(preset)))
    }

    pub fn tables(&self) -> &EntityTables {
        &self.tables
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn run_simulation(&self, track: &str, trials: usize) -> Result<AggregateResult> {
        let seed = fresh_seed();
        tracing::debug!(seed, track, "unseeded run");
        self.run_simulation_seeded(track, trials, seed)
    }

    pub fn run_simulation_seeded(&self, track: &str, trials: usize, seed: u64) -> Result<AggregateResult> {
        let track = self.prepare(track, trials)?;
        let started = Instant::now();
        tracing::info!(track = %track.name, trials, "running simulation");

        let aggregator = Aggregator::new(&self.tables, &self.config, track);
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let (tally, sample) = aggregator.run_batch(trials, &mut rng);
        let result = aggregator.finish(&tally, &sample, Some(seed));

        tracing::info!(
            track = %track.name,
            trials,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation complete"
        );
        Ok(result)
    }

    /// Splits the trials across `workers` threads, one ChaCha stream each.
    ///
    /// Output depends on `(seed, workers)`; with one worker it matches
    /// [`Simulator::run_simulation_seeded`] exactly.
    pub fn run_simulation_parallel(
        &self,
        track: &str,
        trials: usize,
        seed: u64,
        workers: usize,
    ) -> Result<AggregateResult> {
        let track = self.prepare(track, trials)?;
        let workers = workers.clamp(1, trials);
        let started = Instant::now();
        tracing::info!(track = %track.name, trials, workers, "running simulation");

        let aggregator = Aggregator::new(&self.tables, &self.config, track);
        let per_worker = trials / workers;
        let extra = trials % workers;

        let batches: Vec<(Tally, Vec<TrialResult>)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let aggregator = &aggregator;
                    let count = per_worker + usize::from(w < extra);
                    s.spawn(move || {
                        let mut rng = ChaChaRng::seed_from_u64(seed);
                        rng.set_stream(w as u64);
                        aggregator.run_batch(count, &mut rng)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut tally = Tally::new(self.tables.driver_count());
        let mut sample = Vec::new();
        for (batch_tally, batch_sample) in batches {
            tally.merge(&batch_tally);
            sample.extend(batch_sample);
        }
        let result = aggregator.finish(&tally, &sample, Some(seed));

        tracing::info!(
            track = %track.name,
            trials,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation complete"
        );
        Ok(result)
    }

    /// Raw finishing orders for every trial of a seeded run.
    pub fn run_trials(&self, track: &str, trials: usize, seed: u64) -> Result<Vec<TrialResult>> {
        let track = self.prepare(track, trials)?;
        let aggregator = Aggregator::new(&self.tables, &self.config, track);
        let mut rng = ChaChaRng::seed_from_u64(seed);
        Ok((0..trials).map(|_| aggregator.run_trial(&mut rng)).collect())
    }

    pub fn get_driver_profile(&self, name: &str) -> Result<&Driver> {
        self.tables.get_driver_profile(name)
    }

    pub fn get_track_profile(&self, name: &str) -> Result<&Track> {
        self.tables.get_track_profile(name)
    }

    // Trial count is checked before the track so no work starts on bad input.
    fn prepare(&self, track: &str, trials: usize) -> Result<&Track> {
        if trials == 0 {
            return Err(SimError::InvalidTrialCount(0));
        }
        self.tables
            .find_track(track)
            .ok_or_else(|| SimError::UnknownTrack(track.to_string()))
    }
}
