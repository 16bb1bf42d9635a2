//! Trial aggregation.
//!
//! Runs qualifying then race for each trial and reduces the finishing orders
//! into win / podium / points frequencies.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::qualifying::QualifyingSampler;
use crate::race::RaceEngine;
use crate::tables::EntityTables;
use crate::types::{Track, TrialResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Podium,
    Points,
}

impl Outcome {
    /// Number of leading positions that count for this outcome.
    pub fn places(self) -> usize {
        match self {
            Outcome::Win => 1,
            Outcome::Podium => 3,
            Outcome::Points => 10,
        }
    }
}

/// Per-driver counters for a batch of trials.
///
/// `merge` is associative and commutative, so batches run on separate
/// workers can be combined in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    trials: u64,
    wins: Vec<u64>,
    podiums: Vec<u64>,
    points: Vec<u64>,
}

impl Tally {
    pub fn new(drivers: usize) -> Self {
        Self {
            trials: 0,
            wins: vec![0; drivers],
            podiums: vec![0; drivers],
            points: vec![0; drivers],
        }
    }

    pub fn record(&mut self, result: &TrialResult) {
        self.trials += 1;
        for (pos, id) in result.order.iter().enumerate() {
            if pos < Outcome::Win.places() {
                self.wins[id.0] += 1;
            }
            if pos < Outcome::Podium.places() {
                self.podiums[id.0] += 1;
            }
            if pos < Outcome::Points.places() {
                self.points[id.0] += 1;
            } else {
                break;
            }
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.trials += other.trials;
        for (a, b) in self.wins.iter_mut().zip(&other.wins) {
            *a += b;
        }
        for (a, b) in self.podiums.iter_mut().zip(&other.podiums) {
            *a += b;
        }
        for (a, b) in self.points.iter_mut().zip(&other.points) {
            *a += b;
        }
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn count(&self, outcome: Outcome, driver: usize) -> u64 {
        match outcome {
            Outcome::Win => self.wins[driver],
            Outcome::Podium => self.podiums[driver],
            Outcome::Points => self.points[driver],
        }
    }

    /// Frequencies keyed by driver name. Every driver appears, zero or not.
    fn frequencies(&self, tables: &EntityTables, outcome: Outcome) -> BTreeMap<String, f64> {
        let n = self.trials.max(1) as f64;
        tables
            .driver_ids()
            .map(|id| (tables.driver(id).name.clone(), self.count(outcome, id.0) as f64 / n))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub track: String,
    pub num_simulations: usize,
    pub win_probabilities: BTreeMap<String, f64>,
    pub podium_probabilities: BTreeMap<String, f64>,
    pub points_probabilities: BTreeMap<String, f64>,
    /// The first few raw finishing orders, winner first.
    #[serde(default)]
    pub race_results: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl AggregateResult {
    pub fn probabilities(&self, outcome: Outcome) -> &BTreeMap<String, f64> {
        match outcome {
            Outcome::Win => &self.win_probabilities,
            Outcome::Podium => &self.podium_probabilities,
            Outcome::Points => &self.points_probabilities,
        }
    }

    pub fn frequency(&self, outcome: Outcome, driver: &str) -> Option<f64> {
        self.probabilities(outcome).get(driver).copied()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Drives `trials` iterations of qualifying followed by a race on one track.
pub struct Aggregator<'a> {
    tables: &'a EntityTables,
    config: &'a SimConfig,
    track: &'a Track,
    sampler: QualifyingSampler,
    engine: RaceEngine<'a>,
}

impl<'a> Aggregator<'a> {
    pub fn new(tables: &'a EntityTables, config: &'a SimConfig, track: &'a Track) -> Self {
        Self {
            tables,
            config,
            track,
            sampler: QualifyingSampler::new(tables, config, track),
            engine: RaceEngine::new(tables, config, track),
        }
    }

    /// One trial: a fresh grid, then a race from it.
    pub fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> TrialResult {
        let grid = self.sampler.sample(rng);
        self.engine.run(&grid, rng)
    }

    /// Runs a batch and returns its tally plus up to `sample_size` raw orders.
    pub fn run_batch<R: Rng + ?Sized>(&self, trials: usize, rng: &mut R) -> (Tally, Vec<TrialResult>) {
        let mut tally = Tally::new(self.tables.driver_count());
        let mut sample = Vec::with_capacity(self.config.sample_size.min(trials));
        for _ in 0..trials {
            let result = self.run_trial(rng);
            tally.record(&result);
            if sample.len() < self.config.sample_size {
                sample.push(result);
            }
        }
        (tally, sample)
    }

    pub fn run<R: Rng + ?Sized>(&self, trials: usize, rng: &mut R) -> Result<AggregateResult> {
        if trials == 0 {
            return Err(SimError::InvalidTrialCount(0));
        }
        let (tally, sample) = self.run_batch(trials, rng);
        Ok(self.finish(&tally, &sample, None))
    }

    /// Turns a completed tally into the published result.
    pub fn finish(&self, tally: &Tally, sample: &[TrialResult], seed: Option<u64>) -> AggregateResult {
        let race_results = sample
            .iter()
            .take(self.config.sample_size)
            .map(|r| r.order.iter().map(|id| self.tables.driver(*id).name.clone()).collect())
            .collect();

        AggregateResult {
            track: self.track.name.clone(),
            num_simulations: tally.trials() as usize,
            win_probabilities: tally.frequencies(self.tables, Outcome::Win),
            podium_probabilities: tally.frequencies(self.tables, Outcome::Podium),
            points_probabilities: tally.frequencies(self.tables, Outcome::Points),
            race_results,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DriverId;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn order(ids: &[usize]) -> TrialResult {
        TrialResult { order: ids.iter().map(|i| DriverId(*i)).collect() }
    }

    #[test]
    fn test_tally_counts_positions() {
        let mut tally = Tally::new(12);
        tally.record(&order(&[3, 1, 2, 0, 4, 5, 6, 7, 8, 9, 10, 11]));
        tally.record(&order(&[1, 3, 11, 0, 4, 5, 6, 7, 8, 9, 10, 2]));

        assert_eq!(tally.trials(), 2);
        assert_eq!(tally.count(Outcome::Win, 3), 1);
        assert_eq!(tally.count(Outcome::Win, 1), 1);
        assert_eq!(tally.count(Outcome::Podium, 1), 2);
        assert_eq!(tally.count(Outcome::Podium, 2), 1);
        assert_eq!(tally.count(Outcome::Points, 10), 0);
        assert_eq!(tally.count(Outcome::Points, 11), 1);
        assert_eq!(tally.count(Outcome::Points, 2), 1);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut a = Tally::new(4);
        a.record(&order(&[0, 1, 2, 3]));
        let mut b = Tally::new(4);
        b.record(&order(&[2, 3, 0, 1]));
        b.record(&order(&[3, 2, 1, 0]));

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.trials(), 3);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let tables = EntityTables::builtin().unwrap();
        let config = SimConfig::default();
        let track = tables.find_track("Monaco").unwrap();
        let agg = Aggregator::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(1);
        assert!(matches!(agg.run(0, &mut rng), Err(SimError::InvalidTrialCount(0))));
    }

    #[test]
    fn test_result_covers_every_driver() {
        let tables = EntityTables::builtin().unwrap();
        let config = SimConfig::default();
        let track = tables.find_track("Canada").unwrap();
        let agg = Aggregator::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(8);

        let result = agg.run(300, &mut rng).unwrap();
        assert_eq!(result.num_simulations, 300);
        assert_eq!(result.track, "Canada");
        for name in tables.driver_names() {
            for outcome in [Outcome::Win, Outcome::Podium, Outcome::Points] {
                let f = result.frequency(outcome, name).unwrap();
                assert!((0.0..=1.0).contains(&f), "{name} {outcome:?} = {f}");
            }
            assert!(result.frequency(Outcome::Podium, name) >= result.frequency(Outcome::Win, name));
            assert!(result.frequency(Outcome::Points, name) >= result.frequency(Outcome::Podium, name));
        }

        let podium_sum: f64 = result.podium_probabilities.values().sum();
        let points_sum: f64 = result.points_probabilities.values().sum();
        assert!((podium_sum - 3.0).abs() < 1e-9);
        assert!((points_sum - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_is_bounded() {
        let tables = EntityTables::builtin().unwrap();
        let mut config = SimConfig::default();
        config.sample_size = 5;
        let track = tables.find_track("Italy").unwrap();
        let agg = Aggregator::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(4);

        let result = agg.run(40, &mut rng).unwrap();
        assert_eq!(result.race_results.len(), 5);
        assert!(result.race_results.iter().all(|r| r.len() == tables.driver_count()));

        let small = agg.run(3, &mut rng).unwrap();
        assert_eq!(small.race_results.len(), 3);
    }

    #[test]
    fn test_export_keys() {
        let tables = EntityTables::builtin().unwrap();
        let config = SimConfig::default();
        let track = tables.find_track("Italy").unwrap();
        let agg = Aggregator::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(6);

        let json: serde_json::Value = serde_json::from_str(&agg.run(2, &mut rng).unwrap().to_json().unwrap()).unwrap();
        assert_eq!(json["race_results"].as_array().unwrap().len(), 2);
        let winner = json["race_results"][0][0].as_str().unwrap();
        assert!(tables.driver_id(winner).is_some());
        assert!(json.get("sample_orders").is_none());
        assert!(json.get("seed").is_none());
    }
}
