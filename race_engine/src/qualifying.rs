//! Qualifying lap-time sampler.
//!
//! Everything except the noise depends only on the driver, car and track, so
//! it is computed once per track and reused for every trial.

use rand::Rng;

use crate::config::SimConfig;
use crate::sampling::sample_gaussian;
use crate::tables::EntityTables;
use crate::types::{DriverId, Track};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSlot {
    pub driver: DriverId,
    /// Simulated lap time in seconds.
    pub lap_time: f64,
}

#[derive(Debug, Clone)]
struct Entry {
    driver: DriverId,
    base_time: f64,
    noise_sd: f64,
}

#[derive(Debug, Clone)]
pub struct QualifyingSampler {
    entries: Vec<Entry>,
    session_noise: f64,
}

impl QualifyingSampler {
    pub fn new(tables: &EntityTables, config: &SimConfig, track: &Track) -> Self {
        let w = &config.qualifying;

        let entries = tables
            .driver_ids()
            .map(|id| {
                let driver = tables.driver(id);
                let car = tables.car_for(id);

                let skill_term = (100.0 - driver.qualifying_pace) * w.skill_weight;
                let car_term = (100.0 - car.performance()) * w.car_weight;
                let experience_bonus = if track.is_street() {
                    driver.experience as f64 * w.street_experience_bonus
                } else {
                    0.0
                };
                // form above 1.0 is a gain
                let form_term = (driver.current_form - 1.0) * w.form_weight;
                let recent_penalty =
                    (driver.recent_average(w.recent_baseline) - w.recent_baseline) * w.recent_weight;
                let upgrade_term = (1.0 - car.upgrade_factor) * w.upgrade_weight;
                let news_bonus = config
                    .news
                    .as_ref()
                    .map_or(0.0, |n| (car.news_total() - 2.0) * n.qualifying_weight);

                let base_time = track.base_qualifying_time + skill_term + car_term - experience_bonus
                    - form_term
                    + recent_penalty
                    + upgrade_term
                    - news_bonus;

                Entry {
                    driver: id,
                    base_time,
                    noise_sd: (1.0 - driver.consistency) * w.consistency_noise,
                }
            })
            .collect();

        Self { entries, session_noise: w.session_noise }
    }

    /// One full grid, fastest first. Equal times keep table order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<GridSlot> {
        let mut grid: Vec<GridSlot> = self
            .entries
            .iter()
            .map(|e| {
                let mut lap_time = e.base_time + sample_gaussian(rng, 0.0, e.noise_sd);
                if self.session_noise > 0.0 {
                    lap_time += sample_gaussian(rng, 0.0, self.session_noise);
                }
                GridSlot { driver: e.driver, lap_time }
            })
            .collect();

        // sort_by is stable
        grid.sort_by(|a, b| a.lap_time.total_cmp(&b.lap_time));
        grid
    }

    /// `trials` independent grids drawn from the same stream.
    pub fn sample_many<R: Rng + ?Sized>(&self, trials: usize, rng: &mut R) -> Vec<Vec<GridSlot>> {
        (0..trials).map(|_| self.sample(rng)).collect()
    }

    /// Lap time with the noise left out.
    pub fn expected_time(&self, driver: DriverId) -> Option<f64> {
        self.entries.iter().find(|e| e.driver == driver).map(|e| e.base_time)
    }
}
