//! Lap-by-lap race evolution.
//!
//! Each lap applies, in order: the DNF hazard check, tire wear and pit stops
//! (when a tire model is configured), then one overtake sweep.
//!
//! Rules the statistics depend on:
//! - A retired driver is moved to the back of the order exactly once and
//!   stays in the order. Retired cars remain eligible for overtake
//!   resolution against the car in front of them.
//! - The overtake sweep is a single left-to-right pass over adjacent pairs.
//!   A passing driver gains at most one place per lap. The driver just passed
//!   drops one slot and is compared again with the next car, so it can lose
//!   several places in one lap. This is not a sort and must not become one.

use rand::Rng;

use crate::config::SimConfig;
use crate::qualifying::GridSlot;
use crate::sampling::chance;
use crate::tables::EntityTables;
use crate::types::{DriverId, TireCompound, TireStrategy, Track, TrialResult};

/// Per-driver values the lap loop reads, flattened out of the tables.
#[derive(Debug, Clone)]
struct RaceProfile {
    race_pace: f64,
    race_craft: f64,
    aero: f64,
    news_total: f64,
    recent_avg: f64,
    dnf_probability: f64,
    wear_rate: f64,
}

#[derive(Debug, Clone)]
pub struct RaceState {
    order: Vec<DriverId>,
    retired: Vec<bool>,
    tires: Option<Vec<TireStrategy>>,
    laps_completed: u32,
}

impl RaceState {
    pub fn order(&self) -> &[DriverId] {
        &self.order
    }

    pub fn is_retired(&self, driver: DriverId) -> bool {
        self.retired[driver.0]
    }

    pub fn retired_count(&self) -> usize {
        self.retired.iter().filter(|r| **r).count()
    }

    pub fn tire(&self, driver: DriverId) -> Option<&TireStrategy> {
        self.tires.as_ref().map(|t| &t[driver.0])
    }

    pub fn laps_completed(&self) -> u32 {
        self.laps_completed
    }

    pub fn into_result(self) -> TrialResult {
        TrialResult { order: self.order }
    }
}

pub struct RaceEngine<'a> {
    config: &'a SimConfig,
    overtake_scale: f64,
    profiles: Vec<RaceProfile>,
}

impl<'a> RaceEngine<'a> {
    pub fn new(tables: &EntityTables, config: &'a SimConfig, track: &Track) -> Self {
        let baseline = config.qualifying.recent_baseline;
        let profiles = tables
            .driver_ids()
            .map(|id| {
                let driver = tables.driver(id);
                let car = tables.car_for(id);
                RaceProfile {
                    race_pace: driver.race_pace,
                    race_craft: driver.race_craft,
                    aero: car.aero_efficiency,
                    news_total: car.news_total(),
                    recent_avg: driver.recent_average(baseline),
                    dnf_probability: (1.0 - car.reliability) * config.dnf.car_weight
                        + (1.0 - driver.physical_fitness / 100.0) * config.dnf.driver_weight,
                    wear_rate: track.tire_wear_rate
                        * car.tire_degradation
                        * (1.0 - driver.tire_management / 100.0),
                }
            })
            .collect();

        Self {
            config,
            overtake_scale: 1.0 - track.overtaking_difficulty,
            profiles,
        }
    }

    /// Runs a full race from a qualifying grid.
    pub fn run<R: Rng + ?Sized>(&self, grid: &[GridSlot], rng: &mut R) -> TrialResult {
        let mut state = self.start(grid, rng);
        for _ in 0..self.config.laps {
            self.advance_lap(&mut state, rng);
        }
        state.into_result()
    }

    pub fn start<R: Rng + ?Sized>(&self, grid: &[GridSlot], rng: &mut R) -> RaceState {
        let order: Vec<DriverId> = grid.iter().map(|slot| slot.driver).collect();

        let tires = self.config.tires.as_ref().map(|_| {
            let mut tires = vec![TireStrategy::fitted(TireCompound::Medium); self.profiles.len()];
            for id in &order {
                tires[id.0] = TireStrategy::fitted(random_compound(rng));
            }
            tires
        });

        RaceState {
            retired: vec![false; self.profiles.len()],
            order,
            tires,
            laps_completed: 0,
        }
    }

    pub fn advance_lap<R: Rng + ?Sized>(&self, state: &mut RaceState, rng: &mut R) {
        self.check_failures(state, rng);
        self.wear_tires(state, rng);
        self.resolve_overtakes(state, rng);
        state.laps_completed += 1;
    }

    fn check_failures<R: Rng + ?Sized>(&self, state: &mut RaceState, rng: &mut R) {
        let mut failed = Vec::new();
        for id in &state.order {
            if state.retired[id.0] {
                continue;
            }
            if chance(rng, self.profiles[id.0].dnf_probability) {
                failed.push(*id);
            }
        }
        if failed.is_empty() {
            return;
        }

        state.order.retain(|id| !failed.contains(id));
        for id in failed {
            tracing::trace!(driver = id.0, lap = state.laps_completed + 1, "retired");
            state.retired[id.0] = true;
            state.order.push(id);
        }
    }

    fn wear_tires<R: Rng + ?Sized>(&self, state: &mut RaceState, rng: &mut R) {
        let (Some(model), Some(tires)) = (self.config.tires.as_ref(), state.tires.as_mut()) else {
            return;
        };

        for id in &state.order {
            if state.retired[id.0] {
                continue;
            }
            let tire = &mut tires[id.0];
            tire.add_wear(self.profiles[id.0].wear_rate);
            if tire.wear > model.wear_threshold && chance(rng, model.pit_probability) {
                *tire = TireStrategy::fitted(random_compound(rng));
            }
        }
    }

    fn resolve_overtakes<R: Rng + ?Sized>(&self, state: &mut RaceState, rng: &mut R) {
        let multiplier = match &self.config.safety_car {
            Some(sc) if chance(rng, sc.probability) => sc.multiplier,
            _ => 1.0,
        };

        for i in 0..state.order.len().saturating_sub(1) {
            let ahead = state.order[i];
            let behind = state.order[i + 1];
            let p = (self.overtake_probability(ahead, behind, state.tires.as_deref()) * multiplier)
                .clamp(0.0, 1.0);
            if chance(rng, p) {
                state.order.swap(i, i + 1);
            }
        }
    }

    /// Chance that `behind` passes `ahead` on one lap, before any safety car.
    pub fn overtake_probability(
        &self,
        ahead: DriverId,
        behind: DriverId,
        tires: Option<&[TireStrategy]>,
    ) -> f64 {
        let w = &self.config.overtake;
        let a = &self.profiles[ahead.0];
        let b = &self.profiles[behind.0];

        let mut pace = (b.race_pace - a.race_pace) / 100.0;
        if w.include_aero {
            pace += (b.aero - a.aero) / 100.0;
        }
        if let (Some(model), Some(tires)) = (&self.config.tires, tires) {
            pace += (tires[ahead.0].wear - tires[behind.0].wear) * model.wear_weight;
        }

        let mut p = w.base + pace * w.pace_weight + (b.race_craft - a.race_craft) / 100.0 * w.craft_weight;

        // lower average finishing position is better form
        if let Some(form) = &self.config.recent_form {
            p += (a.recent_avg - b.recent_avg) * form.overtake_weight;
        }
        if let Some(news) = &self.config.news {
            p += (b.news_total - a.news_total) * news.overtake_weight;
        }

        (p * self.overtake_scale).clamp(0.0, 1.0)
    }
}

fn random_compound<R: Rng + ?Sized>(rng: &mut R) -> TireCompound {
    TireCompound::DRY[rng.random_range(0..TireCompound::DRY.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Preset, SafetyCar};
    use crate::qualifying::QualifyingSampler;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn grid_in_table_order(tables: &EntityTables) -> Vec<GridSlot> {
        tables
            .driver_ids()
            .map(|driver| GridSlot { driver, lap_time: 0.0 })
            .collect()
    }

    fn assert_permutation(order: &[DriverId], n: usize) {
        let mut ids: Vec<usize> = order.iter().map(|d| d.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..n).collect::<Vec<_>>(), "finishing order must contain every starter once");
    }

    #[test]
    fn test_every_starter_finishes_once() {
        let tables = EntityTables::builtin().unwrap();
        let config = SimConfig::default();
        let track = tables.find_track("Hungary").unwrap();
        let engine = RaceEngine::new(&tables, &config, track);
        let sampler = QualifyingSampler::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(11);

        for _ in 0..200 {
            let grid = sampler.sample(&mut rng);
            let result = engine.run(&grid, &mut rng);
            assert_permutation(&result.order, tables.driver_count());
        }
    }

    #[test]
    fn test_certain_failure_retires_each_driver_once() {
        let tables = EntityTables::builtin().unwrap();
        let mut config = SimConfig::preset(Preset::Basic);
        config.dnf.car_weight = 1.0e6;
        config.overtake.base = 0.0;
        config.overtake.pace_weight = 0.0;
        config.overtake.craft_weight = 0.0;
        let track = tables.find_track("Austria").unwrap();
        let engine = RaceEngine::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(5);

        let grid = grid_in_table_order(&tables);
        let mut state = engine.start(&grid, &mut rng);
        engine.advance_lap(&mut state, &mut rng);

        // everyone fails on lap one and is re-queued in running order
        assert_eq!(state.retired_count(), tables.driver_count());
        let expected: Vec<DriverId> = tables.driver_ids().collect();
        assert_eq!(state.order(), expected.as_slice());

        // nobody re-triggers on later laps
        for _ in 0..10 {
            engine.advance_lap(&mut state, &mut rng);
        }
        assert_eq!(state.order(), expected.as_slice());
        assert_eq!(state.laps_completed(), 11);
    }

    #[test]
    fn test_retirement_moves_to_back() {
        let tables = EntityTables::builtin().unwrap();
        let mut config = SimConfig::preset(Preset::Basic);
        config.overtake.base = 0.0;
        config.overtake.pace_weight = 0.0;
        config.overtake.craft_weight = 0.0;
        let track = tables.find_track("Austria").unwrap();
        let mut engine = RaceEngine::new(&tables, &config, track);
        for (i, profile) in engine.profiles.iter_mut().enumerate() {
            profile.dnf_probability = if i == 0 { 1.0 } else { 0.0 };
        }
        let mut rng = ChaChaRng::seed_from_u64(5);

        let grid = grid_in_table_order(&tables);
        let mut state = engine.start(&grid, &mut rng);
        engine.advance_lap(&mut state, &mut rng);

        assert!(state.is_retired(DriverId(0)));
        assert_eq!(state.retired_count(), 1);
        assert_eq!(*state.order().last().unwrap(), DriverId(0));
        assert_eq!(state.order()[0], DriverId(1));
    }

    #[test]
    fn test_single_left_to_right_sweep() {
        let tables = EntityTables::builtin().unwrap();
        let mut config = SimConfig::preset(Preset::Basic);
        config.dnf.car_weight = 0.0;
        config.dnf.driver_weight = 0.0;
        // every pair swaps
        config.overtake.base = 1.0;
        config.overtake.pace_weight = 0.0;
        config.overtake.craft_weight = 0.0;
        let mut track = tables.find_track("Austria").unwrap().clone();
        track.overtaking_difficulty = 0.0;
        let engine = RaceEngine::new(&tables, &config, &track);
        let mut rng = ChaChaRng::seed_from_u64(9);

        let grid: Vec<GridSlot> = grid_in_table_order(&tables).into_iter().take(4).collect();
        let mut state = engine.start(&grid, &mut rng);
        engine.advance_lap(&mut state, &mut rng);

        // [0,1,2,3] -> swap(0,1) [1,0,2,3] -> swap(1,2) [1,2,0,3] -> swap(2,3) [1,2,3,0]
        let got: Vec<usize> = state.order().iter().map(|d| d.0).collect();
        assert_eq!(got, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_overtake_probability_bounds_and_difficulty() {
        let tables = EntityTables::builtin().unwrap();
        let config = SimConfig::preset(Preset::Season2025);
        let monaco = tables.find_track("Monaco").unwrap();
        let austria = tables.find_track("Austria").unwrap();
        let hard = RaceEngine::new(&tables, &config, monaco);
        let easy = RaceEngine::new(&tables, &config, austria);

        let max = tables.driver_id("Max Verstappen").unwrap();
        let franco = tables.driver_id("Franco Colapinto").unwrap();

        let p_hard = hard.overtake_probability(franco, max, None);
        let p_easy = easy.overtake_probability(franco, max, None);
        assert!(p_hard > 0.0 && p_hard <= 1.0);
        assert!(p_easy > p_hard, "easier track should allow more passing");

        // the slower car behind is clamped at zero, never negative
        for a in tables.driver_ids() {
            for b in tables.driver_ids() {
                let p = hard.overtake_probability(a, b, None);
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }

    #[test]
    fn test_tire_wear_triggers_pit_stops() {
        let tables = EntityTables::builtin().unwrap();
        let mut config = SimConfig::preset(Preset::Realistic);
        config.dnf.car_weight = 0.0;
        config.dnf.driver_weight = 0.0;
        let track = tables.find_track("Bahrain").unwrap();
        let engine = RaceEngine::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(21);

        let grid = grid_in_table_order(&tables);
        let mut state = engine.start(&grid, &mut rng);
        let mut pitted = false;
        for _ in 0..config.laps {
            let before: Vec<u32> = tables.driver_ids().map(|id| state.tire(id).unwrap().age).collect();
            engine.advance_lap(&mut state, &mut rng);
            for id in tables.driver_ids() {
                let tire = state.tire(id).unwrap();
                assert!((0.0..=1.0).contains(&tire.wear));
                if tire.age == 0 && before[id.0] > 0 {
                    pitted = true;
                }
            }
        }
        assert!(pitted, "a 50 lap race at Bahrain should see at least one stop");
    }

    #[test]
    fn test_basic_preset_has_no_tire_state() {
        let tables = EntityTables::builtin().unwrap();
        let config = SimConfig::preset(Preset::Basic);
        let track = tables.find_track("Italy").unwrap();
        let engine = RaceEngine::new(&tables, &config, track);
        let mut rng = ChaChaRng::seed_from_u64(2);
        let state = engine.start(&grid_in_table_order(&tables), &mut rng);
        assert!(state.tire(DriverId(0)).is_none());
    }

    #[test]
    fn test_safety_car_raises_pass_rate() {
        let tables = EntityTables::builtin().unwrap();
        let track = tables.find_track("Spain").unwrap();
        let mut calm = SimConfig::preset(Preset::Basic);
        calm.dnf.car_weight = 0.0;
        calm.dnf.driver_weight = 0.0;
        let mut chaotic = calm.clone();
        chaotic.safety_car = Some(SafetyCar { probability: 1.0, multiplier: 2.0 });

        let count_changes = |config: &SimConfig| {
            let engine = RaceEngine::new(&tables, config, track);
            let mut rng = ChaChaRng::seed_from_u64(77);
            let grid = grid_in_table_order(&tables);
            let mut moved = 0usize;
            for _ in 0..200 {
                let result = engine.run(&grid, &mut rng);
                moved += result
                    .order
                    .iter()
                    .enumerate()
                    .filter(|(pos, id)| id.0 != *pos)
                    .count();
            }
            moved
        };

        assert!(count_changes(&chaotic) > count_changes(&calm));
    }
}
