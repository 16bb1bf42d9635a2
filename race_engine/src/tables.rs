//! Static driver, car and track tables.
//!
//! Loaded once from JSON and validated up front; the engine never checks
//! cross references again while trials are running.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::{Car, Driver, DriverId, Track, RECENT_RESULTS_LEN};

/// Bundled 2025 grid, used when no external table is supplied.
const BUILTIN_GRID: &str = include_str!("../data/grid_2025.json");

#[derive(Debug, Deserialize, Serialize)]
struct TableFile {
    #[serde(default)]
    season: u32,
    drivers: Vec<Driver>,
    cars: Vec<Car>,
    tracks: Vec<Track>,
}

#[derive(Debug, Clone)]
pub struct EntityTables {
    season: u32,
    drivers: Vec<Driver>,
    cars: Vec<Car>,
    tracks: Vec<Track>,
    driver_index: HashMap<String, DriverId>,
    // car slot for each driver, parallel to `drivers`
    driver_car: Vec<usize>,
}

impl EntityTables {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(data)?;
        Self::new(file.season, file.drivers, file.cars, file.tracks)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_GRID)
    }

    pub fn new(season: u32, drivers: Vec<Driver>, cars: Vec<Car>, tracks: Vec<Track>) -> Result<Self> {
        let mut tables = Self {
            season,
            drivers,
            cars,
            tracks,
            driver_index: HashMap::new(),
            driver_car: Vec::new(),
        };
        tables.validate()?;
        tracing::debug!(
            season,
            drivers = tables.drivers.len(),
            cars = tables.cars.len(),
            tracks = tables.tracks.len(),
            "entity tables loaded"
        );
        Ok(tables)
    }

    /// Checks ranges and cross references, then builds the lookup indices.
    fn validate(&mut self) -> Result<()> {
        if self.drivers.is_empty() {
            return Err(invalid("drivers", "len", 0));
        }

        let mut car_slots: HashMap<&str, usize> = HashMap::with_capacity(self.cars.len());
        for (i, car) in self.cars.iter().enumerate() {
            if car_slots.insert(car.team.as_str(), i).is_some() {
                return Err(SimError::DuplicateCar(car.team.clone()));
            }
            check_probability(&car.team, "reliability", car.reliability)?;
            check_rating(&car.team, "aero_efficiency", car.aero_efficiency)?;
            check_rating(&car.team, "engine_power", car.engine_power)?;
            check_rating(&car.team, "fuel_efficiency", car.fuel_efficiency)?;
            check_rating(&car.team, "straight_line_speed", car.straight_line_speed)?;
            check_rating(&car.team, "cornering_speed", car.cornering_speed)?;
        }

        let mut track_names = HashSet::with_capacity(self.tracks.len());
        for track in &self.tracks {
            if !track_names.insert(track.name.as_str()) {
                return Err(SimError::DuplicateTrack(track.name.clone()));
            }
            check_probability(&track.name, "overtaking_difficulty", track.overtaking_difficulty)?;
            check_probability(&track.name, "tire_wear_rate", track.tire_wear_rate)?;
        }

        let mut driver_index = HashMap::with_capacity(self.drivers.len());
        let mut driver_car = Vec::with_capacity(self.drivers.len());
        for (i, driver) in self.drivers.iter().enumerate() {
            if driver_index.insert(driver.name.clone(), DriverId(i)).is_some() {
                return Err(SimError::DuplicateDriver(driver.name.clone()));
            }
            let slot = car_slots.get(driver.team.as_str()).ok_or_else(|| SimError::UnknownDriver {
                driver: driver.name.clone(),
                team: driver.team.clone(),
            })?;
            driver_car.push(*slot);

            check_probability(&driver.name, "consistency", driver.consistency)?;
            for (field, value) in [
                ("raw_pace", driver.raw_pace),
                ("qualifying_pace", driver.qualifying_pace),
                ("race_pace", driver.race_pace),
                ("tire_management", driver.tire_management),
                ("race_craft", driver.race_craft),
                ("mental_strength", driver.mental_strength),
                ("physical_fitness", driver.physical_fitness),
            ] {
                check_rating(&driver.name, field, value)?;
            }
            if driver.recent_results.len() > RECENT_RESULTS_LEN {
                return Err(invalid(&driver.name, "recent_results", driver.recent_results.len()));
            }
        }

        self.driver_index = driver_index;
        self.driver_car = driver_car;
        Ok(())
    }

    pub fn season(&self) -> u32 {
        self.season
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn driver_ids(&self) -> impl Iterator<Item = DriverId> {
        (0..self.drivers.len()).map(DriverId)
    }

    pub fn driver(&self, id: DriverId) -> &Driver {
        &self.drivers[id.0]
    }

    pub fn car_for(&self, id: DriverId) -> &Car {
        &self.cars[self.driver_car[id.0]]
    }

    pub fn driver_id(&self, name: &str) -> Option<DriverId> {
        self.driver_index.get(name).copied()
    }

    pub fn driver_names(&self) -> Vec<&str> {
        self.drivers.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn track_names(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn find_track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    pub fn get_driver_profile(&self, name: &str) -> Result<&Driver> {
        self.driver_id(name)
            .map(|id| self.driver(id))
            .ok_or_else(|| SimError::NotFound { kind: "driver", name: name.to_string() })
    }

    pub fn get_track_profile(&self, name: &str) -> Result<&Track> {
        self.find_track(name)
            .ok_or_else(|| SimError::NotFound { kind: "track", name: name.to_string() })
    }

    pub fn get_car(&self, team: &str) -> Result<&Car> {
        self.cars
            .iter()
            .find(|c| c.team == team)
            .ok_or_else(|| SimError::NotFound { kind: "car", name: team.to_string() })
    }
}

fn check_probability(entity: &str, field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(entity, field, value))
    }
}

/// Ratings live on a 0-100 scale; the DNF and wear terms go negative above it.
fn check_rating(entity: &str, field: &'static str, value: f64) -> Result<()> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(entity, field, value))
    }
}

fn invalid(entity: &str, field: &'static str, value: impl ToString) -> SimError {
    SimError::InvalidParameter {
        entity: entity.to_string(),
        field,
        value: value.to_string(),
    }
}
