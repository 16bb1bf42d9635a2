use serde::{Deserialize, Serialize};

/// Upper bound on the recent-results history carried per driver.
pub const RECENT_RESULTS_LEN: usize = 10;

/// Dense index of a driver inside [`crate::EntityTables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub name: String,
    pub team: String,
    // Ratings on a 0-100 scale unless noted
    pub raw_pace: f64,
    pub consistency: f64, // 0-1
    pub qualifying_pace: f64,
    pub race_pace: f64,
    pub tire_management: f64,
    pub race_craft: f64,
    pub mental_strength: f64,
    pub physical_fitness: f64,
    pub experience: u32,
    pub current_form: f64, // multiplier, ~0.5-1.5
    pub recent_results: Vec<u32>,
    pub championship_position: u32,
    pub championship_points: u32,
}

impl Driver {
    /// Mean of the recent finishing positions, or `baseline` if there is no history.
    pub fn recent_average(&self, baseline: f64) -> f64 {
        if self.recent_results.is_empty() {
            return baseline;
        }
        let sum: u32 = self.recent_results.iter().sum();
        sum as f64 / self.recent_results.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Car {
    pub team: String,
    pub aero_efficiency: f64,
    pub engine_power: f64,
    pub reliability: f64, // 0-1, chance of surviving one failure check
    pub tire_degradation: f64,
    pub fuel_efficiency: f64,
    pub straight_line_speed: f64,
    pub cornering_speed: f64,
    pub upgrade_factor: f64, // ~0.9-1.1, 1.0 = neutral
    #[serde(default = "neutral_factor")]
    pub car_news_factor: f64,
    #[serde(default = "neutral_factor")]
    pub engine_news_factor: f64,
}

fn neutral_factor() -> f64 {
    1.0
}

impl Car {
    pub fn performance(&self) -> f64 {
        (self.aero_efficiency + self.engine_power) / 2.0
    }

    /// Combined news multiplier; 2.0 is neutral.
    pub fn news_total(&self) -> f64 {
        self.car_news_factor + self.engine_news_factor
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CircuitType {
    Permanent,
    Street,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub name: String,
    pub base_qualifying_time: f64, // seconds
    pub overtaking_difficulty: f64, // 0-1, higher = harder to pass
    pub tire_wear_rate: f64,
    pub fuel_consumption: f64,
    pub weather_sensitivity: f64,
    pub technical_demand: f64,
    pub circuit_type: CircuitType,
    #[serde(default)]
    pub season_round: u32,
}

impl Track {
    pub fn is_street(&self) -> bool {
        self.circuit_type == CircuitType::Street
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TireCompound {
    Soft,
    Medium,
    Hard,
}

impl TireCompound {
    pub const DRY: [TireCompound; 3] = [TireCompound::Soft, TireCompound::Medium, TireCompound::Hard];
}

/// Per-driver tire state. Lives only for the duration of one race.
#[derive(Debug, Clone, PartialEq)]
pub struct TireStrategy {
    pub compound: TireCompound,
    pub age: u32,  // laps since fitted
    pub wear: f64, // 0-1, clamped
}

impl TireStrategy {
    pub fn fitted(compound: TireCompound) -> Self {
        Self { compound, age: 0, wear: 0.0 }
    }

    pub fn add_wear(&mut self, amount: f64) {
        self.age += 1;
        self.wear = (self.wear + amount).clamp(0.0, 1.0);
    }
}

/// One trial's finishing order. Index 0 is the winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialResult {
    pub order: Vec<DriverId>,
}
