use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;

use crate::error::{Result, SimError};

/// Weights for every effect the engine can apply.
///
/// An optional block set to `Some` switches its effect on. Every field has a
/// default (the realistic preset), so a JSON override only needs the values it
/// changes; write `null` to switch an optional effect off.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub laps: u32,
    /// Number of raw finishing orders kept on each result.
    pub sample_size: usize,
    pub qualifying: QualifyingWeights,
    pub dnf: DnfWeights,
    pub overtake: OvertakeWeights,
    pub tires: Option<TireModel>,
    pub safety_car: Option<SafetyCar>,
    pub news: Option<NewsWeights>,
    pub recent_form: Option<RecentFormWeights>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct QualifyingWeights {
    /// Seconds per point of qualifying pace below 100.
    pub skill_weight: f64,
    /// Seconds per point of car performance below 100.
    pub car_weight: f64,
    /// Noise std-dev at consistency 0; scales with (1 - consistency).
    pub consistency_noise: f64,
    /// Seconds per year of experience, street circuits only.
    pub street_experience_bonus: f64,
    pub form_weight: f64,
    pub recent_weight: f64,
    pub recent_baseline: f64,
    pub upgrade_weight: f64,
    /// Std-dev of an extra per-driver noise term independent of consistency.
    pub session_noise: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DnfWeights {
    pub car_weight: f64,
    pub driver_weight: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OvertakeWeights {
    pub base: f64,
    pub pace_weight: f64,
    pub craft_weight: f64,
    /// Add the aero efficiency gap to the pace term.
    pub include_aero: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TireModel {
    pub wear_threshold: f64,
    pub pit_probability: f64,
    /// Weight of the wear differential inside the pace term.
    pub wear_weight: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SafetyCar {
    /// Chance per lap.
    pub probability: f64,
    pub multiplier: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NewsWeights {
    pub qualifying_weight: f64,
    pub overtake_weight: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RecentFormWeights {
    pub overtake_weight: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::preset(Preset::Realistic)
    }
}

impl Default for QualifyingWeights {
    fn default() -> Self {
        Self {
            skill_weight: 0.03,
            car_weight: 0.02,
            consistency_noise: 2.0,
            street_experience_bonus: 0.05,
            form_weight: 1.0,
            recent_weight: 0.1,
            recent_baseline: 10.0,
            upgrade_weight: 1.0,
            session_noise: 0.0,
        }
    }
}

impl Default for DnfWeights {
    fn default() -> Self {
        Self { car_weight: 0.001, driver_weight: 0.0005 }
    }
}

impl Default for OvertakeWeights {
    fn default() -> Self {
        Self { base: 0.02, pace_weight: 0.1, craft_weight: 0.05, include_aero: false }
    }
}

impl Default for TireModel {
    fn default() -> Self {
        Self { wear_threshold: 0.8, pit_probability: 0.3, wear_weight: 0.5 }
    }
}

impl Default for SafetyCar {
    fn default() -> Self {
        Self { probability: 0.05, multiplier: 2.0 }
    }
}

impl Default for NewsWeights {
    fn default() -> Self {
        Self { qualifying_weight: 2.0, overtake_weight: 0.5 }
    }
}

impl Default for RecentFormWeights {
    fn default() -> Self {
        Self { overtake_weight: 0.002 }
    }
}

/// The three model variants, expressed as configurations of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Basic,
    Realistic,
    Season2025,
}

impl FromStr for Preset {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Preset::Basic),
            "realistic" => Ok(Preset::Realistic),
            "season2025" | "season_2025" | "2025" => Ok(Preset::Season2025),
            other => Err(SimError::InvalidParameter {
                entity: "config".to_string(),
                field: "preset",
                value: other.to_string(),
            }),
        }
    }
}

impl SimConfig {
    pub fn preset(preset: Preset) -> Self {
        let base = Self {
            laps: 50,
            sample_size: 100,
            qualifying: QualifyingWeights::default(),
            dnf: DnfWeights::default(),
            overtake: OvertakeWeights::default(),
            tires: None,
            safety_car: None,
            news: None,
            recent_form: None,
        };

        match preset {
            Preset::Basic => base,
            Preset::Realistic => Self {
                overtake: OvertakeWeights { include_aero: true, ..OvertakeWeights::default() },
                tires: Some(TireModel::default()),
                safety_car: Some(SafetyCar::default()),
                ..base
            },
            Preset::Season2025 => Self {
                qualifying: QualifyingWeights {
                    consistency_noise: 3.0,
                    session_noise: 2.0,
                    ..QualifyingWeights::default()
                },
                // car reliability alone drives retirements in this season model
                dnf: DnfWeights { driver_weight: 0.0, ..DnfWeights::default() },
                news: Some(NewsWeights::default()),
                recent_form: Some(RecentFormWeights::default()),
                ..base
            },
        }
    }

    /// Reads a config file; fields missing from it keep their defaults.
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}
