use std::collections::BTreeMap;

use race_engine::{AggregateResult, Car, Driver, HistoryEntry, Summary, Track};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SimulationRequest {
    pub track: Option<String>,
    // signed so a negative count reaches validation instead of failing to parse
    pub simulations: Option<i64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProbabilityTable {
    pub win_probabilities: BTreeMap<String, f64>,
    pub podium_probabilities: BTreeMap<String, f64>,
    pub points_probabilities: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct SimulationResponse {
    pub success: bool,
    /// Rendered text report.
    pub summary: String,
    pub report: Summary,
    pub results: ProbabilityTable,
    pub seed: Option<u64>,
}

impl SimulationResponse {
    pub fn new(result: AggregateResult, report: Summary) -> Self {
        Self {
            success: true,
            summary: report.to_string(),
            report,
            seed: result.seed,
            results: ProbabilityTable {
                win_probabilities: result.win_probabilities,
                podium_probabilities: result.podium_probabilities,
                points_probabilities: result.points_probabilities,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DriverStats {
    pub success: bool,
    pub driver: Driver,
    pub car: Car,
}

#[derive(Debug, Serialize)]
pub struct TrackInfo {
    pub success: bool,
    pub track: Track,
}

#[derive(Debug, Serialize)]
pub struct Download {
    pub success: bool,
    pub data: String,
    pub filename: String,
}

impl Download {
    pub fn filename_for(track: &str) -> String {
        format!("f1_simulation_{}.json", track.to_lowercase().replace(' ', "_"))
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryLine {
    pub recorded_at_ms: i64,
    pub track: String,
    pub num_simulations: usize,
    pub seed: Option<u64>,
}

impl From<&HistoryEntry> for HistoryLine {
    fn from(e: &HistoryEntry) -> Self {
        Self {
            recorded_at_ms: e.recorded_at_ms,
            track: e.result.track.clone(),
            num_simulations: e.result.num_simulations,
            seed: e.result.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_filename() {
        assert_eq!(Download::filename_for("Great Britain"), "f1_simulation_great_britain.json");
        assert_eq!(Download::filename_for("Monaco"), "f1_simulation_monaco.json");
    }

    #[test]
    fn test_request_fields_optional() {
        let req: SimulationRequest = serde_json::from_str(r#"{"track": "Monaco"}"#).unwrap();
        assert_eq!(req.track.as_deref(), Some("Monaco"));
        assert!(req.simulations.is_none());
        assert!(req.seed.is_none());

        let req: SimulationRequest = serde_json::from_str(r#"{"simulations": -3}"#).unwrap();
        assert_eq!(req.simulations, Some(-3));
    }
}
