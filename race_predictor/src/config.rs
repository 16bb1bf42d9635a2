use anyhow::{Context, Result};
use race_engine::{EntityTables, Preset, SimConfig, Simulator};
use std::path::PathBuf;

const GRID_FILE: &str = "grid_2025.json";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub grid_path: Option<PathBuf>,
    pub preset: Preset,
    /// Optional JSON overrides applied instead of the preset.
    pub sim_config_path: Option<String>,
    pub default_track: String,
    pub default_simulations: i64,
    pub workers: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let port: u16 = std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8080);
        let preset = match std::env::var("SIM_PRESET") {
            Ok(name) => name.parse().with_context(|| format!("bad SIM_PRESET {}", name))?,
            Err(_) => Preset::Realistic,
        };
        let default_simulations = std::env::var("DEFAULT_SIMULATIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);
        let workers = std::env::var("SIM_WORKERS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        Ok(Self {
            port,
            grid_path: resolve_grid_path(),
            preset,
            sim_config_path: std::env::var("SIM_CONFIG").ok(),
            default_track: std::env::var("DEFAULT_TRACK").unwrap_or_else(|_| "Bahrain".to_string()),
            default_simulations,
            workers,
        })
    }

    /// Builds the simulator. Bad tables are fatal here, before any request is served.
    pub fn load_simulator(&self) -> Result<Simulator> {
        let tables = match &self.grid_path {
            Some(path) => EntityTables::load(path)
                .with_context(|| format!("failed to load entity tables from {}", path.display()))?,
            None => {
                tracing::warn!("no grid file found on disk; using the bundled {} grid", GRID_FILE);
                EntityTables::builtin().context("bundled grid is invalid")?
            }
        };

        let config = match &self.sim_config_path {
            Some(path) => SimConfig::load(path).with_context(|| format!("failed to load sim config {}", path))?,
            None => SimConfig::preset(self.preset),
        };

        tracing::info!(
            season = tables.season(),
            drivers = tables.driver_count(),
            tracks = tables.tracks().len(),
            laps = config.laps,
            "simulator ready"
        );
        Ok(Simulator::new(tables, config))
    }
}

/// Finds the grid file: `GRID_PATH` first, then the usual run locations.
fn resolve_grid_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("GRID_PATH") {
        return Some(PathBuf::from(p));
    }

    let candidates = [
        PathBuf::from("data").join(GRID_FILE),
        PathBuf::from("race_engine/data").join(GRID_FILE),
        PathBuf::from("../race_engine/data").join(GRID_FILE),
        {
            let mut p = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
            p.pop(); // exe dir
            p.push("data");
            p.push(GRID_FILE);
            p
        },
    ];

    candidates.into_iter().find(|c| c.exists())
}
