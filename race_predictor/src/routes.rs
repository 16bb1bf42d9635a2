use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use race_engine::{sampling::fresh_seed, summarize, validate_trial_count, AggregateResult, RunHistory, SimError, Simulator};
use serde_json::{json, Value};

use crate::types::{DriverStats, Download, HistoryLine, SimulationRequest, SimulationResponse, TrackInfo};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub sim: Arc<Simulator>,
    pub history: Arc<Mutex<RunHistory>>,
    pub default_track: Arc<str>,
    pub default_simulations: i64,
    /// Fixed so a recorded seed replays to the same result.
    pub workers: usize,
}

impl AppState {
    pub fn new(sim: Simulator, default_track: &str, default_simulations: i64, workers: usize) -> Self {
        Self {
            sim: Arc::new(sim),
            history: Arc::new(Mutex::new(RunHistory::new())),
            default_track: Arc::from(default_track),
            default_simulations,
            workers: workers.max(1),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tracks", get(tracks))
        .route("/drivers", get(drivers))
        .route("/run_simulation", post(run_simulation))
        .route("/driver_stats/:name", get(driver_stats))
        .route("/track_info/:name", get(track_info))
        .route("/download_results", post(download_results))
        .route("/history", get(history))
        .with_state(state)
}

// ---------- Error mapping ----------

fn status_for(err: &SimError) -> StatusCode {
    match err {
        SimError::UnknownTrack(_) | SimError::UnknownDriver { .. } | SimError::NotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        SimError::InvalidTrialCount(_) | SimError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn reject(err: SimError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(json!({ "success": false, "error": err.to_string() })))
}

fn internal(msg: String) -> ApiError {
    tracing::error!("{}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false, "error": msg })))
}

// ---------- Handlers ----------

pub async fn tracks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "tracks": state.sim.tables().track_names() }))
}

pub async fn drivers(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "drivers": state.sim.tables().driver_names() }))
}

/// Runs the batch off the async workers; the engine is CPU bound.
async fn simulate(state: &AppState, req: SimulationRequest) -> Result<AggregateResult, ApiError> {
    let track = req.track.unwrap_or_else(|| state.default_track.to_string());
    let trials = validate_trial_count(req.simulations.unwrap_or(state.default_simulations)).map_err(reject)?;
    let seed = req.seed.unwrap_or_else(fresh_seed);
    let sim = state.sim.clone();
    let workers = state.workers;

    tracing::info!(track = %track, trials, seed, "simulation requested");
    tokio::task::spawn_blocking(move || sim.run_simulation_parallel(&track, trials, seed, workers))
        .await
        .map_err(|e| internal(format!("simulation task failed: {}", e)))?
        .map_err(reject)
}

pub async fn run_simulation(
    State(state): State<AppState>,
    Json(req): Json<SimulationRequest>,
) -> ApiResult<SimulationResponse> {
    let result = simulate(&state, req).await?;
    let report = summarize(&result, state.sim.tables());
    state.history.lock().record(result.clone());
    Ok(Json(SimulationResponse::new(result, report)))
}

pub async fn driver_stats(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<DriverStats> {
    let driver = state.sim.get_driver_profile(&name).map_err(reject)?;
    let car = state.sim.tables().get_car(&driver.team).map_err(reject)?;
    Ok(Json(DriverStats { success: true, driver: driver.clone(), car: car.clone() }))
}

pub async fn track_info(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<TrackInfo> {
    let track = state.sim.get_track_profile(&name).map_err(reject)?;
    Ok(Json(TrackInfo { success: true, track: track.clone() }))
}

pub async fn download_results(
    State(state): State<AppState>,
    Json(req): Json<SimulationRequest>,
) -> ApiResult<Download> {
    let result = simulate(&state, req).await?;
    let data = result.to_json().map_err(reject)?;
    Ok(Json(Download { success: true, filename: Download::filename_for(&result.track), data }))
}

pub async fn history(State(state): State<AppState>) -> Json<Vec<HistoryLine>> {
    let history = state.history.lock();
    Json(history.iter().map(HistoryLine::from).collect())
}
