use thiserror::Error;

/// Failures reported by the engine to whatever is hosting it.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown track: {0}")]
    UnknownTrack(String),

    /// A driver's team has no matching car entry. Corrupt static data, fatal at load.
    #[error("driver {driver} references unknown team {team}")]
    UnknownDriver { driver: String, team: String },

    #[error("duplicate driver in entity tables: {0}")]
    DuplicateDriver(String),

    #[error("duplicate car for team {0} in entity tables")]
    DuplicateCar(String),

    #[error("duplicate track in entity tables: {0}")]
    DuplicateTrack(String),

    #[error("invalid trial count {0}: at least one trial is required")]
    InvalidTrialCount(i64),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid {entity} parameter {field}: {value}")]
    InvalidParameter {
        entity: String,
        field: &'static str,
        value: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Turns a caller-supplied signed count into a usable trial count.
pub fn validate_trial_count(requested: i64) -> Result<usize> {
    if requested < 1 {
        return Err(SimError::InvalidTrialCount(requested));
    }
    usize::try_from(requested).map_err(|_| SimError::InvalidTrialCount(requested))
}
