//! Monte Carlo race outcome prediction.
//!
//! Each trial samples a qualifying grid from driver, car and track ratings,
//! evolves it lap by lap through retirements, tire wear and overtakes, and
//! records the finishing order. Many trials are reduced into per-driver win,
//! podium and points frequencies.
//!
//! ```no_run
//! use race_engine::{summarize, Preset, Simulator};
//!
//! let sim = Simulator::builtin(Preset::Realistic)?;
//! let result = sim.run_simulation("Monaco", 5000)?;
//! println!("{}", summarize(&result, sim.tables()));
//! # Ok::<(), race_engine::SimError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod history;
pub mod qualifying;
pub mod race;
pub mod report;
pub mod sampling;
pub mod simulator;
pub mod tables;
pub mod types;

pub use aggregate::{AggregateResult, Aggregator, Outcome, Tally};
pub use config::{Preset, SimConfig};
pub use error::{validate_trial_count, Result, SimError};
pub use history::{HistoryEntry, RunHistory};
pub use qualifying::{GridSlot, QualifyingSampler};
pub use race::{RaceEngine, RaceState};
pub use report::{summarize, Summary};
pub use simulator::Simulator;
pub use tables::EntityTables;
pub use types::{Car, CircuitType, Driver, DriverId, TireCompound, TireStrategy, Track, TrialResult};
