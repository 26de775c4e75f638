//! Error types of the time-advancement core.

use std::fmt;
use thiserror::Error;

/// Grid axis, used to locate invalid spacings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiffusionError {
    #[error("invalid grid spacing along {axis}{}: {value}", at_level(.level))]
    InvalidSpacing {
        axis: Axis,
        level: Option<usize>,
        value: f64,
    },
    #[error("diffusion needs at least one halo cell")]
    InsufficientHalo,
    #[error("{name} viscosity must be finite and non-negative, got {value}")]
    InvalidViscosity { name: &'static str, value: f64 },
    #[error("buffer {name} has {found} cells, grid has {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

fn at_level(level: &Option<usize>) -> String {
    level.map(|k| format!(" at level {k}")).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum TimeloopError {
    #[error("unsupported Runge-Kutta order {0}, expected 3 or 4")]
    UnsupportedRkOrder(u32),
    #[error("invalid time setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error(
        "fixed time step dt = {dt} violates the {limit} limit: \
         stability number {number} exceeds {threshold}"
    )]
    FixedTimeStepUnstable {
        limit: String,
        dt: f64,
        number: f64,
        threshold: f64,
    },
    #[error("time step collapsed to {idt} ticks, below the minimum of {idtmin} ticks")]
    TimeStepCollapsed { idt: u64, idtmin: u64 },
    #[error("time {0} cannot be represented with the configured precision")]
    UnrepresentableTime(f64),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed time checkpoint: {0}")]
    Format(#[from] serde_json::Error),
    #[error("checkpoint was written by scheme {found}, the run is configured for {expected}")]
    SchemeMismatch { expected: String, found: String },
    #[error("checkpoint time {time} does not match integer time {itime} at this precision")]
    InconsistentTime { time: f64, itime: u64 },
    #[error("cannot save a checkpoint inside a substep")]
    InSubstep,
}
