use crate::solvers::RkScheme;

/// Represents a system of ordinary differential equations.
pub trait DynamicalSystem {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// x: current state
    /// t: current time
    /// out: buffer to write dx/dt into
    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]);
}

/// A trait for solvers that can step a system forward.
pub trait Steppable {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem, t: &mut f64, state: &mut [f64], dt: f64);
}

/// Storage of the prognostic variables advanced by the time loop.
///
/// Every visited pair is `(value, tendency)`. The two slices of a pair are
/// always distinct allocations, so the stage update can read the tendency
/// while it writes the value.
pub trait PrognosticState {
    fn visit_prognostic(&mut self, visit: &mut dyn FnMut(&mut [f64], &mut [f64]));
}

/// A physics term that bounds the explicit time step.
pub trait StabilityLimit {
    fn name(&self) -> &str;

    /// Local (per subdomain) stability number for a step of size `dt`.
    /// Must be linear in `dt`.
    fn stability_number(&self, dt: f64) -> f64;

    /// Largest stability number the given scheme tolerates.
    fn max_stability_number(&self, scheme: RkScheme) -> f64;
}

/// Collective reduction over the process group sharing one time step.
pub trait Reduction {
    /// Global maximum of `local` over all processes. Blocking.
    fn max(&self, local: f64) -> f64;
}

/// Reduction for a single-process run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialReduction;

impl Reduction for SerialReduction {
    fn max(&self, local: f64) -> f64 {
        local
    }
}
