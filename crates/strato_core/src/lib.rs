//! The `strato_core` crate provides the explicit time-advancement core of the Strato flow solver.
//! It advances prognostic fields on a structured grid with low-storage Runge-Kutta schemes and
//! keeps simulation time in integer ticks, so output instants never drift.
//!
//! Key components:
//! - **Traits**: `PrognosticState` (fields the loop advances), `StabilityLimit` (physics that
//!   bound the step), `Reduction` (global maximum over processes).
//! - **Solvers**: 2N-storage RK3 and RK4 coefficient tables and the stage update.
//! - **Diffusion**: second-order diffusion operator and its diffusion-number limit.
//! - **Timeloop**: adaptive step selection, substep cycling, output predicates and restarts.
pub mod checkpoint;
pub mod diffusion;
pub mod error;
pub mod fields;
pub mod grid;
pub mod settings;
pub mod solvers;
pub mod timeloop;
pub mod traits;
