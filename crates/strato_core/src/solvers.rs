use crate::error::TimeloopError;
use crate::traits::{DynamicalSystem, Steppable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficients of a 2N-storage Runge-Kutta scheme.
///
/// Stage `n` updates the accumulated tendency `q` and the state `y` as
/// ```text
/// q = A[n] * q + f(t + c[n] dt, y)
/// y = y + B[n] dt q
/// ```
/// Only `y` and `q` are stored, whatever the number of stages.
struct LowStorageTable {
    a: &'static [f64],
    b: &'static [f64],
    c: &'static [f64],
}

/// Williamson (1980), three stages, third order.
const RK3_TABLE: LowStorageTable = LowStorageTable {
    a: &[0.0, -5.0 / 9.0, -153.0 / 128.0],
    b: &[1.0 / 3.0, 15.0 / 16.0, 8.0 / 15.0],
    c: &[0.0, 1.0 / 3.0, 3.0 / 4.0],
};

/// Carpenter and Kennedy (1994), five stages, fourth order.
const RK4_TABLE: LowStorageTable = LowStorageTable {
    a: &[
        0.0,
        -567301805773.0 / 1357537059087.0,
        -2404267990393.0 / 2016746695238.0,
        -3550918686646.0 / 2091501179385.0,
        -1275806237668.0 / 842570457699.0,
    ],
    b: &[
        1432997174477.0 / 9575080441755.0,
        5161836677717.0 / 13612068292357.0,
        1720146321549.0 / 2090206949498.0,
        3134564353537.0 / 4481467310338.0,
        2277821191437.0 / 14882151754819.0,
    ],
    c: &[
        0.0,
        1432997174477.0 / 9575080441755.0,
        2526269341429.0 / 6820363962896.0,
        2006345519317.0 / 3224310063776.0,
        2802321613138.0 / 2924317926251.0,
    ],
};

/// The explicit scheme of a run. Chosen once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RkScheme {
    Rk3,
    Rk4,
}

impl RkScheme {
    pub fn from_order(order: u32) -> Result<Self, TimeloopError> {
        match order {
            3 => Ok(RkScheme::Rk3),
            4 => Ok(RkScheme::Rk4),
            other => Err(TimeloopError::UnsupportedRkOrder(other)),
        }
    }

    fn table(self) -> &'static LowStorageTable {
        match self {
            RkScheme::Rk3 => &RK3_TABLE,
            RkScheme::Rk4 => &RK4_TABLE,
        }
    }

    pub fn order(self) -> u32 {
        match self {
            RkScheme::Rk3 => 3,
            RkScheme::Rk4 => 4,
        }
    }

    pub fn stages(self) -> usize {
        self.table().b.len()
    }

    pub fn name(self) -> &'static str {
        match self {
            RkScheme::Rk3 => "rk3",
            RkScheme::Rk4 => "rk4",
        }
    }

    /// Effective step of stage `substep`: the factor multiplying the
    /// accumulated tendency in the state update.
    pub fn sub_dt(self, substep: usize, dt: f64) -> f64 {
        self.table().b[substep] * dt
    }

    /// Start of stage `substep` as a fraction of the full step.
    pub fn stage_time(self, substep: usize) -> f64 {
        self.table().c[substep]
    }

    /// Fraction of the full step elapsed during stage `substep`.
    pub fn stage_time_fraction(self, substep: usize) -> f64 {
        let c = self.table().c;
        let next = c.get(substep + 1).copied().unwrap_or(1.0);
        next - c[substep]
    }

    /// Largest diffusion number `nu dt (1/dx^2 + 1/dy^2 + 1/dz^2)` the scheme
    /// keeps stable with second-order central diffusion.
    pub fn max_diffusion_number(self) -> f64 {
        match self {
            RkScheme::Rk3 => 0.4,
            RkScheme::Rk4 => 0.6,
        }
    }

    /// Largest advective CFL number the scheme keeps stable.
    pub fn max_cfl(self) -> f64 {
        match self {
            RkScheme::Rk3 => 1.2,
            RkScheme::Rk4 => 1.6,
        }
    }
}

impl fmt::Display for RkScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies stage `substep` to one prognostic variable.
///
/// `value += B[substep] dt tend`, after which `tend` is scaled by the `A`
/// coefficient of the next stage. The last stage wraps to `A[0] = 0`, which
/// leaves the tendency zeroed for the next step.
pub fn stage_update(
    scheme: RkScheme,
    substep: usize,
    dt: f64,
    value: &mut [f64],
    tend: &mut [f64],
) {
    let table = scheme.table();
    let substepn = (substep + 1) % scheme.stages();
    let b_dt = table.b[substep] * dt;
    let a_next = table.a[substepn];

    for (v, t) in value.iter_mut().zip(tend.iter_mut()) {
        *v += b_dt * *t;
        *t *= a_next;
    }
}

/// Low-storage Runge-Kutta stepper for ordinary differential equations.
pub struct LowStorageRk {
    scheme: RkScheme,
    q: Vec<f64>,
    rhs: Vec<f64>,
}

impl LowStorageRk {
    pub fn new(scheme: RkScheme, dim: usize) -> Self {
        Self {
            scheme,
            q: vec![0.0; dim],
            rhs: vec![0.0; dim],
        }
    }

    pub fn scheme(&self) -> RkScheme {
        self.scheme
    }
}

impl Steppable for LowStorageRk {
    fn step(&mut self, system: &impl DynamicalSystem, t: &mut f64, state: &mut [f64], dt: f64) {
        let t0 = *t;
        self.q.iter_mut().for_each(|q| *q = 0.0);

        for substep in 0..self.scheme.stages() {
            let ts = t0 + self.scheme.stage_time(substep) * dt;
            system.apply(ts, state, &mut self.rhs);
            for (q, r) in self.q.iter_mut().zip(&self.rhs) {
                *q += *r;
            }
            stage_update(self.scheme, substep, dt, state, &mut self.q);
        }

        *t = t0 + dt;
    }
}
