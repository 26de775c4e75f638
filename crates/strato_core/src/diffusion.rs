//! Second-order explicit diffusion.
//!
//! Adds `nu * laplacian(a)` to the tendency of every prognostic variable,
//! discretized with central differences on a grid that is uniform in the
//! horizontal and stretched in the vertical:
//!
//! ```text
//! at += nu * ( (a[i+1] - 2a[i] + a[i-1]) / dx^2
//!            + (a[j+1] - 2a[j] + a[j-1]) / dy^2
//!            + ((a[k+1] - a[k]) / dzh[k+1] - (a[k] - a[k-1]) / dzh[k]) / dz[k] )
//! ```
//!
//! The vertical velocity lives on half levels, so its vertical term swaps the
//! roles of `dz` and `dzh` and skips the lowest interior level, which
//! coincides with the bottom boundary.
//!
//! The operator only ever accumulates into tendencies. Value and tendency
//! must be distinct buffers, which `Field3d` guarantees by construction.

use crate::error::{Axis, DiffusionError};
use crate::fields::Fields;
use crate::grid::Grid;
use crate::settings::DiffusionSettings;
use crate::solvers::RkScheme;
use crate::traits::StabilityLimit;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionKind {
    Disabled,
    #[default]
    SecondOrder,
}

#[derive(Debug, Clone)]
pub struct Diffusion {
    kind: DiffusionKind,
    visc: f64,
    viscs: f64,
    dnmax: Option<f64>,
    dnmul: f64,
}

impl Diffusion {
    pub fn new(settings: &DiffusionSettings) -> Result<Self, DiffusionError> {
        let visc = settings.visc;
        let viscs = settings.viscs.unwrap_or(visc);
        for (name, value) in [("momentum", visc), ("scalar", viscs)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DiffusionError::InvalidViscosity { name, value });
            }
        }

        Ok(Self {
            kind: settings.swdiff,
            visc,
            viscs,
            dnmax: settings.dnmax,
            dnmul: 0.0,
        })
    }

    /// Computes the diffusion number coefficient for `grid`.
    ///
    /// Must be called again whenever the grid or the viscosities change.
    pub fn init(&mut self, grid: &Grid) -> Result<(), DiffusionError> {
        if self.kind == DiffusionKind::Disabled {
            self.dnmul = 0.0;
            return Ok(());
        }

        validate_grid(grid)?;

        let viscmax = self.visc.max(self.viscs);
        let dxidxi = 1.0 / (grid.dx * grid.dx);
        let dyidyi = 1.0 / (grid.dy * grid.dy);

        self.dnmul = (grid.kstart..grid.kend)
            .map(|k| (viscmax * (dxidxi + dyidyi + 1.0 / (grid.dz[k] * grid.dz[k]))).abs())
            .fold(0.0, f64::max);

        log::info!(
            "diffusion {}: visc = {}, viscs = {}, dnmul = {:e}",
            self.name(),
            self.visc,
            self.viscs,
            self.dnmul
        );
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            DiffusionKind::Disabled => "disabled",
            DiffusionKind::SecondOrder => "2",
        }
    }

    pub fn kind(&self) -> DiffusionKind {
        self.kind
    }

    pub fn visc(&self) -> f64 {
        self.visc
    }

    pub fn viscs(&self) -> f64 {
        self.viscs
    }

    /// Diffusion number per unit time.
    pub fn dnmul(&self) -> f64 {
        self.dnmul
    }

    /// Magnitude of the largest central stencil coefficient, `2 * dnmul`.
    pub fn center_coefficient(&self) -> f64 {
        2.0 * self.dnmul
    }

    pub fn stability_number(&self, dt: f64) -> f64 {
        match self.kind {
            DiffusionKind::Disabled => 0.0,
            DiffusionKind::SecondOrder => self.dnmul * dt,
        }
    }

    /// Diffuses a collocated variable into its tendency.
    pub fn apply(
        &self,
        grid: &Grid,
        tend: &mut [f64],
        value: &[f64],
        visc: f64,
    ) -> Result<(), DiffusionError> {
        if self.kind == DiffusionKind::Disabled {
            return Ok(());
        }
        check_buffers(grid, tend, value)?;
        diff_c(grid, tend, value, visc);
        Ok(())
    }

    /// Diffuses the vertically staggered velocity into its tendency.
    pub fn apply_vertical(
        &self,
        grid: &Grid,
        tend: &mut [f64],
        value: &[f64],
        visc: f64,
    ) -> Result<(), DiffusionError> {
        if self.kind == DiffusionKind::Disabled {
            return Ok(());
        }
        check_buffers(grid, tend, value)?;
        diff_w(grid, tend, value, visc);
        Ok(())
    }

    /// Adds diffusion of all prognostic variables to their tendencies.
    pub fn exec(&self, grid: &Grid, fields: &mut Fields) -> Result<(), DiffusionError> {
        if self.kind == DiffusionKind::Disabled {
            return Ok(());
        }

        self.apply(grid, &mut fields.u.tend, &fields.u.data, self.visc)?;
        self.apply(grid, &mut fields.v.tend, &fields.v.data, self.visc)?;
        self.apply_vertical(grid, &mut fields.w.tend, &fields.w.data, self.visc)?;
        for s in &mut fields.scalars {
            self.apply(grid, &mut s.tend, &s.data, self.viscs)?;
        }
        Ok(())
    }
}

impl StabilityLimit for Diffusion {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn stability_number(&self, dt: f64) -> f64 {
        Diffusion::stability_number(self, dt)
    }

    fn max_stability_number(&self, scheme: RkScheme) -> f64 {
        self.dnmax.unwrap_or_else(|| scheme.max_diffusion_number())
    }
}

fn validate_grid(grid: &Grid) -> Result<(), DiffusionError> {
    let valid = |h: f64| h.is_finite() && h > 0.0;

    if !valid(grid.dx) {
        return Err(DiffusionError::InvalidSpacing {
            axis: Axis::X,
            level: None,
            value: grid.dx,
        });
    }
    if !valid(grid.dy) {
        return Err(DiffusionError::InvalidSpacing {
            axis: Axis::Y,
            level: None,
            value: grid.dy,
        });
    }
    if grid.gc == 0 {
        return Err(DiffusionError::InsufficientHalo);
    }
    for k in grid.kstart..grid.kend {
        if !valid(grid.dz[k]) {
            return Err(DiffusionError::InvalidSpacing {
                axis: Axis::Z,
                level: Some(k),
                value: grid.dz[k],
            });
        }
    }
    for k in grid.kstart..=grid.kend {
        if !valid(grid.dzh[k]) {
            return Err(DiffusionError::InvalidSpacing {
                axis: Axis::Z,
                level: Some(k),
                value: grid.dzh[k],
            });
        }
    }
    Ok(())
}

/// The stencils read one cell beyond the interior on every side.
fn check_buffers(grid: &Grid, tend: &[f64], value: &[f64]) -> Result<(), DiffusionError> {
    if grid.gc == 0 {
        return Err(DiffusionError::InsufficientHalo);
    }
    check_shape(grid, "tendency", tend.len())?;
    check_shape(grid, "value", value.len())
}

fn check_shape(grid: &Grid, name: &str, found: usize) -> Result<(), DiffusionError> {
    if found != grid.ncells {
        return Err(DiffusionError::ShapeMismatch {
            name: name.to_string(),
            expected: grid.ncells,
            found,
        });
    }
    Ok(())
}

fn diff_c(grid: &Grid, at: &mut [f64], a: &[f64], visc: f64) {
    let ii = 1;
    let jj = grid.icells;
    let kk = grid.ijcells;

    let dxidxi = 1.0 / (grid.dx * grid.dx);
    let dyidyi = 1.0 / (grid.dy * grid.dy);

    for k in grid.kstart..grid.kend {
        let dzi = grid.dzi[k];
        let dzhi_bot = grid.dzhi[k];
        let dzhi_top = grid.dzhi[k + 1];
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);
                at[ijk] += visc
                    * (((a[ijk + ii] - a[ijk]) - (a[ijk] - a[ijk - ii])) * dxidxi
                        + ((a[ijk + jj] - a[ijk]) - (a[ijk] - a[ijk - jj])) * dyidyi
                        + ((a[ijk + kk] - a[ijk]) * dzhi_top - (a[ijk] - a[ijk - kk]) * dzhi_bot)
                            * dzi);
            }
        }
    }
}

fn diff_w(grid: &Grid, wt: &mut [f64], w: &[f64], visc: f64) {
    let ii = 1;
    let jj = grid.icells;
    let kk = grid.ijcells;

    let dxidxi = 1.0 / (grid.dx * grid.dx);
    let dyidyi = 1.0 / (grid.dy * grid.dy);

    for k in grid.kstart + 1..grid.kend {
        let dzhi = grid.dzhi[k];
        let dzi_bot = grid.dzi[k - 1];
        let dzi_top = grid.dzi[k];
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);
                wt[ijk] += visc
                    * (((w[ijk + ii] - w[ijk]) - (w[ijk] - w[ijk - ii])) * dxidxi
                        + ((w[ijk + jj] - w[ijk]) - (w[ijk] - w[ijk - jj])) * dyidyi
                        + ((w[ijk + kk] - w[ijk]) * dzi_top - (w[ijk] - w[ijk - kk]) * dzi_bot)
                            * dzhi);
            }
        }
    }
}
