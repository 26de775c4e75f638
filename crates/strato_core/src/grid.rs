//! Structured grid geometry as seen by the time-advancement core.
//!
//! The grid is uniform in the horizontal and stretched in the vertical.
//! Vertical arrays are defined on every level including the halo, so that
//! stencils evaluated at the first and last interior level can read one
//! level outside the interior.
//!
//! Two vertical locations exist:
//! - full levels `z[k]`, the cell centres of the collocated variables,
//! - half levels `zh[k]`, the bottom face of cell `k`, where the vertically
//!   staggered velocity lives.
//!
//! `dz[k]` is the distance between half levels `k` and `k+1`; `dzh[k]` the
//! distance between full levels `k-1` and `k`.

/// Read-only grid geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub itot: usize,
    pub jtot: usize,
    pub ktot: usize,
    pub gc: usize,

    pub icells: usize,
    pub jcells: usize,
    pub kcells: usize,
    pub ijcells: usize,
    pub ncells: usize,

    pub istart: usize,
    pub iend: usize,
    pub jstart: usize,
    pub jend: usize,
    pub kstart: usize,
    pub kend: usize,

    pub dx: f64,
    pub dy: f64,
    pub dxi: f64,
    pub dyi: f64,

    pub z: Vec<f64>,
    pub zh: Vec<f64>,
    pub dz: Vec<f64>,
    pub dzi: Vec<f64>,
    pub dzh: Vec<f64>,
    pub dzhi: Vec<f64>,
}

impl Grid {
    /// Builds a grid from the interior vertical spacings `dz_interior`
    /// (bottom to top). Halo spacings mirror the interior ones.
    ///
    /// No validation happens here; consumers check the spacings they rely on.
    pub fn stretched(
        itot: usize,
        jtot: usize,
        dx: f64,
        dy: f64,
        dz_interior: &[f64],
        gc: usize,
    ) -> Self {
        let ktot = dz_interior.len();
        let icells = itot + 2 * gc;
        let jcells = jtot + 2 * gc;
        let kcells = ktot + 2 * gc;
        let kstart = gc;
        let kend = gc + ktot;

        let mut dz = vec![0.0; kcells];
        dz[kstart..kend].copy_from_slice(dz_interior);
        if ktot > 0 {
            for n in 0..gc {
                let m = n.min(ktot - 1);
                dz[kstart - 1 - n] = dz[kstart + m];
                dz[kend + n] = dz[kend - 1 - m];
            }
        }

        let mut zh = vec![0.0; kcells];
        for k in kstart..kcells.saturating_sub(1) {
            zh[k + 1] = zh[k] + dz[k];
        }
        for k in (0..kstart).rev() {
            zh[k] = zh[k + 1] - dz[k];
        }

        let z: Vec<f64> = zh.iter().zip(&dz).map(|(h, d)| h + 0.5 * d).collect();

        let mut dzh = vec![0.0; kcells];
        if kcells > 0 {
            dzh[0] = dz[0];
        }
        for k in 1..kcells {
            dzh[k] = z[k] - z[k - 1];
        }

        let dzi = dz.iter().map(|d| 1.0 / d).collect();
        let dzhi = dzh.iter().map(|d| 1.0 / d).collect();

        Self {
            itot,
            jtot,
            ktot,
            gc,
            icells,
            jcells,
            kcells,
            ijcells: icells * jcells,
            ncells: icells * jcells * kcells,
            istart: gc,
            iend: gc + itot,
            jstart: gc,
            jend: gc + jtot,
            kstart,
            kend,
            dx,
            dy,
            dxi: 1.0 / dx,
            dyi: 1.0 / dy,
            z,
            zh,
            dz,
            dzi,
            dzh,
            dzhi,
        }
    }

    /// Grid with spacing `h` along every axis.
    pub fn uniform(itot: usize, jtot: usize, ktot: usize, h: f64, gc: usize) -> Self {
        Self::stretched(itot, jtot, h, h, &vec![h; ktot], gc)
    }

    /// Flat index of cell `(i, j, k)`, halo included.
    #[inline]
    pub fn ijk(&self, i: usize, j: usize, k: usize) -> usize {
        i + j * self.icells + k * self.ijcells
    }

    /// Iterates over the interior cells `(i, j, k)` from level `kbegin` up.
    pub fn interior_from(
        &self,
        kbegin: usize,
    ) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (kbegin..self.kend).flat_map(move |k| {
            (self.jstart..self.jend)
                .flat_map(move |j| (self.istart..self.iend).map(move |i| (i, j, k)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_grid_has_consistent_extents() {
        let grid = Grid::uniform(4, 3, 5, 0.5, 1);
        assert_eq!(grid.icells, 6);
        assert_eq!(grid.jcells, 5);
        assert_eq!(grid.kcells, 7);
        assert_eq!(grid.ncells, 6 * 5 * 7);
        assert_eq!((grid.kstart, grid.kend), (1, 6));
        assert_eq!(grid.ijk(1, 1, 1), 1 + 6 + 30);
        for k in 1..grid.kcells {
            assert!((grid.dzh[k] - 0.5).abs() < 1e-14);
            assert!((grid.dzhi[k] - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn stretched_grid_places_levels_between_faces() {
        let grid = Grid::stretched(2, 2, 1.0, 1.0, &[1.0, 2.0, 4.0], 1);
        assert_eq!(grid.zh[grid.kstart], 0.0);
        assert!((grid.zh[grid.kstart + 1] - 1.0).abs() < 1e-14);
        assert!((grid.zh[grid.kstart + 2] - 3.0).abs() < 1e-14);
        assert!((grid.z[grid.kstart + 1] - 2.0).abs() < 1e-14);
        assert!((grid.dzh[grid.kstart + 1] - 1.5).abs() < 1e-14);
        assert!((grid.dzh[grid.kstart + 2] - 3.0).abs() < 1e-14);
        // Halo mirrors the adjacent interior spacing.
        assert_eq!(grid.dz[grid.kstart - 1], 1.0);
        assert_eq!(grid.dz[grid.kend], 4.0);
    }

    #[test]
    fn interior_iterator_visits_every_interior_cell_once() {
        let grid = Grid::uniform(3, 2, 4, 1.0, 1);
        assert_eq!(grid.interior_from(grid.kstart).count(), 3 * 2 * 4);
        assert_eq!(grid.interior_from(grid.kstart + 1).count(), 3 * 2 * 3);
    }
}
