//! Prognostic field storage consumed by the diffusion operator and the time loop.

use crate::grid::Grid;
use crate::traits::PrognosticState;

/// A prognostic variable and its tendency, both covering the full grid
/// including the halo.
#[derive(Debug, Clone)]
pub struct Field3d {
    pub name: String,
    pub data: Vec<f64>,
    pub tend: Vec<f64>,
}

impl Field3d {
    pub fn new(name: &str, grid: &Grid) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0.0; grid.ncells],
            tend: vec![0.0; grid.ncells],
        }
    }

    /// Sets every cell, halo included, to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v = value);
    }
}

/// The three velocity components and the transported scalars.
#[derive(Debug, Clone)]
pub struct Fields {
    pub u: Field3d,
    pub v: Field3d,
    pub w: Field3d,
    pub scalars: Vec<Field3d>,
}

impl Fields {
    pub fn new(grid: &Grid, scalar_names: &[&str]) -> Self {
        Self {
            u: Field3d::new("u", grid),
            v: Field3d::new("v", grid),
            w: Field3d::new("w", grid),
            scalars: scalar_names.iter().map(|name| Field3d::new(name, grid)).collect(),
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&Field3d> {
        self.scalars.iter().find(|s| s.name == name)
    }

    pub fn scalar_mut(&mut self, name: &str) -> Option<&mut Field3d> {
        self.scalars.iter_mut().find(|s| s.name == name)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Field3d> {
        [&mut self.u, &mut self.v, &mut self.w]
            .into_iter()
            .chain(self.scalars.iter_mut())
    }

    pub fn zero_tendencies(&mut self) {
        for field in self.iter_mut() {
            field.tend.iter_mut().for_each(|t| *t = 0.0);
        }
    }
}

impl PrognosticState for Fields {
    fn visit_prognostic(&mut self, visit: &mut dyn FnMut(&mut [f64], &mut [f64])) {
        for field in self.iter_mut() {
            visit(&mut field.data, &mut field.tend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_cover_the_full_grid() {
        let grid = Grid::uniform(4, 4, 4, 1.0, 1);
        let fields = Fields::new(&grid, &["th", "qt"]);
        assert_eq!(fields.u.data.len(), grid.ncells);
        assert_eq!(fields.w.tend.len(), grid.ncells);
        assert_eq!(fields.scalars.len(), 2);
        assert!(fields.scalar("qt").is_some());
        assert!(fields.scalar("missing").is_none());
    }

    #[test]
    fn scalar_mut_edits_the_named_scalar_only() {
        let grid = Grid::uniform(2, 2, 2, 1.0, 1);
        let mut fields = Fields::new(&grid, &["th", "qt"]);
        if let Some(qt) = fields.scalar_mut("qt") {
            qt.fill(0.01);
        }
        assert!(fields.scalar_mut("missing").is_none());

        assert!(fields.scalar("qt").is_some_and(|qt| qt.data.iter().all(|v| *v == 0.01)));
        assert!(fields.scalar("th").is_some_and(|th| th.data.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn visit_prognostic_reaches_momentum_and_scalars() {
        let grid = Grid::uniform(2, 2, 2, 1.0, 1);
        let mut fields = Fields::new(&grid, &["th"]);
        let mut visited = 0;
        fields.visit_prognostic(&mut |data, tend| {
            assert_eq!(data.len(), tend.len());
            tend[0] = 1.0;
            visited += 1;
        });
        assert_eq!(visited, 4);
        assert_eq!(fields.scalar("th").map(|s| s.tend[0]), Some(1.0));

        fields.zero_tendencies();
        assert!(fields.iter_mut().all(|f| f.tend.iter().all(|t| *t == 0.0)));
    }
}
