//! Run configuration consumed by the time loop and the diffusion operator.

use crate::diffusion::DiffusionKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub time: TimeSettings,
    pub diffusion: DiffusionSettings,
}

impl SimulationSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse simulation settings.")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}.", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid settings in {}.", path.display()))
    }
}

/// Time stepping controls. All times are in model time units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    /// Runge-Kutta order, 3 or 4.
    pub rkorder: u32,
    pub adaptivestep: bool,
    /// Initial time step, or the time step of the whole run when
    /// `adaptivestep` is off.
    pub dt: f64,
    pub dtmax: Option<f64>,
    /// Smallest acceptable adaptive time step; defaults to one precision tick.
    pub dtmin: Option<f64>,
    pub starttime: f64,
    pub endtime: f64,
    pub savetime: f64,
    pub statstime: Option<f64>,
    pub checktime: Option<f64>,
    pub postproctime: Option<f64>,
    /// Resolution of the integer time.
    pub precision: f64,
    /// Output times are labelled in units of `10^iotimeprec`.
    pub iotimeprec: i32,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            rkorder: 3,
            adaptivestep: true,
            dt: 1.0,
            dtmax: None,
            dtmin: None,
            starttime: 0.0,
            endtime: 1.0,
            savetime: 1.0,
            statstime: None,
            checktime: None,
            postproctime: None,
            precision: 1e-9,
            iotimeprec: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiffusionSettings {
    #[serde(default)]
    pub swdiff: DiffusionKind,
    /// Momentum viscosity.
    pub visc: f64,
    /// Scalar viscosity; the momentum viscosity when absent.
    #[serde(default)]
    pub viscs: Option<f64>,
    #[serde(default)]
    pub dnmax: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn parses_settings_with_defaults() {
        let settings = SimulationSettings::from_json_str(
            r#"{
                "time": { "rkorder": 4, "endtime": 3600.0, "savetime": 600.0, "dt": 0.5 },
                "diffusion": { "visc": 1e-5 }
            }"#,
        )
        .expect("settings should parse");

        assert_eq!(settings.time.rkorder, 4);
        assert!(settings.time.adaptivestep);
        assert_eq!(settings.time.endtime, 3600.0);
        assert_eq!(settings.time.precision, 1e-9);
        assert_eq!(settings.time.statstime, None);
        assert_eq!(settings.diffusion.swdiff, DiffusionKind::SecondOrder);
        assert_eq!(settings.diffusion.viscs, None);
    }

    #[test]
    fn parses_disabled_diffusion() {
        let settings = SimulationSettings::from_json_str(
            r#"{ "time": {}, "diffusion": { "swdiff": "disabled", "visc": 0.0 } }"#,
        )
        .unwrap();
        assert_eq!(settings.diffusion.swdiff, DiffusionKind::Disabled);
    }

    #[test]
    fn rejects_missing_viscosity_and_unknown_scheme() {
        assert_err_contains(
            SimulationSettings::from_json_str(r#"{ "time": {}, "diffusion": {} }"#),
            "visc",
        );
        assert_err_contains(
            SimulationSettings::from_json_str(
                r#"{ "time": {}, "diffusion": { "swdiff": "fourth", "visc": 1.0 } }"#,
            ),
            "unknown variant",
        );
    }

    #[test]
    fn reads_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{ "time": { "adaptivestep": false, "dt": 0.1 },
                 "diffusion": { "visc": 2.0, "viscs": 1.0 } }"#,
        )
        .unwrap();
        let settings = SimulationSettings::from_json_file(file.path()).unwrap();
        assert!(!settings.time.adaptivestep);
        assert_eq!(settings.diffusion.viscs, Some(1.0));

        let missing = file.path().with_extension("missing");
        assert_err_contains(
            SimulationSettings::from_json_file(&missing),
            "Failed to read settings file",
        );
    }
}
