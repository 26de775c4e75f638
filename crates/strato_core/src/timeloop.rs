//! The simulation clock and the explicit Runge-Kutta time loop.
//!
//! Time is kept twice: as a float for reporting and as an integer number of
//! precision ticks (`itime`) for every comparison. Step boundaries, output
//! instants and the end of the run are all decided on integers, so they do
//! not drift however many steps are taken.
//!
//! A step of an `S`-stage scheme is driven by the caller as
//! ```text
//! set_time_step_limit(..)      // no-op inside a substep
//! set_time_step()              // no-op inside a substep
//! repeat S times:
//!     physics adds to tendencies
//!     exec(..)                 // stage update, advances the substep counter
//!     step_time()              // advances the clock after the last stage only
//! ```

use crate::checkpoint::{CheckpointStore, TimeCheckpoint};
use crate::error::{CheckpointError, TimeloopError};
use crate::settings::TimeSettings;
use crate::solvers::{stage_update, RkScheme};
use crate::traits::{PrognosticState, Reduction, StabilityLimit};
use std::time::Instant;

/// Resolution of the integer time. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePrecision {
    ifactor: f64,
}

impl TimePrecision {
    /// `1 / precision` must be an integer number of ticks per time unit.
    pub fn new(precision: f64) -> Result<Self, TimeloopError> {
        if !precision.is_finite() || precision <= 0.0 {
            return Err(invalid("precision", format!("must be positive, got {precision}")));
        }
        let inverse = 1.0 / precision;
        let ifactor = inverse.round();
        let whole = (inverse - ifactor).abs() <= 1e-12 * ifactor;
        if ifactor < 1.0 || ifactor > 2f64.powi(53) || !whole {
            return Err(invalid(
                "precision",
                format!("1/precision must be a whole number of ticks, got {inverse}"),
            ));
        }
        Ok(Self { ifactor })
    }

    /// Ticks per time unit.
    pub fn ifactor(&self) -> f64 {
        self.ifactor
    }

    pub fn to_itime(&self, time: f64) -> Result<u64, TimeloopError> {
        let ticks = (time * self.ifactor).round();
        if !ticks.is_finite() || ticks < 0.0 || ticks >= u64::MAX as f64 {
            return Err(TimeloopError::UnrepresentableTime(time));
        }
        Ok(ticks as u64)
    }

    pub fn to_time(&self, itime: u64) -> f64 {
        itime as f64 / self.ifactor
    }
}

/// Stability number of one limit, reduced over all processes.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub name: String,
    pub number: f64,
    pub threshold: f64,
}

/// Diagnostics returned by [`Timeloop::check`].
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub iteration: u64,
    pub time: f64,
    pub dt: f64,
    /// Wall-clock seconds per iteration since the previous check.
    pub wall_per_iteration: Option<f64>,
    pub limits: Vec<StabilityReport>,
}

#[derive(Debug, Clone)]
pub struct Timeloop {
    scheme: RkScheme,
    precision: TimePrecision,
    adaptive: bool,

    substep: usize,
    iteration: u64,

    time: f64,
    dt: f64,

    itime: u64,
    istarttime: u64,
    iendtime: u64,
    idt: u64,
    idtmax: u64,
    idtmin: u64,
    idtlim: u64,
    isavetime: u64,
    istatstime: u64,
    ichecktime: u64,
    ipostproctime: u64,
    iiotimeprec: u64,
    iotime: u64,

    last_check: Option<(Instant, u64)>,
}

impl Timeloop {
    pub fn new(settings: &TimeSettings) -> Result<Self, TimeloopError> {
        let scheme = RkScheme::from_order(settings.rkorder)?;
        let precision = TimePrecision::new(settings.precision)?;

        if !settings.dt.is_finite() || settings.dt <= 0.0 {
            return Err(invalid("dt", format!("must be positive, got {}", settings.dt)));
        }
        if settings.endtime < settings.starttime {
            return Err(invalid(
                "endtime",
                format!("{} lies before starttime {}", settings.endtime, settings.starttime),
            ));
        }

        let istarttime = precision.to_itime(settings.starttime)?;
        let iendtime = precision.to_itime(settings.endtime)?;
        let idt = positive_ticks(&precision, "dt", settings.dt)?;
        let idtmax = match settings.dtmax {
            Some(dtmax) => positive_ticks(&precision, "dtmax", dtmax)?,
            None => u64::MAX,
        };
        let idtmin = match settings.dtmin {
            Some(dtmin) => positive_ticks(&precision, "dtmin", dtmin)?,
            None => 1,
        };
        let isavetime = positive_ticks(&precision, "savetime", settings.savetime)?;
        let istatstime = positive_ticks(
            &precision,
            "statstime",
            settings.statstime.unwrap_or(settings.savetime),
        )?;
        let ichecktime = positive_ticks(
            &precision,
            "checktime",
            settings.checktime.unwrap_or(settings.savetime),
        )?;
        let ipostproctime = positive_ticks(
            &precision,
            "postproctime",
            settings.postproctime.unwrap_or(settings.savetime),
        )?;

        let iiotimeprec = (10f64.powi(settings.iotimeprec) * precision.ifactor()).round();
        if !(iiotimeprec >= 1.0 && iiotimeprec < u64::MAX as f64) {
            return Err(invalid(
                "iotimeprec",
                format!("10^{} is below the time precision", settings.iotimeprec),
            ));
        }
        let iiotimeprec = iiotimeprec as u64;

        if !settings.adaptivestep {
            // A fixed step has to land on every output instant.
            for (name, interval) in [
                ("savetime", isavetime),
                ("statstime", istatstime),
                ("checktime", ichecktime),
                ("postproctime", ipostproctime),
            ] {
                if interval % idt != 0 {
                    return Err(invalid(
                        name,
                        format!("must be a multiple of the fixed time step {}", settings.dt),
                    ));
                }
            }
            if (iendtime - istarttime) % idt != 0 {
                return Err(invalid(
                    "endtime",
                    format!(
                        "run length {} is not a multiple of the fixed time step {}",
                        settings.endtime - settings.starttime,
                        settings.dt
                    ),
                ));
            }
        }

        log::info!(
            "time loop: {} ({} stages), {} dt = {}, t = {} -> {}",
            scheme,
            scheme.stages(),
            if settings.adaptivestep { "adaptive" } else { "fixed" },
            precision.to_time(idt),
            settings.starttime,
            settings.endtime
        );

        Ok(Self {
            scheme,
            precision,
            adaptive: settings.adaptivestep,
            substep: 0,
            iteration: 0,
            time: precision.to_time(istarttime),
            dt: precision.to_time(idt),
            itime: istarttime,
            istarttime,
            iendtime,
            idt,
            idtmax,
            idtmin,
            idtlim: idtmax,
            isavetime,
            istatstime,
            ichecktime,
            ipostproctime,
            iiotimeprec,
            iotime: istarttime / iiotimeprec,
            last_check: None,
        })
    }

    /// Collects the time step limits of `limits` into the integer limit for
    /// the next step. Each stability number is reduced over all processes,
    /// so every subdomain gets the same step.
    ///
    /// With a fixed time step nothing is adjusted; a configured step beyond a
    /// limit is an error.
    pub fn set_time_step_limit(
        &mut self,
        limits: &[&dyn StabilityLimit],
        comm: &dyn Reduction,
    ) -> Result<(), TimeloopError> {
        if self.in_substep() {
            return Ok(());
        }

        let mut idtlim = self.idtmax;
        for limit in limits {
            let rate = comm.max(limit.stability_number(1.0));
            let threshold = limit.max_stability_number(self.scheme);

            if !self.adaptive {
                let number = rate * self.dt;
                if number > threshold {
                    return Err(TimeloopError::FixedTimeStepUnstable {
                        limit: limit.name().to_string(),
                        dt: self.dt,
                        number,
                        threshold,
                    });
                }
                continue;
            }

            idtlim = idtlim.min(self.limit_ticks(rate, threshold));
        }

        self.idtlim = idtlim;
        Ok(())
    }

    /// Lowers the limit for the next step to `idt` ticks, for constraints that
    /// are not stability numbers.
    pub fn restrict_time_step_limit(&mut self, idt: u64) {
        if self.in_substep() {
            return;
        }
        self.idtlim = self.idtlim.min(idt);
    }

    /// Largest step in ticks for which `rate * dt` stays at or below
    /// `threshold`.
    fn limit_ticks(&self, rate: f64, threshold: f64) -> u64 {
        if rate <= 0.0 {
            return u64::MAX;
        }
        // The margin absorbs the rounding of the tick/time conversions.
        let ticks = threshold / rate * self.precision.ifactor() * (1.0 - 8.0 * f64::EPSILON);
        // NaN maps to zero, which is then rejected as a collapsed step.
        ticks.floor() as u64
    }

    /// Sets the step size for the next step from the current limit, the
    /// maximum step and the distance to the next output instant or the end
    /// of the run.
    pub fn set_time_step(&mut self) -> Result<(), TimeloopError> {
        if self.in_substep() || !self.adaptive {
            return Ok(());
        }

        let idtlim = self.idtlim.min(self.idtmax);
        if idtlim < self.idtmin {
            return Err(TimeloopError::TimeStepCollapsed {
                idt: idtlim,
                idtmin: self.idtmin,
            });
        }

        let mut idt = idtlim;
        for interval in [
            self.isavetime,
            self.istatstime,
            self.ichecktime,
            self.ipostproctime,
        ] {
            idt = idt.min(interval - self.itime % interval);
        }
        if self.iendtime > self.itime {
            idt = idt.min(self.iendtime - self.itime);
        }

        self.idt = idt;
        self.dt = self.precision.to_time(idt);
        log::debug!(
            "iteration {}: dt = {} (limit {})",
            self.iteration,
            self.dt,
            self.precision.to_time(idtlim)
        );
        Ok(())
    }

    /// Applies the current stage to every prognostic variable and moves to
    /// the next stage.
    pub fn exec(&mut self, state: &mut impl PrognosticState) {
        let (scheme, substep, dt) = (self.scheme, self.substep, self.dt);
        state.visit_prognostic(&mut |value, tend| stage_update(scheme, substep, dt, value, tend));
        self.substep = (self.substep + 1) % self.scheme.stages();
    }

    /// Advances the clock by one step once all stages are done.
    pub fn step_time(&mut self) {
        if self.in_substep() {
            return;
        }

        self.itime += self.idt;
        self.time = self.precision.to_time(self.itime);
        self.iotime = self.itime / self.iiotimeprec;
        self.iteration += 1;
    }

    /// Jumps to the next post-processing instant, for runs that only
    /// evaluate stored output.
    pub fn step_post_proc_time(&mut self) {
        self.itime += self.ipostproctime;
        self.time = self.precision.to_time(self.itime);
        self.iotime = self.itime / self.iiotimeprec;
    }

    /// Reports the current stability numbers and the throughput since the
    /// previous check.
    pub fn check(
        &mut self,
        limits: &[&dyn StabilityLimit],
        comm: &dyn Reduction,
    ) -> CheckReport {
        let now = Instant::now();
        let wall_per_iteration = self.last_check.and_then(|(then, iteration)| {
            let steps = self.iteration.saturating_sub(iteration);
            (steps > 0).then(|| now.duration_since(then).as_secs_f64() / steps as f64)
        });
        self.last_check = Some((now, self.iteration));

        let limits: Vec<StabilityReport> = limits
            .iter()
            .map(|limit| StabilityReport {
                name: limit.name().to_string(),
                number: comm.max(limit.stability_number(self.dt)),
                threshold: limit.max_stability_number(self.scheme),
            })
            .collect();

        let numbers = limits
            .iter()
            .map(|l| format!("{} = {:.3}", l.name, l.number))
            .collect::<Vec<_>>()
            .join(", ");
        log::info!(
            "iter {:8}, time {:.6e}, dt {:.3e}, wall/iter {:.3e}, {}",
            self.iteration,
            self.time,
            self.dt,
            wall_per_iteration.unwrap_or(0.0),
            numbers
        );

        CheckReport {
            iteration: self.iteration,
            time: self.time,
            dt: self.dt,
            wall_per_iteration,
            limits,
        }
    }

    pub fn save(&self, store: &impl CheckpointStore, index: u64) -> Result<(), CheckpointError> {
        if self.in_substep() {
            return Err(CheckpointError::InSubstep);
        }
        store.write(index, &self.checkpoint())?;
        log::info!(
            "saved time {} (iteration {}) to checkpoint {}",
            self.time,
            self.iteration,
            index
        );
        Ok(())
    }

    /// Restores the time state written by [`Timeloop::save`]. The step limit
    /// is reset; callers recompute it from the restored grid and physics.
    pub fn load(
        &mut self,
        store: &impl CheckpointStore,
        index: u64,
    ) -> Result<(), CheckpointError> {
        let record = store.read(index)?;

        if record.scheme != self.scheme {
            return Err(CheckpointError::SchemeMismatch {
                expected: self.scheme.to_string(),
                found: record.scheme.to_string(),
            });
        }
        if (record.time * self.precision.ifactor() - record.itime as f64).abs() > 0.5 {
            log::warn!(
                "checkpoint {}: time {} and itime {} disagree at {} ticks per unit",
                index,
                record.time,
                record.itime,
                self.precision.ifactor()
            );
            return Err(CheckpointError::InconsistentTime {
                time: record.time,
                itime: record.itime,
            });
        }

        self.time = record.time;
        self.itime = record.itime;
        self.iteration = record.iteration;
        self.iotime = self.itime / self.iiotimeprec;
        self.substep = 0;
        self.idtlim = self.idtmax;
        self.last_check = None;

        log::info!(
            "loaded time {} (iteration {}) from checkpoint {}",
            self.time,
            self.iteration,
            index
        );
        Ok(())
    }

    pub fn checkpoint(&self) -> TimeCheckpoint {
        TimeCheckpoint {
            time: self.time,
            itime: self.itime,
            iteration: self.iteration,
            scheme: self.scheme,
        }
    }

    pub fn in_substep(&self) -> bool {
        self.substep > 0
    }

    pub fn is_stats_step(&self) -> bool {
        !self.in_substep() && self.itime % self.istatstime == 0
    }

    pub fn do_check(&self) -> bool {
        !self.in_substep() && self.itime % self.ichecktime == 0
    }

    pub fn do_save(&self) -> bool {
        !self.in_substep() && self.itime % self.isavetime == 0
    }

    pub fn is_finished(&self) -> bool {
        self.itime >= self.iendtime
    }

    /// Effective step of the current stage.
    pub fn sub_time_step(&self) -> f64 {
        self.scheme.sub_dt(self.substep, self.dt)
    }

    /// Model time at which the current stage evaluates its tendencies.
    pub fn stage_time(&self) -> f64 {
        self.time + self.scheme.stage_time(self.substep) * self.dt
    }

    pub fn scheme(&self) -> RkScheme {
        self.scheme
    }

    pub fn precision(&self) -> TimePrecision {
        self.precision
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn substep(&self) -> usize {
        self.substep
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn itime(&self) -> u64 {
        self.itime
    }

    pub fn idt(&self) -> u64 {
        self.idt
    }

    pub fn istarttime(&self) -> u64 {
        self.istarttime
    }

    pub fn iendtime(&self) -> u64 {
        self.iendtime
    }

    pub fn iotime(&self) -> u64 {
        self.iotime
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}

fn invalid(name: &'static str, reason: String) -> TimeloopError {
    TimeloopError::InvalidSetting { name, reason }
}

fn positive_ticks(
    precision: &TimePrecision,
    name: &'static str,
    value: f64,
) -> Result<u64, TimeloopError> {
    let ticks = precision
        .to_itime(value)
        .map_err(|_| invalid(name, format!("cannot represent {value}")))?;
    if ticks == 0 {
        return Err(invalid(
            name,
            format!("{value} is below the time precision {}", precision.to_time(1)),
        ));
    }
    Ok(ticks)
}
