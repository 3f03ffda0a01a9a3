//! Fault times studied and how each one is reported.

use g74_core::{Diagnostics, FaultTimeClass, Seconds};
use tracing::warn;

use crate::config::FaultTimeConfig;

/// Ascending, de-duplicated fault times that always include the minimal and
/// peak times.
///
/// Times are snapped to the report step ([`Seconds::STEPS_PER_SECOND`]) so
/// every scheduled time has its own report file and result key.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultSchedule {
    times: Vec<Seconds>,
    minimal_ms: i64,
    peak_ms: i64,
}

impl FaultSchedule {
    /// Build a schedule from the requested times, adding the minimal and peak
    /// times with a warning when the request lacks them.
    pub fn build(requested: &[Seconds], config: &FaultTimeConfig, diag: &mut Diagnostics) -> Self {
        let mut schedule = Self {
            times: Vec::with_capacity(requested.len() + 2),
            minimal_ms: config.minimal().to_millis_rounded(),
            peak_ms: config.peak().to_millis_rounded(),
        };

        for &t in requested {
            let snapped = t.snapped();
            match schedule.times.iter().find(|s| s.to_steps() == snapped.to_steps()).copied() {
                None => schedule.times.push(snapped),
                Some(existing) if !existing.approx_eq(t) => {
                    let message = format!(
                        "{} s fault time shares a report step with {} s and is studied once",
                        t.value(),
                        existing.value()
                    );
                    warn!("{}", message);
                    diag.add_warning("schedule", &message);
                }
                Some(_) => {}
            }
        }

        let required = [
            (FaultTimeClass::Minimal, config.minimal(), "the initial fault current"),
            (FaultTimeClass::Peak, config.peak(), "the peak make current"),
        ];
        for (class, t, purpose) in required {
            if schedule.times.iter().any(|&s| schedule.classify(s) == class) {
                continue;
            }
            let message = format!(
                "{:.4} s fault time missing from the request; it is needed to determine {} and has been added",
                t.value(),
                purpose
            );
            warn!("{}", message);
            diag.add_warning("schedule", &message);
            schedule.times.push(t.snapped());
        }

        schedule
            .times
            .sort_by(|a, b| a.value().total_cmp(&b.value()));
        schedule
    }

    /// Classify a time at millisecond resolution.
    pub fn classify(&self, t: Seconds) -> FaultTimeClass {
        let ms = t.to_millis_rounded();
        if ms == self.minimal_ms {
            FaultTimeClass::Minimal
        } else if ms == self.peak_ms {
            FaultTimeClass::Peak
        } else {
            FaultTimeClass::Other
        }
    }

    pub fn times(&self) -> &[Seconds] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The studied time classified as the minimal time
    pub fn minimal_time(&self) -> Option<Seconds> {
        self.times
            .iter()
            .copied()
            .find(|&t| self.classify(t) == FaultTimeClass::Minimal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Seconds, FaultTimeClass)> + '_ {
        self.times.iter().map(move |&t| (t, self.classify(t)))
    }
}
