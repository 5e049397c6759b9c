use std::time::{Duration, Instant};

use tracing::info;

use crate::preprocessing::steps::TransformStep;

/// A timed section of [`PreProcessor::process_with_timings`](super::PreProcessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReadInput,
    Georeference,
    /// One transform step; `post_write` steps run nested inside [`Phase::PostWrite`]
    Step { name: &'static str, post_write: bool },
    Encode,
    Footprint,
    PostWrite,
}

impl Phase {
    pub fn step(step: &TransformStep) -> Self {
        Phase::Step {
            name: step.name(),
            post_write: step.is_post_write(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::ReadInput => "read_input",
            Phase::Georeference => "georeference",
            Phase::Step { name, .. } => *name,
            Phase::Encode => "encode",
            Phase::Footprint => "footprint",
            Phase::PostWrite => "post_write",
        }
    }

    fn is_nested(&self) -> bool {
        matches!(self, Phase::Step { post_write: true, .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub duration: Duration,
}

/// Wall-clock time per pipeline phase, in execution order.
#[derive(Debug, Default)]
pub struct PipelineTimings {
    phases: Vec<PhaseTiming>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_phase(&mut self, phase: Phase, duration: Duration) {
        self.phases.push(PhaseTiming { phase, duration });
    }

    pub fn record(&mut self, timer: Timer) {
        let (phase, duration) = timer.stop();
        self.add_phase(phase, duration);
    }

    /// Pipeline wall time. Post-write steps are already part of `post_write`.
    pub fn total_duration(&self) -> Duration {
        self.phases
            .iter()
            .filter(|p| !p.phase.is_nested())
            .map(|p| p.duration)
            .sum()
    }

    /// Accumulated time of every phase with this name.
    pub fn get_phase(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .filter(|p| p.phase.name() == name)
            .map(|p| p.duration)
            .reduce(|a, b| a + b)
    }

    /// Time spent in transform steps, before and after the write.
    pub fn steps_duration(&self) -> Duration {
        self.phases
            .iter()
            .filter(|p| matches!(p.phase, Phase::Step { .. }))
            .map(|p| p.duration)
            .sum()
    }

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn log_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        for timing in &self.phases {
            let ms = timing.duration.as_secs_f64() * 1000.0;
            let share = if total > 0.0 {
                timing.duration.as_secs_f64() / total * 100.0
            } else {
                0.0
            };
            let indent = if timing.phase.is_nested() { "  " } else { "" };
            info!(
                "{indent}{:<24} {:>10.3}ms ({:>5.1}%)",
                timing.phase.name(),
                ms,
                share
            );
        }
        info!(
            "{:<24} {:>10.3}ms, steps {:.3}ms",
            "total",
            total * 1000.0,
            self.steps_duration().as_secs_f64() * 1000.0
        );
    }
}

pub struct Timer {
    start: Instant,
    phase: Phase,
}

impl Timer {
    pub fn start(phase: Phase) -> Self {
        Self {
            start: Instant::now(),
            phase,
        }
    }

    pub fn stop(self) -> (Phase, Duration) {
        (self.phase, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::steps::{NoDataAssignment, OverviewGeneration, OverviewResampling};

    #[test]
    fn test_post_write_steps_are_not_counted_twice() {
        let nodata = TransformStep::NoDataAssignment(NoDataAssignment::new(0.0));
        let overviews = TransformStep::OverviewGeneration(OverviewGeneration::new(
            None,
            OverviewResampling::Nearest,
        ));

        let mut timings = PipelineTimings::new();
        timings.add_phase(Phase::ReadInput, Duration::from_millis(4));
        timings.add_phase(Phase::step(&nodata), Duration::from_millis(2));
        timings.add_phase(Phase::Encode, Duration::from_millis(5));
        timings.add_phase(Phase::step(&overviews), Duration::from_millis(6));
        timings.add_phase(Phase::PostWrite, Duration::from_millis(10));

        assert_eq!(timings.total_duration(), Duration::from_millis(21));
        assert_eq!(timings.steps_duration(), Duration::from_millis(8));
        assert_eq!(timings.get_phase("nodata_assignment"), Some(Duration::from_millis(2)));
        assert_eq!(timings.get_phase("overview_generation"), Some(Duration::from_millis(6)));
        assert_eq!(timings.get_phase("footprint"), None);
    }

    #[test]
    fn test_repeated_phases_accumulate() {
        let mut timings = PipelineTimings::new();
        timings.add_phase(Phase::Encode, Duration::from_millis(2));
        timings.add_phase(Phase::Encode, Duration::from_millis(3));

        assert_eq!(timings.phases().len(), 2);
        assert_eq!(timings.get_phase("encode"), Some(Duration::from_millis(5)));
    }
}
