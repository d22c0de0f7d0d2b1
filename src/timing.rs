use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Stages of a single `distribute` call, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Validating,
    Preparing,
    /// Weighted cost expression.
    #[serde(rename = "SUMMATION_1")]
    Summation1,
    /// Fairness deviation constraints.
    #[serde(rename = "SUMMATION_2")]
    Summation2,
    Constraints,
    Solving,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseTimings(Vec<PhaseTiming>);

impl PhaseTimings {
    pub fn get(&self, phase: Phase) -> Option<Duration> {
        self.0
            .iter()
            .find(|t| t.phase == phase)
            .map(|t| Duration::from_secs_f64(t.seconds))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseTiming> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Records the time spent in each phase as laps of one stopwatch.
#[derive(Debug)]
pub struct PhaseTimer {
    started: Instant,
    lap_started: Instant,
    timings: Vec<PhaseTiming>,
}

impl PhaseTimer {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            lap_started: now,
            timings: Vec::with_capacity(7),
        }
    }

    /// Close the current lap and attribute it to `phase`.
    pub fn lap(&mut self, phase: Phase) {
        let now = Instant::now();
        let elapsed = now - self.lap_started;
        tracing::debug!(?phase, seconds = elapsed.as_secs_f64(), "phase finished");
        self.timings.push(PhaseTiming {
            phase,
            seconds: elapsed.as_secs_f64(),
        });
        self.lap_started = now;
    }

    /// Drop the current lap without attributing it to any phase.
    pub fn skip(&mut self) {
        self.lap_started = Instant::now();
    }

    pub fn finish(mut self) -> PhaseTimings {
        self.timings.push(PhaseTiming {
            phase: Phase::Total,
            seconds: self.started.elapsed().as_secs_f64(),
        });
        PhaseTimings(self.timings)
    }
}
