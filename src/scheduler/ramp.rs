use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    #[must_use]
    pub const fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RampMode {
    /// Interpolate from the previous target across the stage.
    #[default]
    Linear,
    /// Jump to the stage target when the stage starts.
    Step,
}

/// Desired-VU profile: a starting level followed by ordered stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampPlan {
    pub start_vus: u64,
    pub stages: Vec<Stage>,
    pub mode: RampMode,
}

impl RampPlan {
    /// Holds `vus` for `duration`.
    #[must_use]
    pub fn constant(vus: u64, duration: Duration) -> Self {
        Self {
            start_vus: vus,
            stages: vec![Stage::new(duration, vus)],
            mode: RampMode::Step,
        }
    }

    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |acc, stage| acc.saturating_add(stage.duration))
    }

    #[must_use]
    pub fn peak_target(&self) -> u64 {
        self.stages
            .iter()
            .map(|stage| stage.target)
            .fold(self.start_vus, u64::max)
    }
}

/// Walks a [`RampPlan`] as run time advances.
#[derive(Debug, Clone)]
pub struct RampController {
    plan: RampPlan,
    stage_idx: usize,
    stage_elapsed: Duration,
    stage_start_vus: u64,
    position: Duration,
}

impl RampController {
    #[must_use]
    pub fn new(plan: RampPlan) -> Self {
        let start = plan.start_vus;
        let mut controller = Self {
            plan,
            stage_idx: 0,
            stage_elapsed: Duration::ZERO,
            stage_start_vus: start,
            position: Duration::ZERO,
        };
        controller.settle();
        controller
    }

    /// Moves time forward by `step` and returns the desired VU count.
    pub fn advance(&mut self, step: Duration) -> u64 {
        self.position = self.position.saturating_add(step);
        self.stage_elapsed = self.stage_elapsed.saturating_add(step);
        self.settle();
        self.desired()
    }

    /// Moves time forward to `elapsed`; earlier instants are ignored.
    pub fn advance_to(&mut self, elapsed: Duration) -> u64 {
        self.advance(elapsed.saturating_sub(self.position))
    }

    #[must_use]
    pub fn desired(&self) -> u64 {
        let Some(stage) = self.plan.stages.get(self.stage_idx) else {
            return self.stage_start_vus;
        };
        match self.plan.mode {
            RampMode::Step => stage.target,
            RampMode::Linear => interpolate(
                self.stage_start_vus,
                stage.target,
                self.stage_elapsed,
                stage.duration,
            ),
        }
    }

    /// Index of the running stage; equals the stage count once finished.
    #[must_use]
    pub const fn stage_index(&self) -> usize {
        self.stage_idx
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<&Stage> {
        self.plan.stages.get(self.stage_idx)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.stage_idx >= self.plan.stages.len()
    }

    fn settle(&mut self) {
        while let Some(stage) = self.plan.stages.get(self.stage_idx) {
            if self.stage_elapsed < stage.duration {
                break;
            }
            self.stage_elapsed = self.stage_elapsed.saturating_sub(stage.duration);
            self.stage_start_vus = stage.target;
            self.stage_idx = self.stage_idx.saturating_add(1);
        }
    }
}

fn interpolate(start: u64, target: u64, elapsed: Duration, duration: Duration) -> u64 {
    let duration_ms = duration.as_millis();
    if duration_ms == 0 {
        return target;
    }
    let elapsed_ms = elapsed.as_millis().min(duration_ms);
    let start_i = i128::from(start);
    let target_i = i128::from(target);
    let elapsed_i = i128::try_from(elapsed_ms).unwrap_or(i128::MAX);
    let duration_i = i128::try_from(duration_ms).unwrap_or(i128::MAX);

    let delta = target_i.saturating_sub(start_i);
    let step = delta
        .saturating_mul(elapsed_i)
        .checked_div(duration_i)
        .unwrap_or(0);
    let value = start_i.saturating_add(step);
    if value < 0 {
        0
    } else {
        u64::try_from(value).unwrap_or(u64::MAX)
    }
}
