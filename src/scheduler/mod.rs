//! Virtual-user scheduling along a staged ramp profile.
mod ramp;
mod worker;


use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::metrics::{ITERATIONS_INTERRUPTED, MetricSample, MetricsHandle, TagSet};
use crate::scenario::ScenarioExecutor;
use crate::shutdown::ShutdownSender;

pub use ramp::{RampController, RampMode, RampPlan, Stage};
pub use worker::ThinkTime;

use worker::VirtualUser;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub plan: RampPlan,
    pub tick: Duration,
    pub graceful_stop: Duration,
    pub think_time: ThinkTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub elapsed_ms: u64,
    pub desired: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub timeline: Vec<TimelinePoint>,
    pub peak_vus: u64,
    pub started: u64,
    pub retired: u64,
    pub interrupted: u64,
    /// Set when a shutdown signal ended the run before the profile finished.
    pub stopped_early: bool,
}

/// Drives VUs through the ramp profile until it ends or `shutdown_tx` fires,
/// then drains them within the graceful stop window.
pub async fn run_scheduler(
    config: &SchedulerConfig,
    executor: ScenarioExecutor,
    metrics: MetricsHandle,
    shutdown_tx: &ShutdownSender,
) -> ScheduleSummary {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut controller = RampController::new(config.plan.clone());
    let total = config.plan.total_duration();
    let started_at = Instant::now();
    let end = tokio::time::sleep_until(deadline_after(started_at, total));
    tokio::pin!(end);
    let mut ticker = tokio::time::interval(config.tick.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut pool = VuPool::new(executor, metrics.clone(), config.think_time);
    let mut summary = ScheduleSummary::default();
    let mut last_stage = usize::MAX;

    info!(
        "Starting {} stage(s) over {:?} (peak {} VUs)",
        config.plan.stages.len(),
        total,
        config.plan.peak_target()
    );

    loop {
        tokio::select! {
            () = &mut end => break,
            _ = shutdown_rx.recv() => {
                warn!("Shutdown requested; stopping VUs.");
                summary.stopped_early = true;
                break;
            },
            _ = ticker.tick() => {
                let elapsed = started_at.elapsed();
                let desired = controller.advance_to(elapsed);
                if controller.stage_index() != last_stage {
                    last_stage = controller.stage_index();
                    if let Some(stage) = controller.current_stage() {
                        info!(
                            "Stage {}/{}: {} VUs over {:?}",
                            last_stage.saturating_add(1),
                            config.plan.stages.len(),
                            stage.target,
                            stage.duration
                        );
                    }
                }
                pool.scale_to(desired);
                let active = pool.active();
                summary.peak_vus = summary.peak_vus.max(active);
                summary.timeline.push(TimelinePoint {
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    desired,
                    active,
                });
            },
        }
    }

    let elapsed = started_at.elapsed();
    let desired = controller.advance_to(elapsed);
    if !summary.stopped_early && desired < pool.active() {
        pool.scale_to(desired);
    }
    summary.timeline.push(TimelinePoint {
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        desired,
        active: pool.active(),
    });
    info!("Ramp finished after {:?}; draining {} VUs", elapsed, pool.active());

    let interrupted = pool.drain(config.graceful_stop).await;
    if interrupted > 0 {
        warn!(
            "{} VU(s) did not finish within the graceful stop window",
            interrupted
        );
        let sample = MetricSample::count(
            ITERATIONS_INTERRUPTED,
            TagSet::new(),
            interrupted,
            metrics.offset(),
        );
        if let Err(err) = metrics.submit(vec![sample]) {
            warn!("Failed to record interrupted iterations: {}", err);
        }
    }
    summary.started = pool.started;
    summary.retired = pool.retired;
    summary.interrupted = interrupted;
    summary
}

/// Upper bound for timers derived from configured durations.
const MAX_TIMER: Duration = Duration::from_secs(31_536_000);

fn deadline_after(start: Instant, span: Duration) -> Instant {
    start.checked_add(span.min(MAX_TIMER)).unwrap_or(start)
}

/// Running and stopping VUs. Newest VUs sit at the end of `running`.
struct VuPool {
    executor: ScenarioExecutor,
    metrics: MetricsHandle,
    think: ThinkTime,
    running: Vec<VirtualUser>,
    stopping: Vec<VirtualUser>,
    next_id: u64,
    started: u64,
    retired: u64,
}

impl VuPool {
    const fn new(executor: ScenarioExecutor, metrics: MetricsHandle, think: ThinkTime) -> Self {
        Self {
            executor,
            metrics,
            think,
            running: Vec::new(),
            stopping: Vec::new(),
            next_id: 1,
            started: 0,
            retired: 0,
        }
    }

    fn active(&self) -> u64 {
        u64::try_from(self.running.len()).unwrap_or(u64::MAX)
    }

    fn scale_to(&mut self, desired: u64) {
        self.stopping.retain(|vu| !vu.is_finished());
        let active = self.active();
        if desired > active {
            let add = desired.saturating_sub(active);
            for _ in 0..add {
                let id = self.next_id;
                self.next_id = self.next_id.saturating_add(1);
                self.running.push(VirtualUser::spawn(
                    id,
                    self.executor.clone(),
                    self.metrics.clone(),
                    self.think,
                ));
                self.started = self.started.saturating_add(1);
            }
            debug!("Scaled up to {} VUs", desired);
        } else if desired < active {
            let remove = active.saturating_sub(desired);
            for _ in 0..remove {
                let Some(vu) = self.running.pop() else {
                    break;
                };
                vu.stop();
                self.stopping.push(vu);
                self.retired = self.retired.saturating_add(1);
            }
            debug!("Scaled down to {} VUs", desired);
        }
    }

    /// Stops every VU and waits up to `graceful_stop`. Returns how many had
    /// to be aborted.
    async fn drain(&mut self, graceful_stop: Duration) -> u64 {
        for vu in &self.running {
            vu.stop();
        }
        let deadline = deadline_after(Instant::now(), graceful_stop);
        let mut interrupted = 0u64;
        let all = self.running.drain(..).chain(self.stopping.drain(..));
        let vus: Vec<VirtualUser> = all.collect();
        for vu in vus {
            if !vu.join_until(deadline).await {
                interrupted = interrupted.saturating_add(1);
            }
        }
        interrupted
    }
}
