use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::RequestError;
use crate::http::{HttpClient, HttpResponse, TargetBase};
use crate::metrics::{
    CHECKS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS, ITERATION_DURATION, ITERATIONS,
    MetricSample, RunClock, TagSet, tag_keys,
};

use super::{CheckResult, Group, Scenario};

/// Identifies the iteration being run; exposed to templates as `{{vu}}` and
/// `{{iter}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationContext {
    pub vu: u64,
    pub iteration: u64,
}

/// Everything one iteration produced. Nothing reaches the registry until
/// the batch is submitted.
#[derive(Debug, Clone, Default)]
pub struct IterationOutcome {
    pub samples: Vec<MetricSample>,
    pub checks: Vec<CheckResult>,
    pub duration: Duration,
}

impl IterationOutcome {
    #[must_use]
    pub fn checks_passed(&self) -> usize {
        self.checks.iter().filter(|check| check.passed).count()
    }

    /// Request samples, check samples and the iteration counters, in that order.
    #[must_use]
    pub fn into_batch(self, end: Duration) -> Vec<MetricSample> {
        let IterationOutcome {
            mut samples,
            checks,
            duration,
        } = self;
        for check in checks {
            let mut tags = check.tags;
            tags.insert(tag_keys::GROUP, check.group.as_str());
            tags.insert(tag_keys::CHECK, check.check.as_str());
            samples.push(MetricSample::flag(CHECKS, tags, check.passed, check.offset));
        }
        samples.push(MetricSample::count(ITERATIONS, TagSet::new(), 1, end));
        samples.push(MetricSample::value(
            ITERATION_DURATION,
            TagSet::new(),
            millis(duration),
            end,
        ));
        samples
    }
}

/// Runs scenario iterations against a client. Shared by every VU.
#[derive(Clone)]
pub struct ScenarioExecutor {
    scenario: Arc<Scenario>,
    client: Arc<dyn HttpClient>,
    base: TargetBase,
}

impl std::fmt::Debug for ScenarioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioExecutor")
            .field("scenario", &self.scenario.name)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ScenarioExecutor {
    #[must_use]
    pub fn new(scenario: Scenario, client: Arc<dyn HttpClient>, base: TargetBase) -> Self {
        Self {
            scenario: Arc::new(scenario),
            client,
            base,
        }
    }

    /// Runs every group in order and returns the finished batch.
    pub async fn run_iteration(&self, ctx: IterationContext, clock: RunClock) -> Vec<MetricSample> {
        let started = clock.elapsed();
        let outcome = self.execute(ctx, clock).await;
        let end = clock.elapsed();
        let outcome = IterationOutcome {
            duration: end.saturating_sub(started),
            ..outcome
        };
        outcome.into_batch(end)
    }

    /// Runs every group in order without converting to samples.
    pub async fn execute(&self, ctx: IterationContext, clock: RunClock) -> IterationOutcome {
        let vars = BTreeMap::from([
            ("vu".to_owned(), ctx.vu.to_string()),
            ("iter".to_owned(), ctx.iteration.to_string()),
        ]);
        let mut outcome = IterationOutcome::default();
        for group in &self.scenario.groups {
            self.run_group(group, ctx, &vars, clock, &mut outcome).await;
        }
        outcome
    }

    async fn run_group(
        &self,
        group: &Group,
        ctx: IterationContext,
        vars: &BTreeMap<String, String>,
        clock: RunClock,
        outcome: &mut IterationOutcome,
    ) {
        let Some(template) = group
            .strategy
            .pick(&group.requests, ctx.iteration)
            .and_then(|idx| group.requests.get(idx))
        else {
            return;
        };

        let result = match template.render(&self.base, vars) {
            Ok(request) => self.client.request(&request).await,
            Err(err) => Err(RequestError::Network {
                message: err.to_string(),
                elapsed: Duration::ZERO,
            }),
        };
        let offset = clock.elapsed();

        let mut tags = group.tags.clone();
        tags.insert(tag_keys::GROUP, group.name.as_str());
        tags.insert(tag_keys::METHOD, template.method.as_str());
        tags.insert(tag_keys::NAME, template.path.as_str());

        let (failed, duration, response) = match result {
            Ok(response) => {
                tags.insert(tag_keys::STATUS, response.status.to_string());
                let failed = !template.expected_statuses.contains(response.status);
                (failed, response.duration, Some(response))
            }
            Err(err) => {
                debug!(
                    "VU {} {} {} failed: {}",
                    ctx.vu, template.method, template.path, err
                );
                tags.insert(tag_keys::STATUS, "0");
                tags.insert(tag_keys::ERROR, err.kind());
                (true, err.elapsed(), None)
            }
        };

        outcome
            .samples
            .push(MetricSample::count(HTTP_REQS, tags.clone(), 1, offset));
        outcome
            .samples
            .push(MetricSample::flag(HTTP_REQ_FAILED, tags.clone(), failed, offset));
        outcome.samples.push(MetricSample::value(
            HTTP_REQ_DURATION,
            tags,
            millis(duration),
            offset,
        ));

        for check in &group.checks {
            outcome.checks.push(CheckResult {
                check: check.name.clone(),
                group: group.name.clone(),
                tags: group.tags.clone(),
                passed: response
                    .as_ref()
                    .is_some_and(|response: &HttpResponse| check.rule.evaluate(response)),
                offset,
            });
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
