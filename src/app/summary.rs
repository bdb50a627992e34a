use crate::metrics::MetricSummary;

use super::runner::{HookStatus, RunResult};

pub(crate) fn print_summary(result: &RunResult) {
    for line in summary_lines(result) {
        println!("{}", line);
    }
}

pub(crate) fn summary_lines(result: &RunResult) -> Vec<String> {
    let mut lines = Vec::new();
    let schedule = &result.schedule;
    lines.push(format!(
        "Scenario: {}  Target: {}",
        result.scenario, result.base_url
    ));
    lines.push(format!(
        "Duration: {:.1}s  Peak VUs: {}  Started: {}  Interrupted: {}{}",
        result.metrics.elapsed_ms as f64 / 1000.0,
        schedule.peak_vus,
        schedule.started,
        schedule.interrupted,
        if schedule.stopped_early {
            "  (stopped early)"
        } else {
            ""
        }
    ));

    if !result.thresholds.is_empty() {
        lines.push(String::new());
        lines.push("Thresholds:".to_owned());
        for outcome in &result.thresholds {
            let observed = outcome
                .observed
                .map_or_else(|| "no samples".to_owned(), |value| format!("{:.4}", value));
            let window = outcome
                .window_secs
                .map_or_else(String::new, |secs| format!(" over last {}s", secs));
            lines.push(format!(
                "  [{}] {} {}{} (observed {})",
                if outcome.passed { "PASS" } else { "FAIL" },
                outcome.key(),
                outcome.expression,
                window,
                observed
            ));
        }
    }

    if !result.checks.is_empty() {
        lines.push(String::new());
        lines.push("Checks:".to_owned());
        let mut current_group: Option<&str> = None;
        for check in &result.checks {
            if current_group != Some(check.group.as_str()) {
                current_group = Some(check.group.as_str());
                lines.push(format!("  {}", check.group));
            }
            let mark = if check.fails == 0 { "ok" } else { "!!" };
            lines.push(format!(
                "    {} {}: {} passed, {} failed",
                mark, check.check, check.passes, check.fails
            ));
        }
    }

    lines.push(String::new());
    lines.push("Metrics:".to_owned());
    for (name, summary) in &result.metrics.metrics {
        lines.push(format!("  {:<24} {}", name, metric_line(summary)));
    }

    if let HookStatus::Failed { message } = &result.teardown {
        lines.push(String::new());
        lines.push(format!("Teardown failed: {}", message));
    }

    lines.push(String::new());
    let failed = result.failed_thresholds().count();
    if result.passed {
        lines.push(format!(
            "Result: PASS ({} threshold(s) passed)",
            result.thresholds.len()
        ));
    } else {
        lines.push(format!(
            "Result: FAIL ({} of {} threshold(s) failed)",
            failed,
            result.thresholds.len()
        ));
    }
    lines
}

fn metric_line(summary: &MetricSummary) -> String {
    match summary {
        MetricSummary::Counter { count, rate } => format!("count={} rate={:.2}/s", count, rate),
        MetricSummary::Rate { trues, total, rate } => {
            format!("rate={:.2}% ({} of {})", rate * 100.0, trues, total)
        }
        MetricSummary::Trend {
            avg,
            min,
            med,
            max,
            percentiles,
            ..
        } => {
            let mut parts = vec![
                format!("avg={:.2}", avg),
                format!("min={:.2}", min),
                format!("med={:.2}", med),
                format!("max={:.2}", max),
            ];
            parts.extend(
                percentiles
                    .iter()
                    .map(|(label, value)| format!("{}={:.2}", label, value)),
            );
            parts.join(" ")
        }
    }
}
