use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{self, run_load};
use crate::error::AppResult;
use crate::http::{HttpClient, ReqwestClient};
use crate::lifecycle::ConfiguredHooks;
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};

use super::types::{ExecutionPlan, Verdict};

pub(crate) async fn execute_plan(plan: ExecutionPlan) -> AppResult<Verdict> {
    let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(&plan.run.client)?);
    let hooks = ConfiguredHooks::new(
        Arc::clone(&client),
        plan.run.base.clone(),
        plan.setup,
        plan.teardown_message,
    );

    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    let result = run_load(&plan.run, client, &hooks, &shutdown_tx).await;
    drop(shutdown_tx.send(()));
    signal_handle.await?;
    let result = result?;

    if !plan.output.quiet {
        app::print_summary(&result);
    }
    if let Some(path) = plan.output.summary_export.as_deref() {
        app::export_json(path, &result).await?;
        info!("Run result written to {}", path);
    }

    if result.passed {
        info!("All {} threshold(s) passed.", result.thresholds.len());
        Ok(Verdict::Passed)
    } else {
        for outcome in result.failed_thresholds() {
            warn!(
                "Threshold failed: {} {} (observed {:?})",
                outcome.key(),
                outcome.expression,
                outcome.observed
            );
        }
        Ok(Verdict::ThresholdsFailed)
    }
}
