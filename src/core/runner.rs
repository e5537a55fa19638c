//! Sequential step executor.
//!
//! Steps run strictly in order. Before each step the operator is asked to
//! run, skip, or abort; after a successful run the step verifies its own
//! outcome on disk before the next one starts.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::domain::model::StepContext;
use crate::domain::ports::{Confirmer, Decision, PipelineStep};
use crate::utils::error::{CasefilesError, Result};
#[cfg(feature = "cli")]
use crate::utils::monitor::SystemMonitor;

pub struct StepRunner {
    steps: Vec<Box<dyn PipelineStep>>,
    confirmer: Arc<dyn Confirmer>,
    from_step: u8,
    #[cfg(feature = "cli")]
    monitor: Option<SystemMonitor>,
}

impl StepRunner {
    pub fn new(steps: Vec<Box<dyn PipelineStep>>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            steps,
            confirmer,
            from_step: 1,
            #[cfg(feature = "cli")]
            monitor: None,
        }
    }

    /// Skip steps numbered below `from_step`. When selection is skipped the
    /// caller must seed the context with a case folder, see
    /// [`crate::core::select::resume_case_folder`].
    pub fn from_step(mut self, from_step: u8) -> Self {
        self.from_step = from_step;
        self
    }

    #[cfg(feature = "cli")]
    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub async fn run(&self, ctx: &mut StepContext) -> Result<()> {
        for step in &self.steps {
            let id = step.id();
            if id.number() < self.from_step {
                info!("{} skipped (starting from step {})", id, self.from_step);
                continue;
            }

            match self
                .confirmer
                .confirm_step(id, ctx.case_folder.as_deref())?
            {
                Decision::Run => {}
                Decision::Skip => {
                    warn!("{} skipped by operator", id);
                    continue;
                }
                Decision::Abort => {
                    warn!("aborted before {}", id);
                    return Err(CasefilesError::Aborted);
                }
            }

            info!("{} starting: {}", id, id.description());
            let started = Instant::now();
            let mut report = step.run(ctx).await?;
            report.duration = started.elapsed();

            step.verify(ctx)?;

            info!(
                "{} done: {} processed, {} errors in {:.2}s",
                id,
                report.processed,
                report.errors.len(),
                report.duration.as_secs_f64()
            );
            for error in &report.errors {
                warn!("{}: {}", id, error);
            }
            ctx.reports.push(report);

            #[cfg(feature = "cli")]
            if let Some(monitor) = &self.monitor {
                monitor.log_step_stats(id.name());
            }
        }

        #[cfg(feature = "cli")]
        if let Some(monitor) = &self.monitor {
            monitor.log_final_stats();
        }
        info!("pipeline complete: {} steps executed", ctx.reports.len());
        Ok(())
    }
}
