// larder/src/pipeline/execution.rs

//! `Pipeline::run()`: executes the steps and their handlers in order.

use crate::error::PipelineError;
use crate::invocation::Invocation;
use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::{PipelineControl, PipelineResult};
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, instrument, Instrument, Level};

enum PhaseOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx_data`.
  ///
  /// The invocation is checked before each step; once it is cancelled or past
  /// its deadline the run ends with `PipelineError::Cancelled`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_context_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>, invocation: Invocation) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if invocation.is_cancelled() {
        event!(Level::WARN, step_name, "Invocation cancelled; abandoning run.");
        return Err(Err::from(PipelineError::Cancelled {
          step_name: step_def.name.clone(),
        }));
      }

      if let Some(skip_cond) = &step_def.skip_if {
        if skip_cond(&ctx_data) {
          event!(Level::DEBUG, step_name, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let on_handlers = self.on.get(step_name).filter(|v| !v.is_empty());
      let after_handlers = self.after.get(step_name).filter(|v| !v.is_empty());

      if on_handlers.is_none() && after_handlers.is_none() {
        if step_def.optional {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name, "Non-optional step has no handlers.");
        return Err(Err::from(PipelineError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = tracing::info_span!("pipeline_step", step_name, step_index = step_idx);
      let outcome = async {
        for handlers in [on_handlers, after_handlers].into_iter().flatten() {
          match Self::run_phase(handlers, &ctx_data, &invocation).await {
            PhaseOutcome::Continue => {}
            other => return other,
          }
        }
        PhaseOutcome::Continue
      }
      .instrument(step_span)
      .await;

      match outcome {
        PhaseOutcome::Continue => {}
        PhaseOutcome::Stop => {
          event!(Level::INFO, step_name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped {
            step: step_def.name.clone(),
          });
        }
        PhaseOutcome::Failed(e) => {
          event!(Level::ERROR, step_name, error = %e, "Step handler failed.");
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(PipelineResult::Completed)
  }

  async fn run_phase(
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
    invocation: &Invocation,
  ) -> PhaseOutcome<Err> {
    for handler_fn in handlers {
      match handler_fn(ctx_data.clone(), invocation.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return PhaseOutcome::Stop,
        Err(e) => return PhaseOutcome::Failed(e),
      }
    }
    PhaseOutcome::Continue
  }
}
