//! Pipeline executor.

use super::metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
use super::stage::Stage;
use super::task::BoxedTask;
use std::time::Instant;
use unirun_shared::errors::UnirunResult;

pub struct ExecutionPlan<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }

    /// Task names in execution order.
    pub fn task_names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter().map(|task| task.name()))
            .collect()
    }

    pub fn stages(self) -> Vec<Stage<BoxedTask<Ctx>>> {
        self.stages
    }
}

pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run every stage and task of `plan` in order.
    ///
    /// Returns at the first task error, which is passed through unchanged.
    pub async fn execute<Ctx>(plan: ExecutionPlan<Ctx>, ctx: Ctx) -> UnirunResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut stage_metrics = Vec::new();

        for (index, stage) in plan.stages().into_iter().enumerate() {
            let stage_start = Instant::now();
            let mut task_metrics = Vec::with_capacity(stage.tasks.len());

            for task in stage.tasks {
                let name = task.name().to_string();
                let task_start = Instant::now();
                task.run(ctx.clone()).await?;

                let duration_ms = task_start.elapsed().as_millis();
                tracing::debug!(stage = stage.name, task = %name, duration_ms = duration_ms as u64, "Task complete");
                task_metrics.push(TaskMetrics { name, duration_ms });
            }

            stage_metrics.push(StageMetrics {
                index,
                name: stage.name,
                duration_ms: stage_start.elapsed().as_millis(),
                tasks: task_metrics,
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            stages: stage_metrics,
        })
    }
}
