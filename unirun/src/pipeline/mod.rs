//! Table-driven sequential pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ExecutionPlan → Stages → Tasks
//!
//! - ExecutionPlan: ordered stages, run by PipelineExecutor
//! - Stage: named group of tasks, run one after another
//! - Task: atomic unit of work sharing one context
//! ```
//!
//! The first failing task stops the run; later tasks never start.
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineExecutor, Stage};
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let plan = ExecutionPlan::new(vec![
//!     Stage::new("network", vec![Box::new(TaskA)]),
//!     Stage::new("storage", vec![Box::new(TaskB)]),
//! ]);
//!
//! let ctx = Arc::new(Mutex::new(Context::default()));
//! let metrics = PipelineExecutor::execute(plan, ctx).await?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod stage;
mod task;

pub use metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, PipelineExecutor};
pub use stage::Stage;
pub use task::{BoxedTask, PipelineTask};
