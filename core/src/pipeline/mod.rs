// larder/src/pipeline/mod.rs

//! A small step-pipeline engine: named steps, async handlers, early stop,
//! skip conditions, and per-run cancellation through `Invocation`.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
