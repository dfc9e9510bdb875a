// Data processing pipeline: the processing stages and the runner that chains them

pub mod processing;
pub mod runner;

pub use runner::{OutputTarget, Pipeline, PipelineOutcome, PipelineReport, ValidationSummary};
