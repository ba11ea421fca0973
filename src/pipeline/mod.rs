//! Analysis pipeline: one request at a time, or a whole directory

pub mod analyze;
pub mod messages;
pub mod orchestrator;

pub use analyze::{AnalysisResult, Analyzer, Verdict};
pub use orchestrator::{dry_run, run, PipelineResult};
