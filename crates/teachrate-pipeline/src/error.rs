use thiserror::Error;

use crate::stage::Stage;
use crate::summary::RunSummary;

/// A fatal failure. Nothing was published; `summary` holds whatever was
/// counted before the failing stage.
#[derive(Debug, Error)]
#[error("build failed during {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: teachrate_core::Error,
    pub summary: Box<RunSummary>,
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        self.source.code()
    }
}
