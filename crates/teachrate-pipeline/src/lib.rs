//! teachrate-pipeline
//!
//! Runs a full build: normalize, deduplicate, aggregate, index, then write
//! and atomically publish. Stages run strictly in order; the first fatal
//! error stops the run and nothing is published.
use std::time::Instant;
use tracing::info;

use teachrate_core::aggregate::aggregate;
use teachrate_core::config::Settings;
use teachrate_core::data_processor::DataProcessor;
use teachrate_core::dedup::deduplicate;
use teachrate_core::error::{Error, Result};
use teachrate_core::traits::{ArtifactWriter, CatalogIndexer};
use teachrate_core::types::BuildArtifacts;
use teachrate_index::IndexBuilder;
use teachrate_shard::schema::RUN_SUMMARY_FILE;
use teachrate_shard::{write_json, JsonShardWriter, StagingArea};

pub mod error;
pub mod stage;
pub mod summary;

pub use error::PipelineError;
pub use stage::Stage;
pub use summary::RunSummary;

pub struct Pipeline<I, W>
where
    I: CatalogIndexer,
    W: ArtifactWriter,
{
    settings: Settings,
    indexer: I,
    writer: W,
    stage: Stage,
    entered: Instant,
}

impl Pipeline<IndexBuilder, JsonShardWriter> {
    /// The standard build: prefix index plus JSON shards.
    pub fn from_settings(settings: Settings) -> Self {
        let indexer = IndexBuilder::new(&settings.index);
        let writer = JsonShardWriter::new(&settings.output);
        Self::new(settings, indexer, writer)
    }
}

impl<I, W> Pipeline<I, W>
where
    I: CatalogIndexer,
    W: ArtifactWriter,
{
    pub fn new(settings: Settings, indexer: I, writer: W) -> Self {
        Self { settings, indexer, writer, stage: Stage::Init, entered: Instant::now() }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Moves to the next stage in the chain. Stages are never skipped.
    fn advance(&mut self) {
        let Some(to) = self.stage.next() else {
            return;
        };
        let elapsed_ms = u64::try_from(self.entered.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(from = %self.stage, to = %to, elapsed_ms, "stage transition");
        self.stage = to;
        self.entered = Instant::now();
    }

    /// Runs every stage once. On success the output directory holds the new
    /// build; on failure it is untouched.
    pub fn run(&mut self) -> std::result::Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::new(self.settings.output.max_diagnostics);
        if self.stage != Stage::Init {
            let reason = format!("pipeline already ran (stage {})", self.stage);
            return Err(self.fail(Error::InvalidConfig(reason), summary));
        }
        if let Err(e) = self.settings.validate() {
            return Err(self.fail(e, summary));
        }

        let outcome = match self.settings.runtime.workers {
            Some(workers) => match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| self.execute(&mut summary)),
                Err(e) => Err(Error::InvalidConfig(format!("cannot start {workers} workers: {e}"))),
            },
            None => self.execute(&mut summary),
        };

        match outcome {
            Ok(()) => Ok(summary),
            Err(e) => Err(self.fail(e, summary)),
        }
    }

    fn fail(&mut self, source: Error, summary: RunSummary) -> PipelineError {
        let stage = self.stage;
        tracing::error!(%stage, code = source.code(), error = %source, "build failed");
        self.stage = Stage::Failed;
        PipelineError { stage, source, summary: Box::new(summary) }
    }

    fn execute(&mut self, summary: &mut RunSummary) -> Result<()> {
        let input = self.settings.input.dir_path();
        let processor = DataProcessor::new(&self.settings);
        // An unreadable input directory fails the run before normalizing starts.
        let files = processor.list_source_files(&input)?;

        self.advance();
        let batch = processor.process_files(&input, &files)?;
        summary.record_normalization(&batch);

        self.advance();
        let deduped = deduplicate(batch.records);
        summary.duplicates_dropped = deduped.duplicates;
        info!(kept = deduped.records.len(), dropped = deduped.duplicates, "deduplication complete");

        self.advance();
        let aggregation = aggregate(deduped.records, &self.settings.rating);
        summary.record_aggregation(&aggregation);

        self.advance();
        let index = self.indexer.build(&aggregation.catalog)?;
        summary.index_tokens = index.token_count();

        self.advance();
        let output = self.settings.output.dir_path();
        let staging = StagingArea::create(&output)?;
        let artifacts = BuildArtifacts {
            catalog: &aggregation.catalog,
            records: &aggregation.records,
            index: &index,
        };
        summary.shards_written = self.writer.write(staging.path(), &artifacts)?;
        write_json(&staging.path().join(RUN_SUMMARY_FILE), &*summary, self.settings.output.pretty)?;
        staging.promote()?;

        self.advance();
        Ok(())
    }
}
