use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::normalize::{HeaderMap, RecordNormalizer};
use crate::types::{CommentRecord, Diagnostic, RejectReason, SourceRowRef};

/// A row the normalizer refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub source: SourceRowRef,
    pub reason: RejectReason,
}

impl Rejection {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::MalformedRecord { source: self.source.clone(), reason: self.reason.code() }
    }
}

/// Normalization output for one source file.
#[derive(Debug, Clone, Default)]
pub struct FileBatch {
    pub file: String,
    pub rows_read: u64,
    pub records: Vec<CommentRecord>,
    pub rejections: Vec<Rejection>,
}

/// All files merged in discovery order.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub files: usize,
    pub rows_read: u64,
    pub records: Vec<CommentRecord>,
    pub rejections: Vec<Rejection>,
}

impl NormalizedBatch {
    fn absorb(&mut self, batch: FileBatch) {
        self.files += 1;
        self.rows_read += batch.rows_read;
        self.records.extend(batch.records);
        self.rejections.extend(batch.rejections);
    }
}

/// Discovers CSV exports under a directory and normalizes every row.
pub struct DataProcessor {
    settings: Settings,
}

impl DataProcessor {
    pub fn new(settings: &Settings) -> Self {
        Self { settings: settings.clone() }
    }

    /// Discovers and normalizes every source file under `data_dir`.
    pub fn process_directory(&self, data_dir: &Path) -> Result<NormalizedBatch> {
        let files = self.list_source_files(data_dir)?;
        self.process_files(data_dir, &files)
    }

    /// Normalizes already discovered files. They are processed in parallel
    /// and merged back in the order given, so the result is deterministic.
    pub fn process_files(&self, data_dir: &Path, files: &[PathBuf]) -> Result<NormalizedBatch> {
        let batches = files
            .par_iter()
            .map(|path| self.process_file(data_dir, path))
            .collect::<Result<Vec<_>>>()?;

        let mut merged = NormalizedBatch::default();
        for batch in batches {
            debug!(
                file = %batch.file,
                rows = batch.rows_read,
                accepted = batch.records.len(),
                rejected = batch.rejections.len(),
                "normalized file"
            );
            merged.absorb(batch);
        }
        info!(
            rows = merged.rows_read,
            accepted = merged.records.len(),
            rejected = merged.rejections.len(),
            "normalization complete"
        );
        Ok(merged)
    }

    pub fn process_file(&self, data_dir: &Path, file_path: &Path) -> Result<FileBatch> {
        let delimiter = self.settings.input.delimiter_byte()?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(file_path)
            .map_err(|e| Error::source_unavailable(file_path, e))?;

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| Error::source_unavailable(file_path, e))?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        let header_map = HeaderMap::resolve(&headers, &self.settings.schema);
        let missing = header_map.missing_required();
        if !missing.is_empty() {
            warn!(file = %file_path.display(), ?missing, "required columns not found; every row will be rejected");
        }
        let normalizer = RecordNormalizer::new(header_map, &self.settings);

        let file = relative_name(data_dir, file_path);
        let mut batch = FileBatch { file: file.clone(), ..FileBatch::default() };
        for row in reader.byte_records() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(Error::source_unavailable(file_path, e)),
                Err(e) => {
                    let line = e.position().map_or(0, csv::Position::line);
                    batch.rows_read += 1;
                    batch.rejections.push(Rejection {
                        source: SourceRowRef { file: file.clone(), line },
                        reason: RejectReason::UnreadableRow,
                    });
                    continue;
                }
            };
            let values: Vec<String> = row.iter().map(|v| String::from_utf8_lossy(v).into_owned()).collect();
            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            batch.rows_read += 1;
            let source = SourceRowRef { file: file.clone(), line: row.position().map_or(0, csv::Position::line) };
            match normalizer.normalize(&values, source.clone()) {
                Ok(record) => batch.records.push(record),
                Err(reason) => batch.rejections.push(Rejection { source, reason }),
            }
        }
        Ok(batch)
    }

    /// Sorted list of files with the configured extension. An absent or
    /// empty input directory is fatal.
    pub fn list_source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::source_unavailable(root, "input directory does not exist"));
        }
        if !root.is_dir() {
            return Err(Error::source_unavailable(root, "input path is not a directory"));
        }
        let wanted = self.settings.input.extension.trim_start_matches('.').to_ascii_lowercase();
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| Error::source_unavailable(root, e))?;
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&wanted));
            if entry.file_type().is_file() && matches {
                files.push(path.to_path_buf());
            }
        }
        if files.is_empty() {
            return Err(Error::source_unavailable(root, format!("no .{wanted} files found")));
        }
        files.sort();
        info!(files = files.len(), dir = %root.display(), "discovered source files");
        Ok(files)
    }
}

fn relative_name(data_dir: &Path, file_path: &Path) -> String {
    let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
