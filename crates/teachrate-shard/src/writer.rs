use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use teachrate_core::config::OutputSettings;
use teachrate_core::error::{Error, Result};
use teachrate_core::traits::ArtifactWriter;
use teachrate_core::types::{BuildArtifacts, Catalog, College, CommentRecord, Course, Teacher};

use crate::overview::build_overview;
use crate::schema::{
    shard_path, Manifest, ManifestEntry, Shard, ShardComment, ShardCourse, ShardTeacher, COLLEGES_FILE, COURSES_FILE,
    FORMAT_VERSION, MANIFEST_FILE, OVERVIEW_FILE, SEARCH_INDEX_FILE, SHARDS_DIR,
};
use crate::staging::write_json;

/// Writes one JSON shard per teacher plus the manifest, search index and
/// catalog files.
#[derive(Debug, Clone)]
pub struct JsonShardWriter {
    output: OutputSettings,
}

impl JsonShardWriter {
    pub fn new(output: &OutputSettings) -> Self {
        Self { output: output.clone() }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.output.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} shards ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

/// Accepted records grouped by teacher, each group in input order.
pub fn group_by_teacher(records: &[CommentRecord]) -> BTreeMap<&str, Vec<&CommentRecord>> {
    let mut groups: BTreeMap<&str, Vec<&CommentRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.teacher_id.as_str()).or_default().push(record);
    }
    groups
}

/// Comments ordered by net votes, highest first; ties keep input order.
pub fn build_shard(teacher: &Teacher, records: &[&CommentRecord], catalog: &Catalog) -> Shard {
    let mut comments: Vec<ShardComment> = records.iter().map(|r| ShardComment::from(*r)).collect();
    comments.sort_by(|a, b| b.net_votes.cmp(&a.net_votes));

    let courses = teacher
        .course_stats
        .iter()
        .filter_map(|(id, stats)| catalog.courses.get(id).map(|c| (c, stats)))
        .map(|(c, stats)| ShardCourse { id: c.id.clone(), name: c.name.clone(), stats: stats.clone() })
        .collect();

    Shard {
        teacher: ShardTeacher {
            id: teacher.id.clone(),
            name: teacher.name.clone(),
            college: teacher.college.clone(),
            college_id: teacher.college_id.clone(),
            aliases: teacher.aliases.clone(),
        },
        stats: teacher.stats.clone(),
        courses,
        comments,
    }
}

pub fn build_manifest(catalog: &Catalog, dataset_date: Option<String>) -> Manifest {
    Manifest {
        version: FORMAT_VERSION,
        dataset_date,
        teacher_count: catalog.teachers.len(),
        comment_count: catalog.teachers.values().map(|t| t.comment_count).sum(),
        teachers: catalog.teachers.values().map(ManifestEntry::from_teacher).collect(),
    }
}

impl ArtifactWriter for JsonShardWriter {
    fn write(&self, dir: &Path, artifacts: &BuildArtifacts<'_>) -> Result<usize> {
        let catalog = artifacts.catalog;
        let pretty = self.output.pretty;
        let shards_dir = dir.join(SHARDS_DIR);
        fs::create_dir_all(&shards_dir).map_err(|e| Error::write_failure(&shards_dir, e))?;

        let groups = group_by_teacher(artifacts.records);
        let teachers: Vec<&Teacher> = catalog.teachers.values().collect();
        let pb = self.progress_bar(teachers.len());
        teachers.par_iter().try_for_each(|teacher| -> Result<()> {
            let records = groups.get(teacher.id.as_str()).map_or(&[][..], Vec::as_slice);
            let shard = build_shard(teacher, records, catalog);
            write_json(&shard_path(dir, &teacher.id), &shard, pretty)?;
            pb.inc(1);
            Ok(())
        })?;
        pb.finish_and_clear();
        debug!(shards = teachers.len(), dir = %shards_dir.display(), "shards written");

        write_json(&dir.join(MANIFEST_FILE), &build_manifest(catalog, self.output.dataset_date.clone()), pretty)?;
        write_json(&dir.join(SEARCH_INDEX_FILE), artifacts.index, pretty)?;
        let courses: Vec<&Course> = catalog.courses.values().collect();
        write_json(&dir.join(COURSES_FILE), &courses, pretty)?;
        let colleges: Vec<&College> = catalog.colleges.values().collect();
        write_json(&dir.join(COLLEGES_FILE), &colleges, pretty)?;
        write_json(&dir.join(OVERVIEW_FILE), &build_overview(catalog, &self.output), pretty)?;

        info!(shards = teachers.len(), tokens = artifacts.index.token_count(), "artifacts written");
        Ok(teachers.len())
    }
}
