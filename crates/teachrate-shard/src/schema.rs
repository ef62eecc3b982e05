//! On-disk layout and the JSON shapes of every published file.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use teachrate_core::types::{AggregatedStats, CollegeId, CommentRecord, CourseId, SourceRowRef, Teacher, TeacherId};

pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SEARCH_INDEX_FILE: &str = "search_index.json";
pub const COURSES_FILE: &str = "courses.json";
pub const COLLEGES_FILE: &str = "colleges.json";
pub const OVERVIEW_FILE: &str = "overview.json";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
pub const SHARDS_DIR: &str = "shards";

/// Shard location relative to the output root, as listed in the manifest.
pub fn shard_relative_path(teacher_id: &str) -> String {
    format!("{SHARDS_DIR}/{teacher_id}.json")
}

pub fn shard_path(root: &Path, teacher_id: &str) -> PathBuf {
    root.join(SHARDS_DIR).join(format!("{teacher_id}.json"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub teacher_id: TeacherId,
    pub name: String,
    pub college: String,
    pub college_id: CollegeId,
    pub shard_path: String,
    pub comment_count: u64,
    pub mean_rating: f64,
    pub stats: AggregatedStats,
}

impl ManifestEntry {
    pub fn from_teacher(teacher: &Teacher) -> Self {
        Self {
            teacher_id: teacher.id.clone(),
            name: teacher.name.clone(),
            college: teacher.college.clone(),
            college_id: teacher.college_id.clone(),
            shard_path: shard_relative_path(&teacher.id),
            comment_count: teacher.comment_count,
            mean_rating: teacher.stats.mean_rating,
            stats: teacher.stats.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dataset_date: Option<String>,
    pub teacher_count: usize,
    pub comment_count: u64,
    pub teachers: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardTeacher {
    pub id: TeacherId,
    pub name: String,
    pub college: String,
    pub college_id: CollegeId,
    pub aliases: BTreeSet<String>,
}

/// A course as taught by the shard's teacher. `stats` covers only this
/// teacher's comments in it, not the course as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardCourse {
    pub id: CourseId,
    pub name: String,
    pub stats: AggregatedStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardComment {
    pub course_id: CourseId,
    pub course_name: String,
    pub semester: String,
    pub rating: f64,
    pub gpa: Option<f64>,
    pub text: String,
    pub likes: Option<u32>,
    pub dislikes: Option<u32>,
    pub net_votes: i64,
    pub source: SourceRowRef,
}

impl From<&CommentRecord> for ShardComment {
    fn from(record: &CommentRecord) -> Self {
        Self {
            course_id: record.course_id.clone(),
            course_name: record.course_name.clone(),
            semester: record.semester.clone(),
            rating: record.rating,
            gpa: record.gpa,
            text: record.text.clone(),
            likes: record.likes,
            dislikes: record.dislikes,
            net_votes: record.net_votes(),
            source: record.source.clone(),
        }
    }
}

/// One teacher's self-contained file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    pub teacher: ShardTeacher,
    pub stats: AggregatedStats,
    pub courses: Vec<ShardCourse>,
    pub comments: Vec<ShardComment>,
}
