//! Domain types shared by every stage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type TeacherId = String;
pub type CourseId = String;
pub type CollegeId = String;

/// Where a record came from: path relative to the input directory and the
/// 1-based CSV line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRowRef {
    pub file: String,
    pub line: u64,
}

impl fmt::Display for SourceRowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One validated evaluation comment. Immutable once the normalizer hands it
/// out; `teacher_id`/`course_id` are derived from the name and college.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub college: String,
    pub course_id: CourseId,
    pub course_name: String,
    pub semester: String,
    pub rating: f64,
    pub gpa: Option<f64>,
    pub text: String,
    pub aliases: Vec<String>,
    pub likes: Option<u32>,
    pub dislikes: Option<u32>,
    pub source: SourceRowRef,
}

impl CommentRecord {
    pub fn net_votes(&self) -> i64 {
        i64::from(self.likes.unwrap_or(0)) - i64::from(self.dislikes.unwrap_or(0))
    }
}

/// Logical input fields, named in reject codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Teacher,
    College,
    Course,
    Rating,
    Gpa,
    Text,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::College => "college",
            Self::Course => "course",
            Self::Rating => "rating",
            Self::Gpa => "gpa",
            Self::Text => "text",
        }
    }
}

/// Why the normalizer refused a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Missing(Field),
    Unparsable(Field),
    OutOfRange(Field),
    UnreadableRow,
}

impl RejectReason {
    pub fn code(&self) -> String {
        match self {
            Self::Missing(f) => format!("missing_{}", f.as_str()),
            Self::Unparsable(f) => format!("unparsable_{}", f.as_str()),
            Self::OutOfRange(f) => format!("out_of_range_{}", f.as_str()),
            Self::UnreadableRow => "unreadable_row".to_string(),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Teacher,
    Course,
    College,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Course => "course",
            Self::College => "college",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the aggregator could not resolve a record to its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyReason {
    EmptyId(EntityKind),
    IdMismatch(EntityKind),
    IdCollision(EntityKind),
}

impl AnomalyReason {
    pub fn code(&self) -> String {
        match self {
            Self::EmptyId(k) => format!("empty_{k}_id"),
            Self::IdMismatch(k) => format!("{k}_id_mismatch"),
            Self::IdCollision(k) => format!("{k}_id_collision"),
        }
    }
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Recovered, row-level problems surfaced in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    MalformedRecord { source: SourceRowRef, reason: String },
    AggregationAnomaly { source: SourceRowRef, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord { source, reason } => write!(f, "malformed record at {source}: {reason}"),
            Self::AggregationAnomaly { source, reason } => write!(f, "aggregation anomaly at {source}: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpaSummary {
    pub count: u64,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
}

/// Derived summary of a set of ratings. Recomputable from the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub count: u64,
    pub rating_histogram: Vec<u64>,
    pub mean_rating: f64,
    pub rating_stddev: f64,
    pub gpa: GpaSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub college: String,
    pub college_id: CollegeId,
    pub aliases: BTreeSet<String>,
    pub course_ids: BTreeSet<CourseId>,
    pub comment_count: u64,
    pub stats: AggregatedStats,
    /// This teacher's ratings and GPAs in each course they teach.
    pub course_stats: BTreeMap<CourseId, AggregatedStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub college: String,
    pub college_id: CollegeId,
    pub teacher_ids: BTreeSet<TeacherId>,
    pub stats: AggregatedStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct College {
    pub id: CollegeId,
    pub name: String,
    pub teacher_ids: BTreeSet<TeacherId>,
    pub course_ids: BTreeSet<CourseId>,
    pub stats: AggregatedStats,
}

/// The finalized entity set. Ordered maps keep every output reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub teachers: BTreeMap<TeacherId, Teacher>,
    pub courses: BTreeMap<CourseId, Course>,
    pub colleges: BTreeMap<CollegeId, College>,
    pub totals: AggregatedStats,
}

/// A typed pointer into the catalog, as stored in the search index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    /// `kind:id`, used as the key of the index label table.
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

/// Display data for a search hit, so clients need no second fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLabel {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub college: Option<String>,
    /// Normalized forms of the name and any aliases.
    pub terms: Vec<String>,
}

/// Token → entity set lookup, plus the label table for every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub min_prefix: usize,
    pub max_prefix: usize,
    pub entities: BTreeMap<String, EntityLabel>,
    pub tokens: BTreeMap<String, BTreeSet<EntityRef>>,
}

impl SearchIndex {
    pub fn label(&self, entity: &EntityRef) -> Option<&EntityLabel> {
        self.entities.get(&entity.key())
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Everything a writer needs to publish one build.
pub struct BuildArtifacts<'a> {
    pub catalog: &'a Catalog,
    pub records: &'a [CommentRecord],
    pub index: &'a SearchIndex,
}
