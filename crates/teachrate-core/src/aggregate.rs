//! Folds deduplicated records into teacher, course and college entities.
//!
//! Entities are created on first sighting and their stats updated record by
//! record. A record that cannot be resolved to its entities is excluded and
//! reported as an anomaly; it never fails the run.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

use crate::config::RatingScale;
use crate::ids;
use crate::stats::StatsAccumulator;
use crate::types::{
    AnomalyReason, Catalog, College, CollegeId, CommentRecord, Course, CourseId, Diagnostic, EntityKind, SourceRowRef,
    Teacher, TeacherId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub source: SourceRowRef,
    pub reason: AnomalyReason,
}

impl Anomaly {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::AggregationAnomaly { source: self.source.clone(), reason: self.reason.code() }
    }
}

#[derive(Debug, Clone)]
struct TeacherAcc {
    identity: String,
    name: String,
    college: String,
    college_id: CollegeId,
    aliases: BTreeSet<String>,
    courses: BTreeMap<CourseId, StatsAccumulator>,
    stats: StatsAccumulator,
}

#[derive(Debug, Clone)]
struct CourseAcc {
    identity: String,
    name: String,
    college: String,
    college_id: CollegeId,
    teacher_ids: BTreeSet<TeacherId>,
    stats: StatsAccumulator,
}

#[derive(Debug, Clone)]
struct CollegeAcc {
    identity: String,
    name: String,
    teacher_ids: BTreeSet<TeacherId>,
    course_ids: BTreeSet<CourseId>,
    stats: StatsAccumulator,
}

/// Result of the aggregation stage. `records` holds exactly the records
/// folded into the catalog, in input order.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub catalog: Catalog,
    pub records: Vec<CommentRecord>,
    pub anomalies: Vec<Anomaly>,
}

pub struct Aggregator {
    scale: RatingScale,
    teachers: HashMap<TeacherId, TeacherAcc>,
    courses: HashMap<CourseId, CourseAcc>,
    colleges: HashMap<CollegeId, CollegeAcc>,
    accepted: Vec<CommentRecord>,
    anomalies: Vec<Anomaly>,
}

impl Aggregator {
    pub fn new(scale: &RatingScale) -> Self {
        Self {
            scale: *scale,
            teachers: HashMap::new(),
            courses: HashMap::new(),
            colleges: HashMap::new(),
            accepted: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    fn resolve(&self, record: &CommentRecord) -> Result<CollegeId, AnomalyReason> {
        use AnomalyReason::{EmptyId, IdCollision, IdMismatch};

        if record.teacher_id.is_empty() {
            return Err(EmptyId(EntityKind::Teacher));
        }
        if record.course_id.is_empty() {
            return Err(EmptyId(EntityKind::Course));
        }
        if record.teacher_id != ids::teacher_id(&record.teacher_name, &record.college) {
            return Err(IdMismatch(EntityKind::Teacher));
        }
        if record.course_id != ids::course_id(&record.course_name, &record.college) {
            return Err(IdMismatch(EntityKind::Course));
        }

        let teacher_identity = ids::identity_key(&[record.teacher_name.as_str(), record.college.as_str()]);
        if self.teachers.get(&record.teacher_id).is_some_and(|t| t.identity != teacher_identity) {
            return Err(IdCollision(EntityKind::Teacher));
        }
        let course_identity = ids::identity_key(&[record.course_name.as_str(), record.college.as_str()]);
        if self.courses.get(&record.course_id).is_some_and(|c| c.identity != course_identity) {
            return Err(IdCollision(EntityKind::Course));
        }
        let college_id = ids::college_id(&record.college);
        let college_identity = ids::identity_key(&[record.college.as_str()]);
        if self.colleges.get(&college_id).is_some_and(|c| c.identity != college_identity) {
            return Err(IdCollision(EntityKind::College));
        }
        Ok(college_id)
    }

    /// Folds one record. Returns `false` when it was excluded as an anomaly.
    pub fn fold(&mut self, record: CommentRecord) -> bool {
        let college_id = match self.resolve(&record) {
            Ok(id) => id,
            Err(reason) => {
                warn!(source = %record.source, %reason, "aggregation anomaly");
                self.anomalies.push(Anomaly { source: record.source, reason });
                return false;
            }
        };
        let scale = self.scale;

        let teacher = self.teachers.entry(record.teacher_id.clone()).or_insert_with(|| TeacherAcc {
            identity: ids::identity_key(&[record.teacher_name.as_str(), record.college.as_str()]),
            name: record.teacher_name.clone(),
            college: record.college.clone(),
            college_id: college_id.clone(),
            aliases: BTreeSet::new(),
            courses: BTreeMap::new(),
            stats: StatsAccumulator::new(&scale),
        });
        teacher.stats.push(&scale, record.rating, record.gpa);
        teacher
            .courses
            .entry(record.course_id.clone())
            .or_insert_with(|| StatsAccumulator::new(&scale))
            .push(&scale, record.rating, record.gpa);
        teacher.aliases.extend(record.aliases.iter().cloned());

        let course = self.courses.entry(record.course_id.clone()).or_insert_with(|| CourseAcc {
            identity: ids::identity_key(&[record.course_name.as_str(), record.college.as_str()]),
            name: record.course_name.clone(),
            college: record.college.clone(),
            college_id: college_id.clone(),
            teacher_ids: BTreeSet::new(),
            stats: StatsAccumulator::new(&scale),
        });
        course.stats.push(&scale, record.rating, record.gpa);
        course.teacher_ids.insert(record.teacher_id.clone());

        let college = self.colleges.entry(college_id).or_insert_with(|| CollegeAcc {
            identity: ids::identity_key(&[record.college.as_str()]),
            name: record.college.clone(),
            teacher_ids: BTreeSet::new(),
            course_ids: BTreeSet::new(),
            stats: StatsAccumulator::new(&scale),
        });
        college.stats.push(&scale, record.rating, record.gpa);
        college.teacher_ids.insert(record.teacher_id.clone());
        college.course_ids.insert(record.course_id.clone());

        self.accepted.push(record);
        true
    }

    pub fn finish(self) -> Aggregation {
        let teachers: BTreeMap<TeacherId, Teacher> = self
            .teachers
            .into_iter()
            .map(|(id, acc)| {
                let teacher = Teacher {
                    id: id.clone(),
                    name: acc.name,
                    college: acc.college,
                    college_id: acc.college_id,
                    aliases: acc.aliases,
                    course_ids: acc.courses.keys().cloned().collect(),
                    comment_count: acc.stats.count(),
                    stats: acc.stats.snapshot(),
                    course_stats: acc.courses.iter().map(|(id, stats)| (id.clone(), stats.snapshot())).collect(),
                };
                (id, teacher)
            })
            .collect();

        let courses: BTreeMap<CourseId, Course> = self
            .courses
            .into_iter()
            .map(|(id, acc)| {
                let course = Course {
                    id: id.clone(),
                    name: acc.name,
                    college: acc.college,
                    college_id: acc.college_id,
                    teacher_ids: acc.teacher_ids,
                    stats: acc.stats.snapshot(),
                };
                (id, course)
            })
            .collect();

        // Totals merge the per-college partials in id order.
        let college_accs: BTreeMap<CollegeId, CollegeAcc> = self.colleges.into_iter().collect();
        let mut totals = StatsAccumulator::new(&self.scale);
        for acc in college_accs.values() {
            totals.merge(&acc.stats);
        }
        let colleges: BTreeMap<CollegeId, College> = college_accs
            .into_iter()
            .map(|(id, acc)| {
                let college = College {
                    id: id.clone(),
                    name: acc.name,
                    teacher_ids: acc.teacher_ids,
                    course_ids: acc.course_ids,
                    stats: acc.stats.snapshot(),
                };
                (id, college)
            })
            .collect();

        info!(
            teachers = teachers.len(),
            courses = courses.len(),
            colleges = colleges.len(),
            records = self.accepted.len(),
            anomalies = self.anomalies.len(),
            "aggregation complete"
        );
        Aggregation {
            catalog: Catalog { teachers, courses, colleges, totals: totals.snapshot() },
            records: self.accepted,
            anomalies: self.anomalies,
        }
    }
}

/// Single-threaded fold over the whole record stream.
pub fn aggregate(records: Vec<CommentRecord>, scale: &RatingScale) -> Aggregation {
    let mut aggregator = Aggregator::new(scale);
    for record in records {
        aggregator.fold(record);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(teacher: &str, course: &str, rating: f64, line: u64) -> CommentRecord {
        CommentRecord {
            teacher_id: ids::teacher_id(teacher, "CS"),
            teacher_name: teacher.into(),
            college: "CS".into(),
            course_id: ids::course_id(course, "CS"),
            course_name: course.into(),
            semester: String::new(),
            rating,
            gpa: None,
            text: format!("comment {line}"),
            aliases: Vec::new(),
            likes: None,
            dislikes: None,
            source: SourceRowRef { file: "a.csv".into(), line },
        }
    }

    #[test]
    fn colliding_identities_are_excluded() {
        let mut aggregator = Aggregator::new(&RatingScale::default());
        assert!(aggregator.fold(record("Li Wei", "Algorithms", 4.0, 2)));

        // Stand in for a hash collision: the stored entity claims another identity.
        let teacher_id = ids::teacher_id("Li Wei", "CS");
        if let Some(teacher) = aggregator.teachers.get_mut(&teacher_id) {
            teacher.identity = ids::identity_key(&["Wang Fang", "CS"]);
        }
        assert!(!aggregator.fold(record("Li Wei", "Algorithms", 5.0, 3)));

        let course_id = ids::course_id("Compilers", "CS");
        assert!(aggregator.fold(record("Zhang San", "Compilers", 3.0, 4)));
        if let Some(course) = aggregator.courses.get_mut(&course_id) {
            course.identity = ids::identity_key(&["Operating Systems", "CS"]);
        }
        assert!(!aggregator.fold(record("Zhang San", "Compilers", 2.0, 5)));

        let agg = aggregator.finish();
        let reasons: Vec<String> = agg.anomalies.iter().map(|a| a.reason.code()).collect();
        assert_eq!(reasons, vec!["teacher_id_collision", "course_id_collision"]);
        assert_eq!(agg.anomalies[0].source.line, 3);
        assert_eq!(agg.records.len(), 2);
        assert_eq!(agg.catalog.teachers[&teacher_id].comment_count, 1);
        assert_eq!(agg.catalog.courses[&course_id].stats.count, 1);
        assert_eq!(agg.catalog.totals.count, 2);
    }

    #[test]
    fn per_course_stats_split_a_teachers_ratings() {
        let mut aggregator = Aggregator::new(&RatingScale::default());
        aggregator.fold(record("Li Wei", "Algorithms", 4.0, 2));
        aggregator.fold(record("Li Wei", "Algorithms", 2.0, 3));
        aggregator.fold(record("Li Wei", "Compilers", 5.0, 4));

        let catalog = aggregator.finish().catalog;
        let teacher = &catalog.teachers[&ids::teacher_id("Li Wei", "CS")];
        assert_eq!(teacher.course_ids.len(), 2);
        let algorithms = &teacher.course_stats[&ids::course_id("Algorithms", "CS")];
        assert_eq!(algorithms.count, 2);
        assert!((algorithms.mean_rating - 3.0).abs() < 1e-9);
        assert_eq!(teacher.course_stats[&ids::course_id("Compilers", "CS")].count, 1);
    }
}
