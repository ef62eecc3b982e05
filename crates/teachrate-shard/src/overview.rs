//! Dataset-wide summary for the landing view.
use serde::{Deserialize, Serialize};

use teachrate_core::config::OutputSettings;
use teachrate_core::types::{AggregatedStats, Catalog, CollegeId, Teacher, TeacherId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherSummary {
    pub id: TeacherId,
    pub name: String,
    pub college: String,
    pub comment_count: u64,
    pub mean_rating: f64,
}

impl From<&Teacher> for TeacherSummary {
    fn from(t: &Teacher) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            college: t.college.clone(),
            comment_count: t.comment_count,
            mean_rating: t.stats.mean_rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeSummary {
    pub id: CollegeId,
    pub name: String,
    pub teacher_count: usize,
    pub course_count: usize,
    pub comment_count: u64,
    pub mean_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dataset_date: Option<String>,
    pub teacher_count: usize,
    pub course_count: usize,
    pub college_count: usize,
    pub comment_count: u64,
    pub totals: AggregatedStats,
    /// Colleges by teacher count, largest first.
    pub colleges: Vec<CollegeSummary>,
    pub most_commented: Vec<TeacherSummary>,
    /// Only teachers with at least `min_ratings_for_top` ratings qualify.
    pub top_rated: Vec<TeacherSummary>,
}

pub fn build_overview(catalog: &Catalog, output: &OutputSettings) -> Overview {
    let mut colleges: Vec<CollegeSummary> = catalog
        .colleges
        .values()
        .map(|c| CollegeSummary {
            id: c.id.clone(),
            name: c.name.clone(),
            teacher_count: c.teacher_ids.len(),
            course_count: c.course_ids.len(),
            comment_count: c.stats.count,
            mean_rating: c.stats.mean_rating,
        })
        .collect();
    colleges.sort_by(|a, b| b.teacher_count.cmp(&a.teacher_count).then_with(|| a.id.cmp(&b.id)));

    let mut most_commented: Vec<&Teacher> = catalog.teachers.values().collect();
    most_commented.sort_by(|a, b| b.comment_count.cmp(&a.comment_count).then_with(|| a.id.cmp(&b.id)));

    let mut top_rated: Vec<&Teacher> =
        catalog.teachers.values().filter(|t| t.stats.count >= output.min_ratings_for_top).collect();
    top_rated.sort_by(|a, b| {
        b.stats
            .mean_rating
            .total_cmp(&a.stats.mean_rating)
            .then_with(|| b.comment_count.cmp(&a.comment_count))
            .then_with(|| a.id.cmp(&b.id))
    });

    Overview {
        dataset_date: output.dataset_date.clone(),
        teacher_count: catalog.teachers.len(),
        course_count: catalog.courses.len(),
        college_count: catalog.colleges.len(),
        comment_count: catalog.totals.count,
        totals: catalog.totals.clone(),
        colleges,
        most_commented: most_commented.into_iter().take(output.top_n).map(TeacherSummary::from).collect(),
        top_rated: top_rated.into_iter().take(output.top_n).map(TeacherSummary::from).collect(),
    }
}
