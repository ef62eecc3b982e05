//! Exact-duplicate removal across overlapping exports.
//!
//! The key is (teacher_id, course_id, semester, BLAKE3 of the normalized
//! text). Only exact matches collapse; a comment differing by one trailing
//! punctuation mark is a different comment.
use std::collections::HashSet;

use crate::types::CommentRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    teacher_id: String,
    course_id: String,
    semester: String,
    text: [u8; 32],
}

impl DedupKey {
    fn of(record: &CommentRecord) -> Self {
        Self {
            teacher_id: record.teacher_id.clone(),
            course_id: record.course_id.clone(),
            semester: record.semester.clone(),
            text: *blake3::hash(record.text.as_bytes()).as_bytes(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
    duplicates: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is seen.
    pub fn admit(&mut self, record: &CommentRecord) -> bool {
        let fresh = self.seen.insert(DedupKey::of(record));
        if !fresh {
            self.duplicates += 1;
        }
        fresh
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    pub records: Vec<CommentRecord>,
    pub duplicates: u64,
}

/// Keeps the first occurrence of each key, preserving input order.
pub fn deduplicate(records: Vec<CommentRecord>) -> Deduplicated {
    let mut dedup = Deduplicator::new();
    let records: Vec<CommentRecord> = records.into_iter().filter(|r| dedup.admit(r)).collect();
    Deduplicated { records, duplicates: dedup.duplicates() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceRowRef;

    fn rec(text: &str, line: u64) -> CommentRecord {
        CommentRecord {
            teacher_id: "t".into(),
            teacher_name: "Li Wei".into(),
            college: "CS".into(),
            course_id: "c".into(),
            course_name: "Algorithms".into(),
            semester: "2023".into(),
            rating: 4.0,
            gpa: None,
            text: text.into(),
            aliases: Vec::new(),
            likes: None,
            dislikes: None,
            source: SourceRowRef { file: "a.csv".into(), line },
        }
    }

    #[test]
    fn drops_exact_duplicates_keeping_first() {
        let out = deduplicate(vec![rec("good", 2), rec("good", 3), rec("fine", 4)]);
        assert_eq!(out.duplicates, 1);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].source.line, 2);
        assert_eq!(out.records[1].text, "fine");
    }

    #[test]
    fn near_duplicates_survive() {
        let out = deduplicate(vec![rec("good", 2), rec("good.", 3), rec("Good", 4)]);
        assert_eq!(out.duplicates, 0);
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn semester_is_part_of_the_key() {
        let mut later = rec("good", 3);
        later.semester = "2024".into();
        let out = deduplicate(vec![rec("good", 2), later]);
        assert_eq!(out.records.len(), 2);
    }
}
