//! Stable entity identities.
//!
//! Ids are the XxHash64 (seed 0) of a domain tag plus the normalized name
//! parts, rendered as 16 lowercase hex digits. Normalization is case- and
//! whitespace-insensitive, so "Li Wei" and "li  wei " share an id.
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::types::{CollegeId, CourseId, TeacherId};

const SEPARATOR: u8 = 0x1f;

/// Lowercase, trim, and collapse whitespace runs to one space.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn hash_parts(tag: &str, parts: &[&str]) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(tag.as_bytes());
    for part in parts {
        hasher.write(&[SEPARATOR]);
        hasher.write(normalize_key(part).as_bytes());
    }
    format!("{:016x}", hasher.finish())
}

pub fn teacher_id(name: &str, college: &str) -> TeacherId {
    hash_parts("teacher", &[name, college])
}

pub fn course_id(course: &str, college: &str) -> CourseId {
    hash_parts("course", &[course, college])
}

pub fn college_id(college: &str) -> CollegeId {
    hash_parts("college", &[college])
}

/// The identity an id was derived from; two different identities under one
/// id is a hash collision.
pub fn identity_key(parts: &[&str]) -> String {
    parts.iter().map(|p| normalize_key(p)).collect::<Vec<_>>().join("\u{1f}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_whitespace_collapse() {
        assert_eq!(teacher_id("Li Wei", "CS"), teacher_id("li wei ", "cs"));
        assert_eq!(teacher_id("Li  Wei", " CS"), teacher_id("LI WEI", "CS"));
        assert_ne!(teacher_id("Li Wei", "CS"), teacher_id("Li Wei", "Math"));
    }

    #[test]
    fn domains_do_not_share_ids() {
        assert_ne!(teacher_id("Algorithms", "CS"), course_id("Algorithms", "CS"));
    }

    #[test]
    fn ids_are_sixteen_hex_digits() {
        let id = college_id("计算机学院");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn part_boundaries_matter() {
        assert_ne!(teacher_id("ab", "c"), teacher_id("a", "bc"));
    }
}
