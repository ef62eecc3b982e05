//! Row → [`CommentRecord`] normalization.
//!
//! Rows are read through a fixed [`HeaderMap`] resolved once per file from
//! the configured column names; anything not named there is ignored.
use crate::config::{GpaScale, RatingScale, SchemaSettings, Settings};
use crate::ids;
use crate::types::{CommentRecord, Field, RejectReason, SourceRowRef};

/// Column positions of each logical field within one file's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    teacher: Option<usize>,
    college: Option<usize>,
    course: Option<usize>,
    semester: Option<usize>,
    rating: Option<usize>,
    text: Option<usize>,
    gpa: Option<usize>,
    aliases: Vec<usize>,
    likes: Option<usize>,
    dislikes: Option<usize>,
}

impl HeaderMap {
    pub fn resolve<S: AsRef<str>>(headers: &[S], schema: &SchemaSettings) -> Self {
        let cleaned: Vec<String> = headers.iter().map(|h| clean_name(h.as_ref())).collect();
        let find = |column: &str| {
            let wanted = clean_name(column);
            cleaned
                .iter()
                .position(|h| *h == wanted)
                .or_else(|| cleaned.iter().position(|h| h.eq_ignore_ascii_case(&wanted)))
        };
        let find_opt = |column: &Option<String>| column.as_deref().and_then(find);
        Self {
            teacher: find(schema.teacher.as_str()),
            college: find(schema.college.as_str()),
            course: find(schema.course.as_str()),
            semester: find(schema.semester.as_str()),
            rating: find(schema.rating.as_str()),
            text: find(schema.text.as_str()),
            gpa: find_opt(&schema.gpa),
            aliases: schema.aliases.iter().filter_map(|c| find(c.as_str())).collect(),
            likes: find_opt(&schema.likes),
            dislikes: find_opt(&schema.dislikes),
        }
    }

    /// Required fields with no matching column.
    pub fn missing_required(&self) -> Vec<Field> {
        [
            (Field::Teacher, self.teacher),
            (Field::College, self.college),
            (Field::Course, self.course),
            (Field::Rating, self.rating),
            (Field::Text, self.text),
        ]
        .into_iter()
        .filter_map(|(field, idx)| idx.is_none().then_some(field))
        .collect()
    }
}

/// Turns raw field values into validated records, or says why not.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    headers: HeaderMap,
    rating: RatingScale,
    gpa: GpaScale,
}

impl RecordNormalizer {
    pub fn new(headers: HeaderMap, settings: &Settings) -> Self {
        Self { headers, rating: settings.rating, gpa: settings.gpa }
    }

    pub fn normalize<S: AsRef<str>>(&self, values: &[S], source: SourceRowRef) -> Result<CommentRecord, RejectReason> {
        let get = |idx: Option<usize>| field_value(values, idx);
        let required = |field: Field, idx: Option<usize>| {
            let value = get(idx).map(clean_name).unwrap_or_default();
            if value.is_empty() {
                Err(RejectReason::Missing(field))
            } else {
                Ok(value)
            }
        };

        let teacher_name = required(Field::Teacher, self.headers.teacher)?;
        let college = required(Field::College, self.headers.college)?;
        let course_name = required(Field::Course, self.headers.course)?;

        let rating = parse_number(&required(Field::Rating, self.headers.rating)?)
            .ok_or(RejectReason::Unparsable(Field::Rating))?;
        if !self.rating.contains(rating) {
            return Err(RejectReason::OutOfRange(Field::Rating));
        }

        let gpa = match get(self.headers.gpa).map(clean_name).filter(|v| !v.is_empty()) {
            None => None,
            Some(raw) => {
                let gpa = parse_number(&raw).ok_or(RejectReason::Unparsable(Field::Gpa))?;
                if !self.gpa.contains(gpa) {
                    return Err(RejectReason::OutOfRange(Field::Gpa));
                }
                Some(gpa)
            }
        };

        let text = get(self.headers.text).map(clean_text).unwrap_or_default();
        if text.is_empty() {
            return Err(RejectReason::Missing(Field::Text));
        }

        let semester = get(self.headers.semester).map(clean_name).unwrap_or_default();

        let mut aliases: Vec<String> = Vec::new();
        for alias in self.headers.aliases.iter().filter_map(|i| get(Some(*i))).map(clean_name) {
            if !alias.is_empty() && alias != teacher_name && !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        let votes = |idx: Option<usize>| get(idx).and_then(|v| clean_name(v).parse::<u32>().ok());

        Ok(CommentRecord {
            teacher_id: ids::teacher_id(&teacher_name, &college),
            course_id: ids::course_id(&course_name, &college),
            teacher_name,
            college,
            course_name,
            semester,
            rating,
            gpa,
            text,
            aliases,
            likes: votes(self.headers.likes),
            dislikes: votes(self.headers.dislikes),
            source,
        })
    }
}

fn field_value<S: AsRef<str>>(values: &[S], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| values.get(i)).map(|v| v.as_ref())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn strip_artifacts(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\0' | '\u{feff}' | '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}'))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect()
}

/// Single-line fields: artifacts removed, whitespace collapsed.
pub fn clean_name(value: &str) -> String {
    strip_artifacts(value).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comment text: escaped and CRLF newlines become `\n`, then trimmed.
pub fn clean_text(value: &str) -> String {
    strip_artifacts(value)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("\\n", "\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer(headers: &[&str]) -> RecordNormalizer {
        let settings = Settings::default();
        RecordNormalizer::new(HeaderMap::resolve(headers, &settings.schema), &settings)
    }

    fn src() -> SourceRowRef {
        SourceRowRef { file: "a.csv".into(), line: 2 }
    }

    const HEADERS: [&str; 7] = ["\u{feff}teacher", "college", "course", "semester", "rating", "gpa", "comment"];

    #[test]
    fn normalizes_a_clean_row() {
        let n = normalizer(&HEADERS);
        let rec = n
            .normalize(&["  Li   Wei ", "CS", "Algorithms", "2023 Fall", "4", "3.7", "great\\nteacher "], src())
            .expect("valid row");
        assert_eq!(rec.teacher_name, "Li Wei");
        assert_eq!(rec.text, "great\nteacher");
        assert_eq!(rec.gpa, Some(3.7));
        assert_eq!(rec.teacher_id, ids::teacher_id("li wei", "cs"));
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let n = normalizer(&HEADERS);
        let err = n.normalize(&["Li Wei", "CS", "Algorithms", "", "999", "", "hm"], src()).unwrap_err();
        assert_eq!(err, RejectReason::OutOfRange(Field::Rating));
        assert_eq!(err.code(), "out_of_range_rating");
    }

    #[test]
    fn rejects_missing_and_unparsable_fields() {
        let n = normalizer(&HEADERS);
        assert_eq!(
            n.normalize(&["", "CS", "Algorithms", "", "4", "", "x"], src()).unwrap_err(),
            RejectReason::Missing(Field::Teacher)
        );
        assert_eq!(
            n.normalize(&["Li", "CS", "Algorithms", "", "four", "", "x"], src()).unwrap_err(),
            RejectReason::Unparsable(Field::Rating)
        );
        assert_eq!(
            n.normalize(&["Li", "CS", "Algorithms", "", "4", "A+", "x"], src()).unwrap_err(),
            RejectReason::Unparsable(Field::Gpa)
        );
        assert_eq!(
            n.normalize(&["Li", "CS", "Algorithms", "", "4", "", "   "], src()).unwrap_err(),
            RejectReason::Missing(Field::Text)
        );
        // Short row: trailing columns absent.
        assert_eq!(n.normalize(&["Li", "CS"], src()).unwrap_err(), RejectReason::Missing(Field::Course));
    }

    #[test]
    fn empty_gpa_is_absent() {
        let n = normalizer(&HEADERS);
        let rec = n.normalize(&["Li", "CS", "Algorithms", "", "4", " ", "ok"], src()).expect("valid");
        assert_eq!(rec.gpa, None);
    }

    #[test]
    fn missing_columns_are_reported() {
        let settings = Settings::default();
        let map = HeaderMap::resolve(&["teacher", "rating", "extra"], &settings.schema);
        assert_eq!(map.missing_required(), vec![Field::College, Field::Course, Field::Text]);
    }

    #[test]
    fn optional_columns_feed_aliases_and_votes() {
        let mut settings = Settings::default();
        settings.schema.aliases = vec!["pinyin".into(), "abbr".into()];
        settings.schema.likes = Some("likes".into());
        settings.schema.dislikes = Some("dislikes".into());
        let headers = ["teacher", "college", "course", "rating", "comment", "pinyin", "abbr", "likes", "dislikes"];
        let n = RecordNormalizer::new(HeaderMap::resolve(&headers, &settings.schema), &settings);
        let rec = n
            .normalize(&["李伟", "CS", "Algorithms", "5", "好", "li wei", "lw", "7", "n/a"], src())
            .expect("valid");
        assert_eq!(rec.aliases, vec!["li wei".to_string(), "lw".to_string()]);
        assert_eq!(rec.likes, Some(7));
        assert_eq!(rec.dislikes, None);
        assert_eq!(rec.net_votes(), 7);
    }
}
