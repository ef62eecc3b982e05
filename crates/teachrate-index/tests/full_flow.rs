use tempfile::TempDir;

use teachrate_core::aggregate::aggregate;
use teachrate_core::config::{IndexSettings, RatingScale};
use teachrate_core::ids;
use teachrate_core::traits::CatalogIndexer;
use teachrate_core::types::{Catalog, CommentRecord, EntityKind, EntityRef, SourceRowRef};
use teachrate_index::tokenizer::NameNormalizer;
use teachrate_index::{IndexBuilder, IndexSearcher};

fn rec(teacher: &str, college: &str, course: &str, aliases: &[&str]) -> CommentRecord {
    CommentRecord {
        teacher_id: ids::teacher_id(teacher, college),
        teacher_name: teacher.into(),
        college: college.into(),
        course_id: ids::course_id(course, college),
        course_name: course.into(),
        semester: "2023".into(),
        rating: 4.0,
        gpa: None,
        text: format!("{teacher} teaches {course}"),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        likes: None,
        dislikes: None,
        source: SourceRowRef { file: "a.csv".into(), line: 2 },
    }
}

fn catalog() -> Catalog {
    let records = vec![
        rec("Li Wei", "Computer Science", "Algorithms", &["liwei", "lw"]),
        rec("Li Wen", "Mathematics", "Linear Algebra", &[]),
        rec("王小明", "物理学院", "力学", &[]),
        rec("Zoë Maximiliana Vandersloot", "Computer Science", "Compilers", &[]),
    ];
    aggregate(records, &RatingScale::default()).catalog
}

fn teacher(name: &str, college: &str) -> EntityRef {
    EntityRef::new(EntityKind::Teacher, ids::teacher_id(name, college))
}

#[test]
fn every_bounded_prefix_finds_the_teacher() {
    let settings = IndexSettings::default();
    let index = IndexBuilder::new(&settings).build(&catalog()).expect("build");
    let mut searcher = IndexSearcher::new(index);
    let mut normalizer = NameNormalizer::new();

    let teachers = [
        ("Li Wei", "Computer Science"),
        ("王小明", "物理学院"),
        ("Zoë Maximiliana Vandersloot", "Computer Science"),
    ];
    for (name, college) in teachers {
        let target = teacher(name, college);
        let normalized: Vec<char> = normalizer.normalize(name).chars().collect();
        let upper = settings.max_prefix.min(normalized.len());
        for len in settings.min_prefix..=upper {
            let prefix: String = normalized[..len].iter().collect();
            assert!(searcher.lookup(&prefix).contains(&target), "{prefix:?} misses {name}");
        }
        assert!(searcher.lookup(name).contains(&target), "full name misses {name}");
    }
}

#[test]
fn shared_prefixes_keep_every_entity() {
    let index = IndexBuilder::new(&IndexSettings::default()).build(&catalog()).expect("build");
    let li = &index.tokens["li"];
    assert!(li.contains(&teacher("Li Wei", "Computer Science")));
    assert!(li.contains(&teacher("Li Wen", "Mathematics")));
    // "Linear Algebra" also starts with "li".
    assert!(li.contains(&EntityRef::new(EntityKind::Course, ids::course_id("Linear Algebra", "Mathematics"))));
}

#[test]
fn later_words_and_aliases_are_searchable() {
    let index = IndexBuilder::new(&IndexSettings::default()).build(&catalog()).expect("build");
    let mut searcher = IndexSearcher::new(index);
    let li_wei = teacher("Li Wei", "Computer Science");

    assert!(searcher.lookup("wei").contains(&li_wei));
    assert!(searcher.lookup("LIWEI").contains(&li_wei));
    assert!(searcher.lookup("lw").contains(&li_wei));
    assert!(searcher.lookup("小明").contains(&teacher("王小明", "物理学院")));
    assert!(searcher.lookup("zoe").contains(&teacher("Zoë Maximiliana Vandersloot", "Computer Science")));
}

#[test]
fn long_queries_go_through_the_bounded_prefix() {
    let index = IndexBuilder::new(&IndexSettings::default()).build(&catalog()).expect("build");
    let mut searcher = IndexSearcher::new(index);
    let zoe = teacher("Zoë Maximiliana Vandersloot", "Computer Science");

    assert!(searcher.lookup("maximiliana vander").contains(&zoe));
    assert!(searcher.lookup("maximiliana vanderbilt").is_empty());
    assert!(searcher.lookup("").is_empty());
}

#[test]
fn search_ranks_exact_matches_first() {
    let index = IndexBuilder::new(&IndexSettings::default()).build(&catalog()).expect("build");
    let mut searcher = IndexSearcher::new(index);

    let hits = searcher.search("li wen", 10);
    assert_eq!(hits[0].label.name, "Li Wen");
    assert!(hits[0].exact);

    let hits = searcher.search("li", 2);
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.entity.kind == EntityKind::Teacher));
}

#[test]
fn index_is_a_pure_function_of_the_catalog() {
    let builder = IndexBuilder::new(&IndexSettings::default());
    let a = serde_json::to_string(&builder.build(&catalog()).expect("build")).expect("json");
    let b = serde_json::to_string(&builder.build(&catalog()).expect("build")).expect("json");
    assert_eq!(a, b);
}

#[test]
fn open_reads_a_published_index() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("search_index.json");
    let index = IndexBuilder::new(&IndexSettings::default()).build(&catalog()).expect("build");
    std::fs::write(&path, serde_json::to_vec(&index).unwrap()).unwrap();

    let mut searcher = IndexSearcher::open(&path).expect("open");
    assert_eq!(searcher.index(), &index);
    let algorithms = EntityRef::new(EntityKind::Course, ids::course_id("Algorithms", "Computer Science"));
    assert!(searcher.lookup("algo").contains(&algorithms));
    assert!(IndexSearcher::open(&tmp.path().join("missing.json")).is_err());
}
