use std::collections::BTreeMap;
use tracing::info;

use teachrate_core::config::IndexSettings;
use teachrate_core::traits::CatalogIndexer;
use teachrate_core::types::{Catalog, EntityKind, EntityLabel, EntityRef, SearchIndex};
use teachrate_core::Result;

use crate::tokenizer::{prefix_tokens, NameNormalizer};

/// Builds the prefix search index over teachers, courses and colleges.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    min_prefix: usize,
    max_prefix: usize,
}

impl IndexBuilder {
    pub fn new(settings: &IndexSettings) -> Self {
        Self { min_prefix: settings.min_prefix, max_prefix: settings.max_prefix }
    }

    fn add(
        &self,
        index: &mut SearchIndex,
        normalizer: &mut NameNormalizer,
        entity: EntityRef,
        name: &str,
        college: Option<&str>,
        aliases: &[&str],
    ) {
        let mut terms: Vec<String> = Vec::new();
        for raw in std::iter::once(name).chain(aliases.iter().copied()) {
            let term = normalizer.normalize(raw);
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        for term in &terms {
            for token in prefix_tokens(term, self.min_prefix, self.max_prefix) {
                index.tokens.entry(token).or_default().insert(entity.clone());
            }
        }
        index.entities.insert(
            entity.key(),
            EntityLabel {
                kind: entity.kind,
                id: entity.id,
                name: name.to_string(),
                college: college.map(str::to_string),
                terms,
            },
        );
    }
}

impl CatalogIndexer for IndexBuilder {
    fn build(&self, catalog: &Catalog) -> Result<SearchIndex> {
        let mut normalizer = NameNormalizer::new();
        let mut index = SearchIndex {
            min_prefix: self.min_prefix,
            max_prefix: self.max_prefix,
            entities: BTreeMap::new(),
            tokens: BTreeMap::new(),
        };

        for teacher in catalog.teachers.values() {
            let aliases: Vec<&str> = teacher.aliases.iter().map(String::as_str).collect();
            self.add(
                &mut index,
                &mut normalizer,
                EntityRef::new(EntityKind::Teacher, teacher.id.as_str()),
                &teacher.name,
                Some(teacher.college.as_str()),
                &aliases,
            );
        }
        for course in catalog.courses.values() {
            self.add(
                &mut index,
                &mut normalizer,
                EntityRef::new(EntityKind::Course, course.id.as_str()),
                &course.name,
                Some(course.college.as_str()),
                &[],
            );
        }
        for college in catalog.colleges.values() {
            self.add(
                &mut index,
                &mut normalizer,
                EntityRef::new(EntityKind::College, college.id.as_str()),
                &college.name,
                None,
                &[],
            );
        }

        let shared = index.tokens.values().filter(|set| set.len() > 1).count();
        info!(entities = index.entities.len(), tokens = index.token_count(), shared, "search index built");
        Ok(index)
    }
}
