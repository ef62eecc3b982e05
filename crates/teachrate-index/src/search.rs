use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

use teachrate_core::types::{EntityLabel, EntityRef, SearchIndex};

use crate::tokenizer::{bounded_prefix, NameNormalizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub entity: EntityRef,
    pub label: EntityLabel,
    /// The query equals one of the entity's normalized terms.
    pub exact: bool,
}

/// Answers queries against a built or published index.
pub struct IndexSearcher {
    index: SearchIndex,
    normalizer: NameNormalizer,
}

impl IndexSearcher {
    pub fn new(index: SearchIndex) -> Self {
        Self { index, normalizer: NameNormalizer::new() }
    }

    /// Loads a published `search_index.json`.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let index: SearchIndex =
            serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self::new(index))
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Every entity the query matches. Queries longer than the prefix bound
    /// go through the bounded prefix and are then checked against the full
    /// normalized terms.
    pub fn lookup(&mut self, query: &str) -> BTreeSet<EntityRef> {
        let query = self.normalizer.normalize(query);
        let mut found = BTreeSet::new();
        if query.is_empty() {
            return found;
        }
        if let Some(set) = self.index.tokens.get(&query) {
            found.extend(set.iter().cloned());
        }
        if query.chars().count() > self.index.max_prefix {
            let prefix = bounded_prefix(&query, self.index.max_prefix);
            if let Some(set) = self.index.tokens.get(&prefix) {
                let index = &self.index;
                found.extend(
                    set.iter()
                        .filter(|e| index.label(e).is_some_and(|l| l.terms.iter().any(|t| t.contains(&query))))
                        .cloned(),
                );
            }
        }
        found
    }

    /// Ranked hits: exact term matches first, then teachers, courses,
    /// colleges, then by name and id.
    pub fn search(&mut self, query: &str, limit: usize) -> Vec<SearchHit> {
        let normalized = self.normalizer.normalize(query);
        let mut hits: Vec<SearchHit> = self
            .lookup(query)
            .into_iter()
            .filter_map(|entity| {
                let label = self.index.label(&entity)?.clone();
                let exact = label.terms.iter().any(|t| *t == normalized);
                Some(SearchHit { entity, label, exact })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.exact
                .cmp(&a.exact)
                .then(a.entity.kind.cmp(&b.entity.kind))
                .then_with(|| a.label.name.cmp(&b.label.name))
                .then_with(|| a.entity.id.cmp(&b.entity.id))
        });
        hits.truncate(limit);
        hits
    }
}
