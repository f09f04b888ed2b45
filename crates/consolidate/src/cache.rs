use shelf_catalog::models::{Identifier, Metadata, PoolId};
use std::collections::HashMap;

/// Answers from the [`MetadataProvider`](crate::MetadataProvider), kept
/// until the next commit.
///
/// A repair touches the same pools over and over; asking the provider once
/// per pool per commit also means every step of one operation sees the same
/// metadata.
#[derive(Debug, Default)]
pub struct LookupCache {
    presentations: HashMap<PoolId, Option<Metadata>>,
    equivalents: HashMap<Identifier, Vec<Identifier>>,
}
impl LookupCache {
    pub fn presentation(&self, pool: PoolId) -> Option<&Option<Metadata>> {
        self.presentations.get(&pool)
    }

    pub fn store_presentation(&mut self, pool: PoolId, metadata: Option<Metadata>) {
        self.presentations.insert(pool, metadata);
    }

    pub fn equivalents(&self, identifier: &Identifier) -> Option<&[Identifier]> {
        self.equivalents.get(identifier).map(Vec::as_slice)
    }

    pub fn store_equivalents(&mut self, identifier: Identifier, equivalents: Vec<Identifier>) {
        self.equivalents.insert(identifier, equivalents);
    }

    pub fn len(&self) -> usize {
        self.presentations.len() + self.equivalents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.presentations.clear();
        self.equivalents.clear();
    }
}
