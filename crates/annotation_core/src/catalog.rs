use std::collections::HashMap;

use shared::domain::{EventType, EventTypeId};

use crate::error::{AnnotationError, Result};

/// Result cap for the inline search box; the full catalog modal is unbounded.
pub const INLINE_SEARCH_LIMIT: usize = 8;

/// Immutable lookup of event types, kept in load order.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    types: Vec<EventType>,
    by_id: HashMap<EventTypeId, usize>,
}

impl EventCatalog {
    pub fn new(types: Vec<EventType>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(types.len());
        for (position, event_type) in types.iter().enumerate() {
            if by_id.insert(event_type.id.clone(), position).is_some() {
                return Err(AnnotationError::Configuration(format!(
                    "duplicate event type id '{}'",
                    event_type.id
                )));
            }
        }
        Ok(Self { types, by_id })
    }

    pub fn get(&self, id: &EventTypeId) -> Option<&EventType> {
        self.by_id.get(id).map(|&position| &self.types[position])
    }

    pub fn contains(&self, id: &EventTypeId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventType> {
        self.types.iter()
    }

    pub fn to_vec(&self) -> Vec<EventType> {
        self.types.clone()
    }

    pub fn ensure_known(&self, id: &EventTypeId) -> Result<&EventType> {
        self.get(id)
            .ok_or_else(|| AnnotationError::InvalidEventType(id.clone()))
    }

    /// Case-insensitive substring match over name and description, in
    /// catalog order.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<&EventType> {
        let needle = query.trim().to_lowercase();
        let matches = self.types.iter().filter(|event_type| {
            event_type.name.to_lowercase().contains(&needle)
                || event_type.description.to_lowercase().contains(&needle)
        });
        match limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        }
    }

    pub fn search_inline(&self, query: &str) -> Vec<&EventType> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.search(query, Some(INLINE_SEARCH_LIMIT))
    }

    pub fn search_all(&self, query: &str) -> Vec<&EventType> {
        self.search(query, None)
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
