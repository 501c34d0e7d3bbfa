use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    domain::{AnnotatorId, EventType, EventTypeId, Item, ItemId},
    protocol::AppConfig,
};
use tracing::info;

use crate::{
    catalog::EventCatalog,
    error::{AnnotationError, Result},
    partition,
};

pub const CONFIG_FILE: &str = "config.json";
pub const EVENT_TYPES_FILE: &str = "event_types.json";
pub const INPUT_DATA_FILE: &str = "input_data.json";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventTypesFile {
    List(Vec<EventType>),
    Keyed(BTreeMap<String, KeyedEventType>),
}

#[derive(Debug, Deserialize)]
struct KeyedEventType {
    name: String,
    #[serde(default)]
    description: String,
}

impl EventTypesFile {
    fn into_event_types(self) -> Vec<EventType> {
        match self {
            Self::List(types) => types,
            Self::Keyed(types) => types
                .into_iter()
                .map(|(id, entry)| EventType {
                    id: EventTypeId(id),
                    name: entry.name,
                    description: entry.description,
                })
                .collect(),
        }
    }
}

/// The static inputs of a review run: configuration, event type catalog and
/// items, validated once at startup.
#[derive(Debug, Clone)]
pub struct Dataset {
    config: AppConfig,
    catalog: EventCatalog,
    items: Vec<Item>,
    positions: HashMap<ItemId, usize>,
}

impl Dataset {
    pub fn new(
        config: AppConfig,
        event_types: Vec<EventType>,
        mut items: Vec<Item>,
    ) -> Result<Self> {
        if config.num_annotators <= 0 {
            return Err(AnnotationError::Configuration(format!(
                "num_annotators must be positive, got {}",
                config.num_annotators
            )));
        }
        let catalog = EventCatalog::new(event_types)?;

        let mut positions = HashMap::with_capacity(items.len());
        for (position, item) in items.iter_mut().enumerate() {
            item.model_prediction.trigger_indices.sort_unstable();
            item.model_prediction.trigger_indices.dedup();
            if positions.insert(item.id, position).is_some() {
                return Err(AnnotationError::Configuration(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            validate_prediction(item, &catalog)?;
        }

        Ok(Self {
            config,
            catalog,
            items,
            positions,
        })
    }

    pub fn load(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref();
        let config: AppConfig = read_json(&resolve(data_dir, CONFIG_FILE))?;
        let event_types: EventTypesFile = read_json(&resolve(data_dir, EVENT_TYPES_FILE))?;
        let items: Vec<Item> = read_json(&resolve(data_dir, INPUT_DATA_FILE))?;

        let dataset = Self::new(config, event_types.into_event_types(), items)
            .with_context(|| format!("invalid dataset in '{}'", data_dir.display()))?;
        info!(
            data_dir = %data_dir.display(),
            items = dataset.items.len(),
            event_types = dataset.catalog.len(),
            num_annotators = dataset.config.num_annotators,
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn num_annotators(&self) -> i64 {
        self.config.num_annotators
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.positions.get(&id).map(|&position| &self.items[position])
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn annotators(&self) -> impl Iterator<Item = AnnotatorId> {
        (0..self.config.num_annotators).map(AnnotatorId)
    }

    pub fn view(&self, annotator: AnnotatorId) -> Result<Vec<&Item>> {
        partition::view_for(&self.items, annotator, self.config.num_annotators)
    }

    /// The item, if it exists and falls in `annotator`'s partition.
    pub fn assigned_item(&self, annotator: AnnotatorId, id: ItemId) -> Result<&Item> {
        partition::ensure_annotator(annotator, self.config.num_annotators)?;
        let unknown = || AnnotationError::UnknownItem {
            annotator_id: annotator,
            item_id: id,
        };
        let position = self.index_of(id).ok_or_else(unknown)?;
        if partition::assign(position, self.config.num_annotators)? != annotator {
            return Err(unknown());
        }
        Ok(&self.items[position])
    }
}

fn validate_prediction(item: &Item, catalog: &EventCatalog) -> Result<()> {
    let prediction = &item.model_prediction;
    if let Some(&index) = prediction
        .trigger_indices
        .iter()
        .find(|&&index| index >= item.tokens.len())
    {
        return Err(AnnotationError::Configuration(format!(
            "item {} predicts trigger index {index} but has {} tokens",
            item.id,
            item.tokens.len()
        )));
    }
    if let Some(unknown) = prediction
        .top_event_types
        .iter()
        .find(|id| !catalog.contains(id))
    {
        return Err(AnnotationError::Configuration(format!(
            "item {} predicts unknown event type '{unknown}'",
            item.id
        )));
    }
    Ok(())
}

fn resolve(data_dir: &Path, file_name: &str) -> PathBuf {
    let path = data_dir.join(file_name);
    if path.exists() {
        path
    } else {
        PathBuf::from(file_name)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/dataset_tests.rs"]
mod tests;
