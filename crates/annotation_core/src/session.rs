//! Selection state machine for reviewing one annotator's queue.
//!
//! A session owns the annotator's view and the selection for the item on
//! screen. Every mutation goes through an explicit transition; moving to
//! another item saves the current one first and refuses to move if that
//! save fails.

use chrono::{DateTime, Utc};
use shared::{
    domain::{AnnotatedItem, Annotation, AnnotatorId, EventTypeId, Item},
    protocol::Progress,
};
use tracing::debug;

use crate::{
    catalog::EventCatalog,
    error::{AnnotationError, Result},
    progress,
    records::{AnnotationStore, RecordStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Selection matches what was loaded or last saved.
    Viewing,
    /// Selection changed since load, or the last save attempt failed.
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub current_index: usize,
    /// Always sorted ascending.
    pub selected_trigger_indices: Vec<usize>,
    pub selected_event_type: Option<EventTypeId>,
    pub not_in_list: bool,
}

impl SelectionState {
    /// Seeds from the saved annotation when there is one, otherwise from the
    /// model's predicted triggers with no event type chosen.
    pub fn load(current_index: usize, entry: &AnnotatedItem) -> Self {
        match &entry.annotation {
            Some(annotation) => Self {
                current_index,
                selected_trigger_indices: sorted(annotation.trigger_indices.clone()),
                selected_event_type: annotation.event_type.clone(),
                not_in_list: annotation.not_in_list,
            },
            None => Self {
                current_index,
                selected_trigger_indices: sorted(
                    entry.item.model_prediction.trigger_indices.clone(),
                ),
                selected_event_type: None,
                not_in_list: false,
            },
        }
    }

    /// Anchor for range selection: the last entry of the sorted selection,
    /// i.e. the largest selected index, not the most recently clicked one.
    pub fn range_anchor(&self) -> Option<usize> {
        self.selected_trigger_indices.last().copied()
    }

    pub fn toggle_token(&mut self, item: &Item, index: usize, extend: bool) -> Result<()> {
        if index >= item.tokens.len() {
            return Err(AnnotationError::InvalidTokenIndex {
                item_id: item.id,
                index,
                token_count: item.tokens.len(),
            });
        }

        match self.range_anchor().filter(|_| extend) {
            Some(anchor) => {
                let (low, high) = if anchor <= index {
                    (anchor, index)
                } else {
                    (index, anchor)
                };
                for position in low..=high {
                    if !self.selected_trigger_indices.contains(&position) {
                        self.selected_trigger_indices.push(position);
                    }
                }
            }
            None => match self
                .selected_trigger_indices
                .iter()
                .position(|&selected| selected == index)
            {
                Some(position) => {
                    self.selected_trigger_indices.remove(position);
                }
                None => self.selected_trigger_indices.push(index),
            },
        }
        self.selected_trigger_indices.sort_unstable();
        Ok(())
    }

    /// Picking a concrete type always clears "not in list". Unknown ids leave
    /// the selection untouched.
    pub fn select_event_type(&mut self, type_id: &EventTypeId, catalog: &EventCatalog) -> Result<()> {
        catalog.ensure_known(type_id)?;
        self.selected_event_type = Some(type_id.clone());
        self.not_in_list = false;
        Ok(())
    }

    pub fn toggle_not_in_list(&mut self) {
        self.not_in_list = !self.not_in_list;
        if self.not_in_list {
            self.selected_event_type = None;
        }
    }

    pub fn commit(&self, annotated_at: DateTime<Utc>) -> Annotation {
        Annotation {
            trigger_indices: sorted(self.selected_trigger_indices.clone()),
            event_type: if self.not_in_list {
                None
            } else {
                self.selected_event_type.clone()
            },
            not_in_list: self.not_in_list,
            annotated_at,
        }
    }
}

fn sorted(mut indices: Vec<usize>) -> Vec<usize> {
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// One annotator's review session over their partition.
pub struct AnnotationSession<S> {
    store: RecordStore<S>,
    annotator: AnnotatorId,
    view: Vec<AnnotatedItem>,
    selection: SelectionState,
    phase: SessionPhase,
}

impl<S: AnnotationStore> AnnotationSession<S> {
    /// Loads the annotator's view and starts on the first item without an
    /// annotation, or the first item when everything is done.
    pub async fn open(store: RecordStore<S>, annotator: AnnotatorId) -> Result<Self> {
        let view = store.get(annotator).await?;
        if view.is_empty() {
            return Err(AnnotationError::EmptyView(annotator));
        }
        let start = view
            .iter()
            .position(|entry| !entry.is_annotated())
            .unwrap_or(0);
        let selection = SelectionState::load(start, &view[start]);
        Ok(Self {
            store,
            annotator,
            view,
            selection,
            phase: SessionPhase::Viewing,
        })
    }

    pub fn annotator(&self) -> AnnotatorId {
        self.annotator
    }

    pub fn view(&self) -> &[AnnotatedItem] {
        &self.view
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.selection.current_index
    }

    pub fn current(&self) -> &AnnotatedItem {
        &self.view[self.selection.current_index]
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.phase == SessionPhase::Editing
    }

    pub fn catalog(&self) -> &EventCatalog {
        self.store.dataset().catalog()
    }

    /// Completion computed from the session's own copy of the view.
    pub fn progress(&self) -> Progress {
        progress::for_view(&self.view)
    }

    pub fn toggle_token(&mut self, index: usize, extend: bool) -> Result<()> {
        let item = &self.view[self.selection.current_index].item;
        self.selection.toggle_token(item, index, extend)?;
        self.phase = SessionPhase::Editing;
        Ok(())
    }

    pub fn select_event_type(&mut self, type_id: &EventTypeId) -> Result<()> {
        self.selection
            .select_event_type(type_id, self.store.dataset().catalog())?;
        self.phase = SessionPhase::Editing;
        Ok(())
    }

    /// Selects the model's `rank`-th (0-based) candidate type. Returns
    /// `false` when the model offered fewer candidates.
    pub fn select_prediction(&mut self, rank: usize) -> Result<bool> {
        let Some(type_id) = self
            .current()
            .item
            .model_prediction
            .top_event_types
            .get(rank)
            .cloned()
        else {
            return Ok(false);
        };
        self.select_event_type(&type_id)?;
        Ok(true)
    }

    pub fn toggle_not_in_list(&mut self) {
        self.selection.toggle_not_in_list();
        self.phase = SessionPhase::Editing;
    }

    pub fn commit(&self) -> Annotation {
        self.selection.commit(Utc::now())
    }

    /// Commits and persists the current item without moving. On failure the
    /// selection is kept and the session stays in `Editing`.
    pub async fn save(&mut self) -> Result<Annotation> {
        let index = self.selection.current_index;
        let item_id = self.view[index].item.id;
        let annotation = self.commit();

        let saved = match self.store.upsert(self.annotator, item_id, annotation).await {
            Ok(saved) => saved,
            Err(error) => {
                self.phase = SessionPhase::Editing;
                return Err(error);
            }
        };
        self.view[index].annotation = Some(saved.clone());
        self.phase = SessionPhase::Viewing;
        Ok(saved)
    }

    /// Saves the current item, then loads `target`. Out-of-range targets are
    /// a no-op and return `false`; a failed save leaves the session where it
    /// was.
    pub async fn navigate(&mut self, target: usize) -> Result<bool> {
        if target >= self.view.len() {
            return Ok(false);
        }
        self.save().await?;
        self.load(target);
        debug!(
            annotator_id = self.annotator.0,
            index = target,
            item_id = self.current().item.id.0,
            "moved to item"
        );
        Ok(true)
    }

    pub async fn next(&mut self) -> Result<bool> {
        self.navigate(self.selection.current_index + 1).await
    }

    pub async fn previous(&mut self) -> Result<bool> {
        match self.selection.current_index.checked_sub(1) {
            Some(target) => self.navigate(target).await,
            None => Ok(false),
        }
    }

    fn load(&mut self, index: usize) {
        self.selection = SelectionState::load(index, &self.view[index]);
        self.phase = SessionPhase::Viewing;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
