//! Work distribution, record keeping and selection state for reviewing
//! model-predicted event triggers.

pub mod catalog;
pub mod dataset;
pub mod error;
pub mod partition;
pub mod progress;
pub mod records;
pub mod session;

pub use catalog::EventCatalog;
pub use dataset::Dataset;
pub use error::{AnnotationError, Result};
pub use records::{AnnotationStore, RecordStore};
pub use session::{AnnotationSession, SelectionState, SessionPhase};

#[cfg(test)]
mod test_support;
