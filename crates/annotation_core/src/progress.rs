use shared::{domain::AnnotatedItem, protocol::Progress};

/// `percentage` is `round(100 * completed / total)`, and 0 for an empty
/// partition.
pub fn compute(completed: usize, total: usize) -> Progress {
    let percentage = if total == 0 {
        0
    } else {
        ((completed as f64 * 100.0) / total as f64).round() as u32
    };
    Progress {
        completed,
        total,
        percentage,
    }
}

pub fn for_view(view: &[AnnotatedItem]) -> Progress {
    let completed = view.iter().filter(|entry| entry.is_annotated()).count();
    compute(completed, view.len())
}
