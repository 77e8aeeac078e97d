//! Batched flow step edits.
//!
//! One [`StepEdits`] batch is applied in three passes on a working copy:
//!
//! 1. deletions, by 1-based step number, highest first;
//! 2. insertions, by 0-based slot (the number of steps before the new one),
//!    lowest slot first, each against the list as it stands (insertions
//!    sharing a slot all land at that slot, so the last one given ends up
//!    first);
//! 3. moves, by 0-based position, in the order given.
//!
//! Either the whole batch applies or the original steps are returned
//! untouched alongside an error.
//!
//! ```
//! use rest_flow::flow::{apply_edits, FlowStep, StepEdits};
//!
//! let steps: Vec<FlowStep> = ["a", "b", "c"].into_iter().map(FlowStep::new).collect();
//! let edits = StepEdits {
//!     removals: vec![2],
//!     insertions: vec![(Some(1), "x".to_string())],
//!     moves: vec![],
//! };
//!
//! let edited = apply_edits(&steps, &edits, |_| true).unwrap();
//! let names: Vec<_> = edited.iter().map(|s| s.template.as_str()).collect();
//! assert_eq!(names, ["a", "x", "c"]);
//! ```

use super::{FlowError, FlowStep};
use std::collections::BTreeSet;

/// A batch of edits to a flow's steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepEdits {
    /// 1-based step numbers to delete
    pub removals: Vec<usize>,
    /// `(slot, template)`; `None` or a slot past the end appends
    pub insertions: Vec<(Option<usize>, String)>,
    /// `(from, to)` 0-based positions
    pub moves: Vec<(usize, usize)>,
}

impl StepEdits {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.insertions.is_empty() && self.moves.is_empty()
    }
}

/// Applies a batch of edits and returns the new step list.
///
/// `template_exists` is consulted for every inserted template before any
/// change is made.
pub fn apply_edits(
    steps: &[FlowStep],
    edits: &StepEdits,
    template_exists: impl Fn(&str) -> bool,
) -> Result<Vec<FlowStep>, FlowError> {
    if let Some((_, missing)) = edits
        .insertions
        .iter()
        .find(|(_, template)| !template_exists(template))
    {
        return Err(FlowError::UnknownTemplate(missing.clone()));
    }

    let mut working = steps.to_vec();

    // Deletions: validate against the original numbering, then remove from
    // the highest number down so lower numbers stay valid.
    let removals: BTreeSet<usize> = edits.removals.iter().copied().collect();
    if let Some(&bad) = removals.iter().find(|&&n| n == 0 || n > working.len()) {
        return Err(FlowError::InvalidStepIndex(bad));
    }
    for &number in removals.iter().rev() {
        working.remove(number - 1);
    }

    let mut insertions: Vec<&(Option<usize>, String)> = edits.insertions.iter().collect();
    insertions.sort_by_key(|(slot, _)| slot.unwrap_or(usize::MAX));
    for (slot, template) in insertions {
        let at = slot.map_or(working.len(), |s| s.min(working.len()));
        working.insert(at, FlowStep::new(template.clone()));
    }

    for &(from, to) in &edits.moves {
        if from >= working.len() {
            return Err(FlowError::InvalidMoveSource(from));
        }
        let step = working.remove(from);
        let to = to.min(working.len());
        working.insert(to, step);
    }

    if working.is_empty() {
        return Err(FlowError::EmptyFlow);
    }

    log::debug!(
        "Applied step edits: {} -> {} steps",
        steps.len(),
        working.len()
    );
    Ok(working)
}
