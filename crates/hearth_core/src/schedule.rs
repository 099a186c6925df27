//! crates/hearth_core/src/schedule.rs
//!
//! Recurring chore scheduling: due dates, rotation and the end of a chore's life.

use crate::domain::{Chore, ChoreState};
use crate::ids::add_days;

/// Why a completion attempt changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompletionBlocked {
    #[error("This chore has already ended")]
    Ended,
    #[error("Only the current assignee can complete this chore")]
    NotAssignee,
}

/// Completes the current turn of `chore` on behalf of `user_id`.
///
/// The checklist is always reset. When the next due date would fall past
/// `end_at` the chore ends in place; otherwise the rotation advances one step
/// and the due date moves forward by the cadence.
pub fn complete_chore(chore: &Chore, user_id: &str) -> Result<Chore, CompletionBlocked> {
    if chore.state == ChoreState::Ended {
        return Err(CompletionBlocked::Ended);
    }
    if chore.assignee_id.as_deref() != Some(user_id) {
        return Err(CompletionBlocked::NotAssignee);
    }

    let mut next = chore.clone();
    for item in &mut next.checklist {
        item.is_done = false;
    }

    let next_due = add_days(chore.due_at, chore.cadence_days);
    let past_end = match (next_due, chore.end_at) {
        (Some(due), Some(end)) => due > end,
        (Some(_), None) => false,
        (None, _) => true,
    };

    match next_due {
        Some(due) if !past_end => {
            next.rotation_index = if next.rotation.is_empty() {
                0
            } else {
                (next.rotation_index + 1) % next.rotation.len()
            };
            assign_rotation(&mut next);
            next.due_at = due;
        }
        _ => next.state = ChoreState::Ended,
    }
    Ok(next)
}

/// Re-derives the assignee from the rotation, clamping a stale index to 0.
pub fn assign_rotation(chore: &mut Chore) {
    if chore.rotation_index >= chore.rotation.len() {
        chore.rotation_index = 0;
    }
    chore.assignee_id = chore.rotation.get(chore.rotation_index).cloned();
}
