use crate::task::{Status, SubTask, Task};

/// Percentage of completed subtasks, floored. Tasks without subtasks fall
/// back to their own status: Completed 100, InProgress 50, Pending 0.
///
/// Always in `0..=100`; recomputed on every call.
pub fn progress(task: &Task) -> u8 {
    let total = task.subtasks.len();
    if total == 0 {
        return status_fallback(task.status);
    }

    let completed = task
        .subtasks
        .iter()
        .filter(|sub| sub.status == Status::Completed)
        .count();

    // completed <= total, so the quotient never exceeds 100.
    ((completed * 100) / total) as u8
}

/// A subtask has no children of its own, so only the status fallback
/// applies.
pub fn subtask_progress(subtask: &SubTask) -> u8 {
    status_fallback(subtask.status)
}

fn status_fallback(status: Status) -> u8 {
    match status {
        Status::Completed => 100,
        Status::InProgress => 50,
        Status::Pending => 0,
    }
}
