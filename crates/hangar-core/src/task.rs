use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::compact_date_serde;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }

    /// Case-insensitive match against the display label. The serialized
    /// spellings (`in_progress`, `inprogress`) are accepted too.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let needle = raw.trim();
        if let Some(status) = Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(needle))
        {
            return Some(status);
        }

        match needle.to_ascii_lowercase().as_str() {
            "in_progress" | "inprogress" | "in-progress" => Some(Status::InProgress),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Priority {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: u64,
    pub parent: u64,
    pub title: String,
    pub status: Status,
}

impl SubTask {
    /// Subtasks carry no deadline of their own; the parent's applies.
    pub fn is_overdue(&self, parent: &Task, now: DateTime<Utc>) -> bool {
        self.status != Status::Completed && parent.deadline_passed(now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub content: String,

    #[serde(with = "compact_date_serde")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, with = "compact_date_serde::option")]
    pub deadline: Option<DateTime<Utc>>,

    pub status: Status,

    pub priority: Priority,

    pub category: Category,

    #[serde(default)]
    pub subtasks: Vec<SubTask>,

    #[serde(default)]
    pub notes: Vec<Note>,

    #[serde(with = "compact_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "compact_date_serde")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new_pending(
        id: u64,
        title: String,
        category: Category,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            deadline: None,
            status: Status::Pending,
            priority,
            category,
            subtasks: vec![],
            notes: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_subtask(&mut self, id: u64, title: &str, status: Status) {
        self.subtasks.push(SubTask {
            id,
            parent: self.id,
            title: title.to_string(),
            status,
        });
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != Status::Completed && self.deadline_passed(now)
    }

    fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| d < now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Category, Priority, Status, Task};

    #[test]
    fn status_labels_parse_case_insensitively() {
        assert_eq!(Status::parse_label("in progress"), Some(Status::InProgress));
        assert_eq!(Status::parse_label("COMPLETED"), Some(Status::Completed));
        assert_eq!(Status::parse_label(" pending "), Some(Status::Pending));
        assert_eq!(Status::parse_label("in_progress"), Some(Status::InProgress));
        assert_eq!(Status::parse_label("blocked"), None);
    }

    #[test]
    fn subtasks_inherit_the_parent_deadline_for_overdue() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap();
        let mut task = Task::new_pending(
            1,
            "Ship release".to_string(),
            Category {
                id: 1,
                name: "Work".to_string(),
            },
            Priority {
                id: 1,
                name: "High".to_string(),
            },
            now,
        );
        task.deadline = Some(now - Duration::hours(1));
        task.add_subtask(1, "tag", Status::Completed);
        task.add_subtask(2, "announce", Status::Pending);

        assert!(task.is_overdue(now));
        assert!(!task.subtasks[0].is_overdue(&task, now));
        assert!(task.subtasks[1].is_overdue(&task, now));

        task.deadline = None;
        assert!(!task.subtasks[1].is_overdue(&task, now));
    }
}
