use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::filter::{Filter, filter_subtasks, filter_tasks};
use crate::header::{HeaderState, header_state};
use crate::order::{Comparators, Listing, order_rows, resolve_sort};
use crate::params::{RequestParams, SortKey, SortSpec};
use crate::progress::{progress, subtask_progress};
use crate::task::{Category, Priority, Status, SubTask, Task};

/// Materialized collection the engine reads from. Borrowed for the
/// duration of one call only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub categories: Vec<Category>,
    pub priorities: Vec<Priority>,
    pub tasks: Vec<Task>,
}

/// One output row. In the subtask listing `subtask` is set and the row
/// reads its title and status from it; everything else comes from `task`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask: Option<&'a SubTask>,
    pub progress: u8,
    pub overdue: bool,
}

impl<'a> TaskRow<'a> {
    pub fn for_task(task: &'a Task, now: DateTime<Utc>) -> Self {
        Self {
            task,
            subtask: None,
            progress: progress(task),
            overdue: task.is_overdue(now),
        }
    }

    pub fn for_subtask(task: &'a Task, subtask: &'a SubTask, now: DateTime<Utc>) -> Self {
        Self {
            task,
            subtask: Some(subtask),
            progress: subtask_progress(subtask),
            overdue: subtask.is_overdue(task, now),
        }
    }

    pub fn title(&self) -> &'a str {
        match self.subtask {
            Some(sub) => sub.title.as_str(),
            None => self.task.title.as_str(),
        }
    }

    pub fn status(&self) -> Status {
        self.subtask.map_or(self.task.status, |sub| sub.status)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusSummary {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut summary = Self::default();
        for status in statuses {
            summary.total += 1;
            match status {
                Status::Pending => summary.pending += 1,
                Status::InProgress => summary.in_progress += 1,
                Status::Completed => summary.completed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView<'a> {
    pub listing_columns: &'static [SortKey],
    pub rows: Vec<TaskRow<'a>>,
    pub sort: SortSpec,
    pub header: HeaderState,
    pub summary: StatusSummary,
}

/// Options that are not part of the request: which table is rendered,
/// the sort used when the request carries none, and the clock.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub listing: Listing,
    pub default_sort: SortSpec,
    pub now: DateTime<Utc>,
}

impl ViewOptions {
    pub fn new(listing: Listing, now: DateTime<Utc>) -> Self {
        Self {
            listing,
            default_sort: SortSpec::new(),
            now,
        }
    }
}

/// Filter, compute progress, order, then derive header state. The summary
/// counts the rows that survived filtering.
#[tracing::instrument(skip_all, fields(listing = ?opts.listing, tasks = snapshot.tasks.len()))]
pub fn build_view<'a>(
    snapshot: &'a Snapshot,
    params: &RequestParams,
    opts: &ViewOptions,
    comparators: &Comparators,
) -> TaskView<'a> {
    let filter = Filter::from_params(params, &snapshot.categories);
    let rows: Vec<TaskRow<'a>> = match opts.listing {
        Listing::SubTasks => filter_subtasks(&snapshot.tasks, &filter)
            .into_iter()
            .map(|(task, sub)| TaskRow::for_subtask(task, sub, opts.now))
            .collect(),
        Listing::Tasks | Listing::CategoryScoped => filter_tasks(&snapshot.tasks, &filter)
            .into_iter()
            .map(|task| TaskRow::for_task(task, opts.now))
            .collect(),
    };

    let mut sort = resolve_sort(&params.sort, opts.listing);
    if sort.is_empty() {
        sort = opts.default_sort.clone();
        sort.retain(|term| opts.listing.allows(term.key));
    }

    let rows = order_rows(rows, &sort, comparators);
    let columns = opts.listing.columns();
    let header = header_state(&sort, columns);
    let summary = StatusSummary::from_statuses(rows.iter().map(TaskRow::status));

    info!(rows = rows.len(), sort = %sort.to_query(), "built task view");

    TaskView {
        listing_columns: columns,
        rows,
        sort,
        header,
        summary,
    }
}
