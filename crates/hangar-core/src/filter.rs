use tracing::{
  debug,
  trace
};

use crate::params::{
  RequestParams,
  StatusFilter
};
use crate::task::{
  Category,
  Status,
  SubTask,
  Task
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pred {
  CategoryEq(u64),
  /// The requested category does not
  /// exist in the snapshot.
  CategoryMissing(u64),
  StatusEq(Status),
  StatusUnknown(String),
  PriorityEq(u64),
  TextContains(String)
}

/// Fields a predicate reads. Subtask
/// rows read their own title and status
/// and take category and priority from
/// the parent.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
  pub id:          u64,
  pub title:       &'a str,
  pub description: &'a str,
  pub status:      Status,
  pub category:    u64,
  pub priority:    u64
}

impl<'a> Subject<'a> {
  pub fn task(task: &'a Task) -> Self {
    Self {
      id:          task.id,
      title:       &task.title,
      description: &task.description,
      status:      task.status,
      category:    task.category.id,
      priority:    task.priority.id
    }
  }

  pub fn subtask(
    parent: &'a Task,
    subtask: &'a SubTask
  ) -> Self {
    Self {
      id:          subtask.id,
      title:       &subtask.title,
      description: "",
      status:      subtask.status,
      category:    parent.category.id,
      priority:    parent.priority.id
    }
  }
}

/// Conjunction of independent
/// predicates. Filtering keeps input
/// order.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  preds: Vec<Pred>
}

impl Filter {
  #[tracing::instrument(skip(
    params, categories
  ))]
  pub fn from_params(
    params: &RequestParams,
    categories: &[Category]
  ) -> Self {
    let mut preds = Vec::new();

    if let Some(id) = params.category {
      if categories
        .iter()
        .any(|c| c.id == id)
      {
        preds
          .push(Pred::CategoryEq(id));
      } else {
        debug!(
          category = id,
          "category scope not found; \
           view will be empty"
        );
        preds.push(
          Pred::CategoryMissing(id)
        );
      }
    }

    match &params.status {
      | Some(StatusFilter::Is(
        status
      )) => {
        preds.push(Pred::StatusEq(
          *status
        ));
      }
      | Some(StatusFilter::Unknown(
        text
      )) => {
        debug!(status = %text, "unknown status filter matches nothing");
        preds.push(
          Pred::StatusUnknown(
            text.clone()
          )
        );
      }
      | None => {}
    }

    if let Some(id) = params.priority {
      preds.push(Pred::PriorityEq(id));
    }

    if let Some(search) =
      params.search.as_deref()
    {
      let needle = search.trim();
      if !needle.is_empty() {
        preds.push(Pred::TextContains(
          needle.to_lowercase()
        ));
      }
    }

    Self {
      preds
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.matches_subject(&Subject::task(
      task
    ))
  }

  pub fn matches_subject(
    &self,
    subject: &Subject<'_>
  ) -> bool {
    self
      .preds
      .iter()
      .all(|pred| eval_pred(pred, subject))
  }
}

#[tracing::instrument(skip(
  tasks, filter
), fields(input = tasks.len()))]
pub fn filter_tasks<'a>(
  tasks: &'a [Task],
  filter: &Filter
) -> Vec<&'a Task> {
  let kept: Vec<&Task> = tasks
    .iter()
    .filter(|task| filter.matches(task))
    .collect();
  debug!(
    kept = kept.len(),
    "filter stage done"
  );
  kept
}

/// One entry per subtask that passes,
/// parents in input order and subtasks
/// in their stored order.
#[tracing::instrument(skip(
  tasks, filter
), fields(parents = tasks.len()))]
pub fn filter_subtasks<'a>(
  tasks: &'a [Task],
  filter: &Filter
) -> Vec<(&'a Task, &'a SubTask)> {
  let kept: Vec<(&Task, &SubTask)> =
    tasks
      .iter()
      .flat_map(|task| {
        task
          .subtasks
          .iter()
          .map(move |sub| (task, sub))
      })
      .filter(|(task, sub)| {
        filter.matches_subject(
          &Subject::subtask(task, sub)
        )
      })
      .collect();
  debug!(
    kept = kept.len(),
    "subtask filter stage done"
  );
  kept
}

fn eval_pred(
  pred: &Pred,
  subject: &Subject<'_>
) -> bool {
  let ok = match pred {
    | Pred::CategoryEq(id) => {
      subject.category == *id
    }
    | Pred::CategoryMissing(_) => {
      false
    }
    | Pred::StatusEq(status) => {
      subject.status == *status
    }
    | Pred::StatusUnknown(_) => false,
    | Pred::PriorityEq(id) => {
      subject.priority == *id
    }
    | Pred::TextContains(needle) => {
      subject
        .title
        .to_lowercase()
        .contains(needle.as_str())
        || subject
          .description
          .to_lowercase()
          .contains(needle.as_str())
    }
  };

  trace!(pred = ?pred, id = subject.id, ok, "filter predicate evaluation");
  ok
}
