use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{
  debug,
  trace
};

use crate::params::{
  Direction,
  RawSortTerm,
  SortKey,
  SortRequest,
  SortSpec,
  SortTerm
};
use crate::task::Task;
use crate::view::TaskRow;

/// Which table is being rendered. Each
/// listing exposes its own set of
/// sortable columns.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum Listing {
  #[default]
  Tasks,
  CategoryScoped,
  SubTasks
}

const TASK_COLUMNS: &[SortKey] = &[
  SortKey::Title,
  SortKey::Category,
  SortKey::Progress,
  SortKey::Deadline
];

const SCOPED_COLUMNS: &[SortKey] = &[
  SortKey::Title,
  SortKey::Category,
  SortKey::Progress,
  SortKey::Deadline,
  SortKey::Priority,
  SortKey::Status
];

impl Listing {
  pub fn parse(
    token: &str
  ) -> Option<Self> {
    match token
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "tasks" | "all" => {
        Some(Self::Tasks)
      }
      | "category" | "scoped" => {
        Some(Self::CategoryScoped)
      }
      | "subtasks" => {
        Some(Self::SubTasks)
      }
      | _ => None
    }
  }

  pub fn columns(
    self
  ) -> &'static [SortKey] {
    match self {
      | Self::Tasks => TASK_COLUMNS,
      | Self::CategoryScoped
      | Self::SubTasks => SCOPED_COLUMNS
    }
  }

  pub fn allows(
    self,
    key: SortKey
  ) -> bool {
    self.columns().contains(&key)
  }
}

/// Value a row exposes for one sort key.
/// `Missing` sorts after everything else
/// in either direction.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum SortValue {
  Number(i64),
  Text(String),
  Missing
}

/// Extracts the comparable value of one
/// field. Registered per key in
/// [`Comparators`].
pub trait FieldComparator:
  Send + Sync
{
  fn sort_value(
    &self,
    row: &TaskRow<'_>
  ) -> SortValue;
}

/// Plain extractor function.
pub struct KeyFn(
  pub fn(&TaskRow<'_>) -> SortValue
);

impl FieldComparator for KeyFn {
  fn sort_value(
    &self,
    row: &TaskRow<'_>
  ) -> SortValue {
    (self.0)(row)
  }
}

/// Ranks an enum-like text field by a
/// fixed table instead of lexically.
/// Names outside the table share the
/// fallback rank.
pub struct RankTable {
  ranks:    Vec<(&'static str, i64)>,
  fallback: i64,
  field:    fn(&Task) -> &str
}

pub const UNRANKED: i64 = 999;

impl RankTable {
  pub fn new(
    ranks: Vec<(&'static str, i64)>,
    fallback: i64,
    field: fn(&Task) -> &str
  ) -> Self {
    Self {
      ranks,
      fallback,
      field
    }
  }

  /// Critical, High, Medium, Low,
  /// Optional rank 1 through 5.
  pub fn priority() -> Self {
    Self::new(
      vec![
        ("Critical", 1),
        ("High", 2),
        ("Medium", 3),
        ("Low", 4),
        ("Optional", 5),
      ],
      UNRANKED,
      |task| task.priority.name.as_str()
    )
  }

  pub fn rank(
    &self,
    name: &str
  ) -> i64 {
    let name = name.trim();
    self
      .ranks
      .iter()
      .find(|(label, _)| {
        label.eq_ignore_ascii_case(name)
      })
      .map(|(_, rank)| *rank)
      .unwrap_or(self.fallback)
  }
}

impl FieldComparator for RankTable {
  fn sort_value(
    &self,
    row: &TaskRow<'_>
  ) -> SortValue {
    SortValue::Number(
      self.rank((self.field)(row.task))
    )
  }
}

/// Comparator registry keyed by sort
/// key. Keys without a comparator are
/// skipped when sorting.
pub struct Comparators {
  by_key: BTreeMap<
    SortKey,
    Box<dyn FieldComparator>
  >
}

impl Default for Comparators {
  fn default() -> Self {
    Self::standard()
  }
}

impl Comparators {
  pub fn empty() -> Self {
    Self {
      by_key: BTreeMap::new()
    }
  }

  pub fn standard() -> Self {
    let mut out = Self::empty();
    out.register(
      SortKey::Title,
      KeyFn(|row| {
        SortValue::Text(
          row.title().to_lowercase()
        )
      })
    );
    out.register(
      SortKey::Category,
      KeyFn(|row| {
        SortValue::Text(
          row
            .task
            .category
            .name
            .to_lowercase()
        )
      })
    );
    out.register(
      SortKey::Progress,
      KeyFn(|row| {
        SortValue::Number(i64::from(
          row.progress
        ))
      })
    );
    out.register(
      SortKey::Deadline,
      KeyFn(|row| {
        row
          .task
          .deadline
          .map(|d| {
            SortValue::Number(
              d.timestamp_micros()
            )
          })
          .unwrap_or(SortValue::Missing)
      })
    );
    out.register(
      SortKey::Status,
      KeyFn(|row| {
        SortValue::Text(
          row
            .status()
            .label()
            .to_lowercase()
        )
      })
    );
    out.register(
      SortKey::Priority,
      RankTable::priority()
    );
    out
  }

  pub fn register<C>(
    &mut self,
    key: SortKey,
    comparator: C
  ) where
    C: FieldComparator + 'static
  {
    self
      .by_key
      .insert(key, Box::new(comparator));
  }

  pub fn get(
    &self,
    key: SortKey
  ) -> Option<&dyn FieldComparator> {
    self
      .by_key
      .get(&key)
      .map(|c| c.as_ref())
  }
}

/// Turns the requested sort into terms
/// legal for `listing`. Unknown keys,
/// keys the listing does not expose and
/// repeated keys are dropped silently.
#[tracing::instrument(skip(request))]
pub fn resolve_sort(
  request: &SortRequest,
  listing: Listing
) -> SortSpec {
  let raw: Vec<&RawSortTerm> =
    match request {
      | SortRequest::Unspecified => {
        Vec::new()
      }
      | SortRequest::Keys(terms) => {
        terms.iter().collect()
      }
      | SortRequest::Single {
        primary,
        secondary
      } => {
        std::iter::once(primary)
          .chain(secondary.as_ref())
          .collect()
      }
    };

  let mut spec = SortSpec::new();
  for term in raw {
    let Some(key) =
      SortKey::parse(&term.key)
    else {
      debug!(key = %term.key, "dropping unknown sort key");
      continue;
    };
    if !listing.allows(key) {
      debug!(key = %key, ?listing, "dropping sort key not sortable in listing");
      continue;
    }
    if !spec.push(SortTerm {
      key,
      direction: term.direction
    }) {
      trace!(key = %key, "dropping repeated sort key");
    }
  }

  spec
}

/// Stable multi-key sort: the first term
/// decides, later terms break ties, rows
/// tied on every term keep their input
/// order.
#[tracing::instrument(skip(
  rows,
  comparators
), fields(rows = rows.len(), spec = %spec.to_query()))]
pub fn order_rows<'a>(
  rows: Vec<TaskRow<'a>>,
  spec: &SortSpec,
  comparators: &Comparators
) -> Vec<TaskRow<'a>> {
  let active: Vec<(
    &dyn FieldComparator,
    Direction
  )> = spec
    .terms()
    .iter()
    .filter_map(|term| {
      let comparator =
        comparators.get(term.key);
      if comparator.is_none() {
        debug!(key = %term.key, "no comparator registered; skipping");
      }
      comparator
        .map(|c| (c, term.direction))
    })
    .collect();

  if active.is_empty() {
    return rows;
  }

  let mut keyed: Vec<(
    Vec<SortValue>,
    TaskRow<'a>
  )> = rows
    .into_iter()
    .map(|row| {
      let values = active
        .iter()
        .map(|(c, _)| c.sort_value(&row))
        .collect();
      (values, row)
    })
    .collect();

  keyed.sort_by(|(a, _), (b, _)| {
    compare_keyed(a, b, &active)
  });

  keyed
    .into_iter()
    .map(|(_, row)| row)
    .collect()
}

fn compare_keyed(
  a: &[SortValue],
  b: &[SortValue],
  active: &[(
    &dyn FieldComparator,
    Direction
  )]
) -> Ordering {
  for ((left, right), (_, direction)) in
    a.iter().zip(b).zip(active)
  {
    let ordering = compare_values(
      left, right, *direction
    );
    if ordering != Ordering::Equal {
      return ordering;
    }
  }
  Ordering::Equal
}

pub fn compare_values(
  left: &SortValue,
  right: &SortValue,
  direction: Direction
) -> Ordering {
  let ordering = match (left, right) {
    | (
      SortValue::Missing,
      SortValue::Missing
    ) => return Ordering::Equal,
    | (SortValue::Missing, _) => {
      return Ordering::Greater;
    }
    | (_, SortValue::Missing) => {
      return Ordering::Less;
    }
    | (
      SortValue::Number(a),
      SortValue::Number(b)
    ) => a.cmp(b),
    | (
      SortValue::Text(a),
      SortValue::Text(b)
    ) => a.cmp(b),
    | (SortValue::Number(_), _) => {
      Ordering::Less
    }
    | (SortValue::Text(_), _) => {
      Ordering::Greater
    }
  };

  match direction {
    | Direction::Asc => ordering,
    | Direction::Desc => {
      ordering.reverse()
    }
  }
}
