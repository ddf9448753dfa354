use serde::Serialize;

use crate::params::{Direction, SortKey, SortSpec, SortTerm};

/// Sort state of a single column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub key: SortKey,
    pub label: &'static str,
    /// Direction the column is currently sorted in, if it is primary.
    pub active: Option<Direction>,
    /// Spec the view should use after this header is clicked.
    pub next: SortSpec,
    /// `next` in its signed-key query form.
    pub next_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderState {
    pub columns: Vec<ColumnHeader>,
    pub primary: Option<SortKey>,
    pub primary_direction: Direction,
}

impl HeaderState {
    pub fn column(&self, key: SortKey) -> Option<&ColumnHeader> {
        self.columns.iter().find(|c| c.key == key)
    }
}

/// Computes the click target of every legal column. Clicking the primary
/// column flips its direction; clicking any other column promotes it to
/// primary ascending and keeps the rest of the spec as tie-breakers.
pub fn header_state(spec: &SortSpec, legal_columns: &[SortKey]) -> HeaderState {
    let primary = spec.primary();

    let columns = legal_columns
        .iter()
        .map(|&key| {
            let active = primary.filter(|p| p.key == key).map(|p| p.direction);
            let direction = active.map(Direction::toggled).unwrap_or(Direction::Asc);
            let next = spec.promoted(SortTerm { key, direction });
            let next_query = next.to_query();
            ColumnHeader {
                key,
                label: key.label(),
                active,
                next,
                next_query,
            }
        })
        .collect();

    HeaderState {
        columns,
        primary: primary.map(|p| p.key),
        primary_direction: primary.map(|p| p.direction).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::header_state;
    use crate::order::Listing;
    use crate::params::{Direction, SortKey, SortSpec, SortTerm};

    #[test]
    fn clicking_another_column_promotes_it() {
        let spec = SortSpec::from_terms([SortTerm::desc(SortKey::Title)]);
        let state = header_state(&spec, Listing::Tasks.columns());

        let deadline = state.column(SortKey::Deadline).expect("deadline column");
        assert_eq!(
            deadline.next.terms(),
            &[SortTerm::asc(SortKey::Deadline), SortTerm::desc(SortKey::Title)]
        );
        assert_eq!(deadline.next_query, "deadline,-title");
        assert_eq!(deadline.active, None);
    }

    #[test]
    fn clicking_primary_toggles_direction() {
        let spec = SortSpec::from_terms([
            SortTerm::desc(SortKey::Title),
            SortTerm::asc(SortKey::Deadline),
        ]);
        let state = header_state(&spec, Listing::Tasks.columns());

        let title = state.column(SortKey::Title).expect("title column");
        assert_eq!(title.active, Some(Direction::Desc));
        assert_eq!(
            title.next.terms(),
            &[SortTerm::asc(SortKey::Title), SortTerm::asc(SortKey::Deadline)]
        );
        assert_eq!(state.primary, Some(SortKey::Title));
        assert_eq!(state.primary_direction, Direction::Desc);
    }

    #[test]
    fn rotation_never_duplicates_keys() {
        let spec = SortSpec::from_terms([
            SortTerm::asc(SortKey::Deadline),
            SortTerm::desc(SortKey::Progress),
            SortTerm::asc(SortKey::Title),
        ]);
        let state = header_state(&spec, Listing::CategoryScoped.columns());

        let progress = state.column(SortKey::Progress).expect("progress column");
        assert_eq!(progress.next_query, "progress,deadline,title");

        for column in &state.columns {
            let mut keys: Vec<SortKey> = column.next.terms().iter().map(|t| t.key).collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), before);
            assert_eq!(column.next.primary().map(|t| t.key), Some(column.key));
        }
    }

    #[test]
    fn empty_spec_reports_no_primary() {
        let state = header_state(&SortSpec::new(), Listing::Tasks.columns());
        assert_eq!(state.primary, None);
        assert_eq!(state.primary_direction, Direction::Asc);
        assert_eq!(state.columns.len(), 4);
        assert!(state.columns.iter().all(|c| c.next.len() == 1));
    }

    #[test]
    fn spec_with_columns_outside_listing_is_kept_as_tie_breakers() {
        let spec = SortSpec::from_terms([SortTerm::asc(SortKey::Priority)]);
        let state = header_state(&spec, Listing::Tasks.columns());
        assert_eq!(state.primary, Some(SortKey::Priority));
        assert!(state.columns.iter().all(|c| c.active.is_none()));
        let title = state.column(SortKey::Title).expect("title column");
        assert_eq!(title.next_query, "title,priority");
    }
}
