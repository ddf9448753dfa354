use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::task::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Title,
    Category,
    Progress,
    Deadline,
    Priority,
    Status,
}

impl SortKey {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "title" => Some(Self::Title),
            "category" => Some(Self::Category),
            "progress" => Some(Self::Progress),
            "deadline" => Some(Self::Deadline),
            "priority" => Some(Self::Priority),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::Progress => "progress",
            Self::Deadline => "deadline",
            Self::Priority => "priority",
            Self::Status => "status",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Category => "Category",
            Self::Progress => "Progress",
            Self::Deadline => "Deadline",
            Self::Priority => "Priority",
            Self::Status => "Status",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// `desc`/`descending`/`-` are descending; anything else is ascending.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" | "-" => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortTerm {
    pub key: SortKey,
    pub direction: Direction,
}

impl SortTerm {
    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            direction: Direction::Asc,
        }
    }

    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            direction: Direction::Desc,
        }
    }

    /// Signed form used in query strings: `title`, `-deadline`.
    pub fn to_signed(self) -> String {
        match self.direction {
            Direction::Asc => self.key.as_str().to_string(),
            Direction::Desc => format!("-{}", self.key.as_str()),
        }
    }
}

/// Ordered multi-key sort. The first term is the primary key; a key
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SortTerm>", into = "Vec<SortTerm>")]
pub struct SortSpec {
    terms: Vec<SortTerm>,
}

impl From<Vec<SortTerm>> for SortSpec {
    fn from(terms: Vec<SortTerm>) -> Self {
        Self::from_terms(terms)
    }
}

impl From<SortSpec> for Vec<SortTerm> {
    fn from(spec: SortSpec) -> Self {
        spec.terms
    }
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a spec keeping only the first occurrence of each key.
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = SortTerm>,
    {
        let mut spec = Self::new();
        for term in terms {
            spec.push(term);
        }
        spec
    }

    /// Appends a tie-break term; ignored when the key is already present.
    pub fn push(&mut self, term: SortTerm) -> bool {
        if self.contains(term.key) {
            return false;
        }
        self.terms.push(term);
        true
    }

    pub fn contains(&self, key: SortKey) -> bool {
        self.terms.iter().any(|t| t.key == key)
    }

    pub fn primary(&self) -> Option<SortTerm> {
        self.terms.first().copied()
    }

    pub fn terms(&self) -> &[SortTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// `term` first, then every other term in its current relative order.
    pub fn promoted(&self, term: SortTerm) -> Self {
        let mut terms = Vec::with_capacity(self.terms.len() + 1);
        terms.push(term);
        terms.extend(self.terms.iter().copied().filter(|t| t.key != term.key));
        Self { terms }
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&SortTerm) -> bool,
    {
        self.terms.retain(keep);
    }

    /// Comma separated signed keys, e.g. `deadline,-title`.
    pub fn to_query(&self) -> String {
        self.terms
            .iter()
            .map(|t| t.to_signed())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A signed sort token as received, before the key is resolved against a
/// listing. Unknown keys survive decoding and are dropped by the ordering
/// stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSortTerm {
    pub key: String,
    pub direction: Direction,
}

impl RawSortTerm {
    pub fn parse_signed(token: &str) -> Option<Self> {
        let token = token.trim();
        let (key, direction) = if let Some(rest) = token.strip_prefix('-') {
            (rest, Direction::Desc)
        } else if let Some(rest) = token.strip_prefix('+') {
            (rest, Direction::Asc)
        } else {
            (token, Direction::Asc)
        };
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            direction,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortRequest {
    #[default]
    Unspecified,
    /// Full ordered list of signed keys.
    Keys(Vec<RawSortTerm>),
    /// Legacy single column with an optional secondary tie-break.
    Single {
        primary: RawSortTerm,
        secondary: Option<RawSortTerm>,
    },
}

impl SortRequest {
    pub fn from_signed_list(raw: &str) -> Self {
        let terms: Vec<RawSortTerm> = raw
            .split(',')
            .flat_map(str::split_whitespace)
            .filter_map(RawSortTerm::parse_signed)
            .collect();
        Self::Keys(terms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
    Is(Status),
    /// Text that names no status; matches nothing.
    Unknown(String),
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Self {
        match Status::parse_label(raw) {
            Some(status) => Self::Is(status),
            None => Self::Unknown(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub priority: Option<u64>,
    pub category: Option<u64>,
    pub sort: SortRequest,
}

impl RequestParams {
    /// Decodes raw query pairs. Non-numeric ids are skipped and unknown
    /// keys ignored. A non-blank `order` wins over the legacy `sort`/`dir`
    /// pair.
    #[tracing::instrument(skip(pairs))]
    pub fn from_query<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        let mut order: Option<&str> = None;
        let mut sort: Option<&str> = None;
        let mut dir: Option<&str> = None;
        let mut sort2: Option<&str> = None;
        let mut dir2: Option<&str> = None;

        for (key, value) in pairs {
            match key {
                "q" | "search" => {
                    let trimmed = value.trim();
                    params.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
                }
                "status" => {
                    params.status = (!value.trim().is_empty()).then(|| StatusFilter::parse(value));
                }
                "priority" => params.priority = parse_id("priority", value),
                "category" => params.category = parse_id("category", value),
                "order" => order = Some(value),
                "sort" => sort = Some(value),
                "dir" => dir = Some(value),
                "sort2" => sort2 = Some(value),
                "dir2" => dir2 = Some(value),
                other => debug!(key = other, "ignoring unknown query parameter"),
            }
        }

        params.sort = if let Some(order) = order.filter(|raw| !raw.trim().is_empty()) {
            SortRequest::from_signed_list(order)
        } else if let Some(primary) = sort.and_then(|key| legacy_term(key, dir)) {
            SortRequest::Single {
                primary,
                secondary: sort2.and_then(|key| legacy_term(key, dir2)),
            }
        } else {
            SortRequest::Unspecified
        };

        params
    }
}

fn legacy_term(key: &str, dir: Option<&str>) -> Option<RawSortTerm> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some(RawSortTerm {
        key: key.to_string(),
        direction: dir.map(Direction::parse).unwrap_or_default(),
    })
}

fn parse_id(field: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(id) => Some(id),
        Err(_) => {
            if !raw.trim().is_empty() {
                debug!(field, raw, "skipping unparseable id filter");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Direction, RawSortTerm, RequestParams, SortKey, SortRequest, SortSpec, SortTerm,
        StatusFilter,
    };
    use crate::task::Status;

    #[test]
    fn spec_never_holds_duplicate_keys() {
        let spec = SortSpec::from_terms([
            SortTerm::desc(SortKey::Title),
            SortTerm::asc(SortKey::Deadline),
            SortTerm::asc(SortKey::Title),
        ]);
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.primary(), Some(SortTerm::desc(SortKey::Title)));
        assert_eq!(spec.to_query(), "-title,deadline");
    }

    #[test]
    fn deserialized_spec_keeps_first_occurrence() {
        let spec: SortSpec = serde_json::from_str(
            r#"[{"key":"title","direction":"desc"},{"key":"title","direction":"asc"}]"#,
        )
        .expect("decode spec");
        assert_eq!(spec.len(), 1);
        assert_eq!(spec.to_query(), "-title");

        let encoded = serde_json::to_string(&spec).expect("encode spec");
        assert_eq!(encoded, r#"[{"key":"title","direction":"desc"}]"#);
    }

    #[test]
    fn promoted_moves_key_to_front() {
        let spec = SortSpec::from_terms([
            SortTerm::asc(SortKey::Deadline),
            SortTerm::desc(SortKey::Title),
            SortTerm::asc(SortKey::Progress),
        ]);
        let next = spec.promoted(SortTerm::desc(SortKey::Progress));
        assert_eq!(
            next.terms(),
            &[
                SortTerm::desc(SortKey::Progress),
                SortTerm::asc(SortKey::Deadline),
                SortTerm::desc(SortKey::Title),
            ]
        );
    }

    #[test]
    fn decodes_signed_order_list() {
        let params = RequestParams::from_query([("order", "-deadline, title,,+bogus")]);
        assert_eq!(
            params.sort,
            SortRequest::Keys(vec![
                RawSortTerm {
                    key: "deadline".to_string(),
                    direction: Direction::Desc,
                },
                RawSortTerm {
                    key: "title".to_string(),
                    direction: Direction::Asc,
                },
                RawSortTerm {
                    key: "bogus".to_string(),
                    direction: Direction::Asc,
                },
            ])
        );
    }

    #[test]
    fn blank_order_falls_back_to_legacy_pair() {
        let params =
            RequestParams::from_query([("order", "  "), ("sort", "title"), ("dir", "desc")]);
        assert_eq!(
            params.sort,
            SortRequest::Single {
                primary: RawSortTerm {
                    key: "title".to_string(),
                    direction: Direction::Desc,
                },
                secondary: None,
            }
        );

        let params = RequestParams::from_query([("order", "")]);
        assert_eq!(params.sort, SortRequest::Unspecified);
    }

    #[test]
    fn decodes_legacy_pair_with_secondary() {
        let params = RequestParams::from_query([
            ("sort", "priority"),
            ("dir", "desc"),
            ("sort2", "title"),
        ]);
        let SortRequest::Single { primary, secondary } = params.sort else {
            panic!("expected legacy sort request");
        };
        assert_eq!(primary.key, "priority");
        assert_eq!(primary.direction, Direction::Desc);
        let secondary = secondary.expect("secondary term");
        assert_eq!(secondary.key, "title");
        assert_eq!(secondary.direction, Direction::Asc);
    }

    #[test]
    fn garbage_ids_are_skipped_and_status_kept_verbatim() {
        let params = RequestParams::from_query([
            ("priority", "high"),
            ("category", "12"),
            ("status", "in progress"),
            ("q", "   "),
        ]);
        assert_eq!(params.priority, None);
        assert_eq!(params.category, Some(12));
        assert_eq!(params.status, Some(StatusFilter::Is(Status::InProgress)));
        assert_eq!(params.search, None);

        let params = RequestParams::from_query([("status", "archived")]);
        assert_eq!(params.status, Some(StatusFilter::Unknown("archived".to_string())));
    }
}
