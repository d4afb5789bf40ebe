//! Query parameters for listing results.

use crate::provenance::{ORIGIN_FLAG_KEY, ORIGIN_FLAG_QUERY_VALUE, ORIGIN_ID_KEY};
use crate::record::SubmitTime;
use std::collections::BTreeMap;
use std::fmt;

/// Field results are ordered by.
pub const SUBMIT_TIME_FIELD: &str = "submit_time";

/// Sort direction understood by the `_sort` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortDirection {
    /// Returns the `_sort` prefix for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Ordering requested from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending by `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending by `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses an `asc:<field>` / `desc:<field>` parameter.
    pub fn parse(value: &str) -> Option<Self> {
        let (direction, field) = value.split_once(':')?;
        let direction = match direction {
            "asc" => SortDirection::Ascending,
            "desc" => SortDirection::Descending,
            _ => return None,
        };
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.direction.as_str(), self.field)
    }
}

/// Filters, ordering and page size for a results listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsQuery {
    /// Only results with `submit_time >= since`.
    pub since: Option<SubmitTime>,
    /// Requested ordering.
    pub sort: Option<Sort>,
    /// Page size.
    pub limit: Option<u32>,
    /// `data` equality filters.
    pub filters: BTreeMap<String, String>,
}

impl ResultsQuery {
    /// Creates an unfiltered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to results submitted at or after `since`.
    pub fn since(mut self, since: Option<SubmitTime>) -> Self {
        self.since = since;
        self
    }

    /// Sets the ordering.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds a `data` equality filter.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Only results carrying provenance annotations.
    pub fn copied() -> Self {
        Self::new().filter(ORIGIN_FLAG_KEY, ORIGIN_FLAG_QUERY_VALUE)
    }

    /// Only the copy of source result `source_id`.
    pub fn copy_of(source_id: i64) -> Self {
        Self::new().filter(ORIGIN_ID_KEY, source_id.to_string())
    }

    /// Renders the query as URL parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);
        if let Some(since) = &self.since {
            params.push(("since".to_string(), since.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("_sort".to_string(), sort.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        for (key, value) in &self.filters {
            params.push((key.clone(), value.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_parameters() {
        let query = ResultsQuery::new()
            .since(Some(SubmitTime::from("2017-06-12T10:00:00")))
            .sort(Sort::ascending(SUBMIT_TIME_FIELD))
            .limit(50)
            .filter("item", "libfoo");

        assert_eq!(
            query.to_params(),
            vec![
                ("since".to_string(), "2017-06-12T10:00:00".to_string()),
                ("_sort".to_string(), "asc:submit_time".to_string()),
                ("limit".to_string(), "50".to_string()),
                ("item".to_string(), "libfoo".to_string()),
            ]
        );
    }

    #[test]
    fn empty_query_has_no_parameters() {
        assert!(ResultsQuery::new().to_params().is_empty());
        assert!(ResultsQuery::new().since(None).to_params().is_empty());
    }

    #[test]
    fn provenance_filters() {
        assert_eq!(
            ResultsQuery::copied().to_params(),
            vec![(ORIGIN_FLAG_KEY.to_string(), "True".to_string())]
        );
        assert_eq!(
            ResultsQuery::copy_of(42).to_params(),
            vec![(ORIGIN_ID_KEY.to_string(), "42".to_string())]
        );
    }

    #[test]
    fn sort_parse_and_display() {
        let sort = Sort::parse("desc:submit_time").unwrap();
        assert_eq!(sort, Sort::descending(SUBMIT_TIME_FIELD));
        assert_eq!(sort.to_string(), "desc:submit_time");
        assert!(Sort::parse("sideways:submit_time").is_none());
        assert!(Sort::parse("submit_time").is_none());
    }
}
