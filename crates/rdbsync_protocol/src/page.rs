//! Paginated listing envelope.

use crate::record::ResultRecord;
use serde::{Deserialize, Serialize};

/// One page of a results listing.
///
/// `next` is an opaque link to the following page; it is absent, null or
/// empty on the last page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsPage {
    /// Results on this page.
    pub data: Vec<ResultRecord>,
    /// Link to the next page.
    #[serde(default)]
    pub next: Option<String>,
}

impl ResultsPage {
    /// Creates a page.
    pub fn new(data: Vec<ResultRecord>, next: Option<String>) -> Self {
        Self { data, next }
    }

    /// Returns the next-page link, treating an empty link as the end.
    pub fn next_link(&self) -> Option<&str> {
        self.next.as_deref().filter(|link| !link.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn last_page_variants() {
        let absent: ResultsPage = serde_json::from_value(json!({"data": []})).unwrap();
        assert_eq!(absent.next_link(), None);

        let null: ResultsPage =
            serde_json::from_value(json!({"data": [], "next": null})).unwrap();
        assert_eq!(null.next_link(), None);

        let empty: ResultsPage = serde_json::from_value(json!({"data": [], "next": ""})).unwrap();
        assert_eq!(empty.next_link(), None);
    }

    #[test]
    fn page_with_link() {
        let page: ResultsPage = serde_json::from_value(json!({
            "data": [{"id": 1, "submit_time": "T1", "data": {}}],
            "next": "https://example.com/api/v2.0/results?page=1",
            "prev": null,
        }))
        .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(
            page.next_link(),
            Some("https://example.com/api/v2.0/results?page=1")
        );
    }
}
