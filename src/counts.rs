//! Comment-count table: the batched request form and the pure decode of the server reply.
//!
//! The request carries every root of the page seeded to `0`, plus the page path under
//! [`PAGE_NAME_KEY`]. The reply is a flat JSON object, e.g. `{"eVsYpM": 3, "QtxfuG": 1}`.
//! Decoding never touches the page; [`crate::indicator::plan_counts_update`] turns the decoded
//! table into badge updates.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::{blocks::BlockIndex, error::UcommentError};

/// Metadata key carrying the current page path in the counts request.
pub const PAGE_NAME_KEY: &str = "_page_name_";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentCounts {
    counts: BTreeMap<String, u32>,
}

impl CommentCounts {
    /// Table with every root of the page at zero.
    pub fn seeded(index: &BlockIndex) -> CommentCounts {
        CommentCounts {
            counts: index.roots().map(|root| (root.to_string(), 0)).collect(),
        }
    }

    pub fn request_fields(&self, page_name: &str) -> Vec<(String, String)> {
        self.counts
            .iter()
            .map(|(root, count)| (root.clone(), count.to_string()))
            .chain(std::iter::once((
                PAGE_NAME_KEY.to_string(),
                page_name.to_string(),
            )))
            .collect()
    }

    pub fn get(&self, root: &str) -> Option<u32> {
        self.counts.get(root).copied()
    }

    pub fn set(&mut self, root: impl Into<String>, count: u32) {
        self.counts.insert(root.into(), count);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(root, count)| (root.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|count| u64::from(*count)).sum()
    }

    /// Overwrite entries with the ones in `decoded`.
    pub fn merge(&mut self, decoded: &CommentCounts) {
        for (root, count) in decoded.iter() {
            self.counts.insert(root.to_string(), count);
        }
    }
}

/// Decode a counts reply body.
///
/// The body must be a JSON object. Entries whose value is not a non-negative integer are
/// skipped, as is the page-name metadata key should the server echo it back.
pub fn decode_counts(body: &str) -> Result<CommentCounts, UcommentError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(map) = value else {
        return Err(UcommentError::Serialization(format!(
            "Expected a JSON object of comment counts, got: {body}"
        )));
    };
    let mut counts = CommentCounts::default();
    for (root, count) in map {
        if root == PAGE_NAME_KEY {
            continue;
        }
        match count.as_u64() {
            Some(n) => counts.set(root, u32::try_from(n).unwrap_or(u32::MAX)),
            None => tracing::warn!("Ignoring non-integer comment count {root}={count}"),
        }
    }
    Ok(counts)
}

/// [`decode_counts`], with a malformed or absent body treated as an empty table.
pub fn decode_counts_lenient(body: Option<&str>) -> CommentCounts {
    match body.map(str::trim).filter(|b| !b.is_empty()) {
        Some(body) => decode_counts(body).unwrap_or_else(|e| {
            tracing::warn!("Discarding counts reply: {e}");
            CommentCounts::default()
        }),
        None => CommentCounts::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{CommentableTarget, NodeGeometry, NodeKind};
    use test_log::test;

    fn index(ids: &[&str]) -> BlockIndex {
        BlockIndex::build(ids.iter().map(|id| {
            (
                CommentableTarget::normalize(id, NodeKind::Element).unwrap(),
                NodeGeometry::default(),
            )
        }))
        .unwrap()
    }

    #[test]
    fn test_request_fields_seed_zero_and_page_name() {
        let counts = CommentCounts::seeded(&index(&["ef567890", "abcd1234"]));
        let fields = counts.request_fields("/guide/intro.html");
        assert_eq!(
            fields,
            vec![
                ("abcd1234".to_string(), "0".to_string()),
                ("ef567890".to_string(), "0".to_string()),
                (PAGE_NAME_KEY.to_string(), "/guide/intro.html".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_counts() {
        let counts = decode_counts(r#"{"abcd1234": 3, "ef567890": 0}"#).unwrap();
        assert_eq!(counts.get("abcd1234"), Some(3));
        assert_eq!(counts.get("ef567890"), Some(0));
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_decode_skips_bad_entries() {
        let counts =
            decode_counts(r#"{"a": -1, "b": "2", "c": 1.5, "d": 4, "_page_name_": "/x"}"#).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("d"), Some(4));
    }

    #[test]
    fn test_malformed_body_is_empty_table() {
        assert!(decode_counts("[1, 2]").is_err());
        assert!(decode_counts_lenient(Some("<html>oops</html>")).is_empty());
        assert!(decode_counts_lenient(Some("   ")).is_empty());
        assert!(decode_counts_lenient(None).is_empty());
    }

    #[test]
    fn test_merge_overwrites_seed() {
        let mut table = CommentCounts::seeded(&index(&["abcd1234", "ef567890"]));
        table.merge(&decode_counts(r#"{"abcd1234": 2}"#).unwrap());
        assert_eq!(table.get("abcd1234"), Some(2));
        assert_eq!(table.get("ef567890"), Some(0));
        assert_eq!(table.total(), 2);
    }
}
