// statsig-core/src/core/id_list.rs
// ============================================================================
// Module: Statsig Core ID List
// Description: Differentially-updated membership set for `ip_based`/`ua_based`-
//              style targeting by opaque hashed id.
// Purpose: Track per-list byte offset and file identity so the poller can
//          fetch only the bytes appended since the last poll.
// Dependencies: std::collections
// ============================================================================

//! ## Overview
//! An ID list is a named set of hashed ids plus two pieces of fetch state:
//! `read_bytes` (how much of the remote file has been consumed) and `file_id`
//! (the remote file's identity, used to detect truncation/rotation). Applying
//! a diff is pure and side-effect free so it can be unit tested independently
//! of the network layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::IdListName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: ID List Index
// ============================================================================

/// One entry of the `get_id_lists` index response: where to fetch a list's
/// contents and which remote file currently backs it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdListIndexEntry {
    /// URL to fetch the list's newline-delimited diff records from.
    pub url: String,
    /// Remote file identity; changes when the list is rotated.
    #[serde(rename = "fileID")]
    pub file_id: String,
    /// Total size in bytes of the remote file as of this index response.
    pub size: u64,
    /// Creation time of the backing remote file, used to discard
    /// out-of-order index entries.
    #[serde(rename = "creationTime", default)]
    pub creation_time: i64,
}

/// The full `get_id_lists` index response: list name to index entry.
pub type IdListIndex = BTreeMap<String, IdListIndexEntry>;

/// Persisted form of an [`IdList`], written to / read from a
/// [`crate::interfaces::DataAdapter`] under that list's per-name key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdListSnapshot {
    /// URL the list was last fetched from.
    pub url: String,
    /// Remote file identity as of this snapshot.
    pub file_id: Option<String>,
    /// Bytes of the remote file already consumed.
    pub read_bytes: u64,
    /// Creation time of the remote file, in epoch milliseconds.
    pub creation_time: i64,
    /// Hashed id membership.
    pub ids: Vec<String>,
}

// ============================================================================
// SECTION: IdList
// ============================================================================

/// A single named ID list and its fetch/membership state.
#[derive(Debug, Clone, Default)]
pub struct IdList {
    /// List name.
    pub name: IdListName,
    /// URL to fetch the next range of diff records from.
    pub url: String,
    /// Remote file identity; a change indicates the list was rotated and must
    /// be re-fetched from byte zero.
    pub file_id: Option<String>,
    /// Number of bytes of the remote file already consumed.
    pub read_bytes: u64,
    /// Creation time of the remote file currently backing this list.
    pub creation_time: Timestamp,
    /// Current membership set, keyed by hashed id.
    ids: HashSet<String>,
}

impl IdList {
    /// Creates an empty list with the given name.
    #[must_use]
    pub fn new(name: IdListName) -> Self {
        Self {
            name,
            url: String::new(),
            file_id: None,
            read_bytes: 0,
            creation_time: Timestamp::ZERO,
            ids: HashSet::new(),
        }
    }

    /// Returns whether `hashed_id` is present in the list.
    #[must_use]
    pub fn contains(&self, hashed_id: &str) -> bool {
        self.ids.contains(hashed_id)
    }

    /// Number of ids currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns whether the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resets the list to empty and rebinds it to a new remote file identity.
    /// Called when the server reports a new `fileID` for the same list name.
    pub fn reset(&mut self, url: String, file_id: String, creation_time: Timestamp) {
        self.ids.clear();
        self.read_bytes = 0;
        self.url = url;
        self.file_id = Some(file_id);
        self.creation_time = creation_time;
    }

    /// Returns a snapshot of this list's membership and fetch state, for
    /// round-tripping through a [`crate::interfaces::DataAdapter`].
    #[must_use]
    pub fn to_snapshot(&self) -> IdListSnapshot {
        IdListSnapshot {
            url: self.url.clone(),
            file_id: self.file_id.clone(),
            read_bytes: self.read_bytes,
            creation_time: self.creation_time.as_millis(),
            ids: self.ids.iter().cloned().collect(),
        }
    }

    /// Rebuilds a list from a persisted snapshot.
    #[must_use]
    pub fn from_snapshot(name: IdListName, snapshot: IdListSnapshot) -> Self {
        Self {
            name,
            url: snapshot.url,
            file_id: snapshot.file_id,
            read_bytes: snapshot.read_bytes,
            creation_time: Timestamp::from_millis(snapshot.creation_time),
            ids: snapshot.ids.into_iter().collect(),
        }
    }

    /// Applies a batch of newline-delimited diff records of the form
    /// `+<hashedID>` or `-<hashedID>`. Malformed lines (missing sign byte,
    /// unrecognized sign) are skipped rather than failing the whole batch. A
    /// trailing record not yet terminated by `\n` (the range ended mid-record)
    /// is discarded rather than applied; its bytes are still counted in
    /// `read_bytes` so the next ranged fetch re-requests and completes it.
    ///
    /// `bytes_consumed` is added to `read_bytes` so the next fetch resumes at
    /// the right offset.
    pub fn apply_diff(&mut self, body: &str, bytes_consumed: u64) {
        let mut lines = body.split('\n');
        if !body.ends_with('\n') {
            lines.next_back();
        }
        for line in lines {
            let mut chars = line.chars();
            let Some(sign) = chars.next() else { continue };
            let id = chars.as_str();
            if id.is_empty() {
                continue;
            }
            match sign {
                '+' => {
                    self.ids.insert(id.to_string());
                }
                '-' => {
                    self.ids.remove(id);
                }
                _ => {}
            }
        }
        self.read_bytes += bytes_consumed;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> IdList {
        IdList::new(IdListName::new("employee_ids"))
    }

    #[test]
    fn apply_diff_adds_and_removes() {
        let mut l = list();
        l.apply_diff("+abc\n+def\n", 10);
        assert!(l.contains("abc"));
        assert!(l.contains("def"));
        assert_eq!(l.read_bytes, 10);

        l.apply_diff("-abc\n", 5);
        assert!(!l.contains("abc"));
        assert!(l.contains("def"));
        assert_eq!(l.read_bytes, 15);
    }

    #[test]
    fn apply_diff_skips_malformed_lines() {
        let mut l = list();
        l.apply_diff("garbage\n+\n+ok\n", 0);
        assert_eq!(l.len(), 1);
        assert!(l.contains("ok"));
    }

    #[test]
    fn apply_diff_discards_truncated_trailing_record() {
        let mut l = list();
        // "+de" is a truncated tail of "+def\n"; it must not be applied.
        l.apply_diff("+abc\n+de", 8);
        assert!(l.contains("abc"));
        assert!(!l.contains("de"));
        assert_eq!(l.len(), 1);
        assert_eq!(l.read_bytes, 8);

        // A re-fetch ranged from before the truncated record delivers it
        // complete; it is applied normally this time.
        l.apply_diff("+def\n", 5);
        assert!(l.contains("def"));
        assert_eq!(l.read_bytes, 13);
    }

    #[test]
    fn reset_clears_membership_and_offset() {
        let mut l = list();
        l.apply_diff("+abc\n", 4);
        l.reset("https://example.com/list".to_string(), "file-2".to_string(), Timestamp::from_millis(5));
        assert!(l.is_empty());
        assert_eq!(l.read_bytes, 0);
        assert_eq!(l.file_id.as_deref(), Some("file-2"));
        assert_eq!(l.creation_time, Timestamp::from_millis(5));
    }

    #[test]
    fn snapshot_round_trips_membership_and_fetch_state() {
        let mut l = list();
        l.apply_diff("+abc\n+def\n", 8);
        l.reset("https://example.com/list".to_string(), "file-1".to_string(), Timestamp::from_millis(100));
        l.apply_diff("+ghi\n", 4);
        let snapshot = l.to_snapshot();
        let restored = IdList::from_snapshot(IdListName::new("employee_ids"), snapshot);
        assert!(restored.contains("ghi"));
        assert_eq!(restored.read_bytes, 4);
        assert_eq!(restored.file_id.as_deref(), Some("file-1"));
    }
}
