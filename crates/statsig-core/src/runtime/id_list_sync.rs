// statsig-core/src/runtime/id_list_sync.rs
// ============================================================================
// Module: Statsig Runtime ID List Sync
// Description: Reconciles a lookup-endpoint response against stored ID lists.
// Purpose: Decide which lists need a reset, which need a ranged fetch, and
//          which should be deleted, without performing any I/O itself.
// Dependencies: crate::core::id_list, crate::core::identifiers, crate::core::time
// ============================================================================

//! ## Overview
//! The ID list lookup endpoint reports, per list name, the remote file's
//! current identity, size, and creation time. [`apply_lookup`] is the pure
//! half of spec.md §4.6: it resets lists whose backing file rotated, skips
//! lists already fully read, deletes lists no longer present upstream, and
//! returns the set of ranged fetches still needed. The caller performs those
//! fetches and feeds each result back through [`apply_fetch_result`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;

use thiserror::Error;

use crate::core::IdList;
use crate::core::IdListName;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Lookup Response
// ============================================================================

/// One entry of the ID lists lookup response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListLookupEntry {
    /// URL to fetch the list's diff records from.
    pub url: String,
    /// Remote file identity.
    pub file_id: String,
    /// Total size in bytes of the remote file as of this lookup.
    pub size: u64,
    /// Creation time of the remote file, in epoch milliseconds.
    pub creation_time: i64,
}

/// A ranged fetch [`apply_lookup`] determined is still needed for a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    /// The list to fetch a range for.
    pub name: IdListName,
    /// URL to fetch from.
    pub url: String,
    /// Byte offset to resume the ranged GET at.
    pub range_start: u64,
}

/// Errors applying a single list's fetched diff body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdListSyncError {
    /// The response carried no usable `Content-Length`; the list is deleted
    /// rather than left in an inconsistent byte-accounting state.
    #[error("missing or malformed Content-Length for list {0}")]
    MissingContentLength(String),
}

// ============================================================================
// SECTION: Reconciliation
// ============================================================================

/// Reconciles `lists` against one lookup response, mutating `lists` in place
/// steps 1, 2, 3, and 5, and returns the ranged fetches
/// still needed (step 4, performed by the caller).
pub fn apply_lookup(
    lists: &mut HashMap<IdListName, IdList>,
    lookup: &BTreeMap<String, ListLookupEntry>,
) -> Vec<FetchTask> {
    let mut fetches = Vec::new();

    for (name, entry) in lookup {
        let list_name = IdListName::new(name.clone());
        let creation_time = Timestamp::from_millis(entry.creation_time);

        if let Some(existing) = lists.get(&list_name) {
            if creation_time < existing.creation_time {
                continue;
            }
        }

        let needs_reset = lists
            .get(&list_name)
            .is_none_or(|existing| existing.file_id.as_deref() != Some(entry.file_id.as_str()));

        let list = lists.entry(list_name.clone()).or_insert_with(|| IdList::new(list_name.clone()));
        if needs_reset {
            list.reset(entry.url.clone(), entry.file_id.clone(), creation_time);
        }

        if entry.size <= list.read_bytes {
            continue;
        }

        fetches.push(FetchTask {
            name: list_name,
            url: entry.url.clone(),
            range_start: list.read_bytes,
        });
    }

    lists.retain(|name, _| lookup.contains_key(name.as_str()));
    fetches
}

/// Applies one list's fetched diff body. On a missing/malformed
/// `Content-Length` the list is deleted and the error is returned for the
/// caller to log; the list otherwise absorbs the diff and advances
/// `read_bytes` by `content_length`.
pub fn apply_fetch_result(
    lists: &mut HashMap<IdListName, IdList>,
    name: &IdListName,
    body: &str,
    content_length: Option<u64>,
) -> Result<(), IdListSyncError> {
    let Some(content_length) = content_length else {
        lists.remove(name);
        return Err(IdListSyncError::MissingContentLength(name.as_str().to_string()));
    };
    if let Some(list) = lists.get_mut(name) {
        list.apply_diff(body, content_length);
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, file_id: &str, size: u64, creation_time: i64) -> ListLookupEntry {
        ListLookupEntry { url: url.to_string(), file_id: file_id.to_string(), size, creation_time }
    }

    #[test]
    fn unknown_list_is_reset_and_scheduled_for_fetch() {
        let mut lists = HashMap::new();
        let lookup = BTreeMap::from([("employees".to_string(), entry("https://x/e", "file-1", 100, 10))]);
        let fetches = apply_lookup(&mut lists, &lookup);
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].range_start, 0);
        assert!(lists.contains_key(&IdListName::new("employees")));
    }

    #[test]
    fn already_fully_read_list_is_skipped() {
        let mut lists = HashMap::new();
        let name = IdListName::new("employees");
        let mut list = IdList::new(name.clone());
        list.reset("https://x/e".to_string(), "file-1".to_string(), Timestamp::from_millis(10));
        list.apply_diff("+a\n", 100);
        lists.insert(name, list);

        let lookup = BTreeMap::from([("employees".to_string(), entry("https://x/e", "file-1", 100, 10))]);
        let fetches = apply_lookup(&mut lists, &lookup);
        assert!(fetches.is_empty());
    }

    #[test]
    fn file_id_rotation_resets_read_bytes() {
        let mut lists = HashMap::new();
        let name = IdListName::new("employees");
        let mut list = IdList::new(name.clone());
        list.reset("https://x/e".to_string(), "file-1".to_string(), Timestamp::from_millis(10));
        list.apply_diff("+a\n", 100);
        lists.insert(name.clone(), list);

        let lookup = BTreeMap::from([("employees".to_string(), entry("https://x/e2", "file-2", 50, 20))]);
        let fetches = apply_lookup(&mut lists, &lookup);
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].range_start, 0);
        assert_eq!(lists[&name].file_id.as_deref(), Some("file-2"));
    }

    #[test]
    fn stale_creation_time_entry_is_ignored() {
        let mut lists = HashMap::new();
        let name = IdListName::new("employees");
        let mut list = IdList::new(name.clone());
        list.reset("https://x/e".to_string(), "file-1".to_string(), Timestamp::from_millis(100));
        lists.insert(name.clone(), list);

        let lookup = BTreeMap::from([("employees".to_string(), entry("https://x/old", "file-0", 10, 5))]);
        let fetches = apply_lookup(&mut lists, &lookup);
        assert!(fetches.is_empty());
        assert_eq!(lists[&name].file_id.as_deref(), Some("file-1"));
    }

    #[test]
    fn list_absent_from_lookup_is_deleted() {
        let mut lists = HashMap::new();
        let name = IdListName::new("gone");
        lists.insert(name.clone(), IdList::new(name.clone()));

        let fetches = apply_lookup(&mut lists, &BTreeMap::new());
        assert!(fetches.is_empty());
        assert!(!lists.contains_key(&name));
    }

    #[test]
    fn missing_content_length_deletes_list_and_reports() {
        let mut lists = HashMap::new();
        let name = IdListName::new("employees");
        lists.insert(name.clone(), IdList::new(name.clone()));

        let err = apply_fetch_result(&mut lists, &name, "+a\n", None).unwrap_err();
        assert_eq!(err, IdListSyncError::MissingContentLength("employees".to_string()));
        assert!(!lists.contains_key(&name));
    }

    #[test]
    fn successful_fetch_applies_diff_and_advances_read_bytes() {
        let mut lists = HashMap::new();
        let name = IdListName::new("employees");
        lists.insert(name.clone(), IdList::new(name.clone()));

        apply_fetch_result(&mut lists, &name, "+a\n+b\n", Some(6)).unwrap();
        let list = &lists[&name];
        assert!(list.contains("a"));
        assert!(list.contains("b"));
        assert_eq!(list.read_bytes, 6);
    }
}
