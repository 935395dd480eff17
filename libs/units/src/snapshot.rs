//! Point-in-time views of a cluster listing.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::ParseError;
use crate::types::UnitState;

/// A record that is identified by a name within a listing.
pub trait Keyed {
    /// The unique name of this record within a snapshot.
    fn key(&self) -> &str;
}

/// Entries of one listing, keyed by name.
///
/// Keys are unique. Ordering of the underlying map is by name and carries no
/// meaning about the order the cluster reported the rows in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot<T> {
    entries: BTreeMap<String, T>,
}

/// Snapshot of `list-units` output.
pub type ClusterSnapshot = Snapshot<UnitState>;

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Keyed> Snapshot<T> {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, rejecting repeated names.
    pub fn from_entries<I>(entries: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut map = BTreeMap::new();
        for entry in entries {
            match map.entry(entry.key().to_string()) {
                btree_map::Entry::Occupied(occupied) => {
                    return Err(ParseError::DuplicateKey(occupied.key().clone()));
                }
                btree_map::Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                }
            }
        }
        Ok(Self { entries: map })
    }

    /// Keep only the entries matching `keep`.
    pub fn filter<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        Self {
            entries: self.entries.into_iter().filter(|(_, v)| keep(v)).collect(),
        }
    }
}

impl<T> Snapshot<T> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the listing was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an entry with this name is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up an entry by name.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Entry names in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entry names as an owned set.
    pub fn key_set(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate over entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Consume the snapshot, returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, T> {
        self.entries
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = (&'a String, &'a T);
    type IntoIter = btree_map::Iter<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T> IntoIterator for Snapshot<T> {
    type Item = (String, T);
    type IntoIter = btree_map::IntoIter<String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
