//! Conditions over a single snapshot.

use std::collections::BTreeSet;
use std::fmt;

use fleet_units::Snapshot;

/// A pure condition over one snapshot's size and key membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollPredicate {
    /// Exactly `n` entries.
    Count(usize),

    /// At least `n` entries.
    AtLeast(usize),

    /// An entry with this name is present.
    Contains(String),

    /// No entry with this name is present.
    Absent(String),

    /// The names are exactly this set.
    ExactKeys(BTreeSet<String>),

    /// Every inner predicate holds.
    All(Vec<PollPredicate>),
}

impl PollPredicate {
    pub fn count(n: usize) -> Self {
        Self::Count(n)
    }

    pub fn contains(key: impl Into<String>) -> Self {
        Self::Contains(key.into())
    }

    pub fn absent(key: impl Into<String>) -> Self {
        Self::Absent(key.into())
    }

    pub fn exact_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ExactKeys(keys.into_iter().map(Into::into).collect())
    }

    /// Conjunction, flattening nested `All`s.
    pub fn and(self, other: PollPredicate) -> Self {
        let mut all = match self {
            Self::All(inner) => inner,
            single => vec![single],
        };
        match other {
            Self::All(inner) => all.extend(inner),
            single => all.push(single),
        }
        Self::All(all)
    }

    /// Evaluate against a snapshot.
    pub fn matches<T>(&self, snapshot: &Snapshot<T>) -> bool {
        match self {
            Self::Count(n) => snapshot.len() == *n,
            Self::AtLeast(n) => snapshot.len() >= *n,
            Self::Contains(key) => snapshot.contains_key(key),
            Self::Absent(key) => !snapshot.contains_key(key),
            Self::ExactKeys(keys) => {
                snapshot.len() == keys.len() && keys.iter().all(|k| snapshot.contains_key(k))
            }
            Self::All(inner) => inner.iter().all(|p| p.matches(snapshot)),
        }
    }
}

impl fmt::Display for PollPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "count == {n}"),
            Self::AtLeast(n) => write!(f, "count >= {n}"),
            Self::Contains(key) => write!(f, "contains {key}"),
            Self::Absent(key) => write!(f, "lacks {key}"),
            Self::ExactKeys(keys) => {
                let keys: Vec<_> = keys.iter().map(String::as_str).collect();
                write!(f, "exactly [{}]", keys.join(", "))
            }
            Self::All(inner) => {
                let parts: Vec<_> = inner.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

/// Split the difference between expected and observed names.
///
/// Returns `(missing, unexpected)`.
pub fn membership_diff(
    expected: &BTreeSet<String>,
    actual: &BTreeSet<String>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let missing = expected.difference(actual).cloned().collect();
    let unexpected = actual.difference(expected).cloned().collect();
    (missing, unexpected)
}
