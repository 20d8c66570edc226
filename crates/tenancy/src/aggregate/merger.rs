//! Merging of tagged per-tenant records into one view.
//!
//! Records arrive in tenant-processing order, each tenant's records in the
//! order its operation returned them. The merger sorts them by a caller-chosen
//! key with a stable sort, so ties keep that arrival order in both
//! directions.
//!
//! # Example
//!
//! ```
//! use carebridge_tenancy::aggregate::{MergeOptions, ResultMerger, Tagged};
//! use carebridge_tenancy::tenant::TenantId;
//!
//! let records = vec![
//!     Tagged::new(TenantId::new("a"), 5),
//!     Tagged::new(TenantId::new("a"), 1),
//!     Tagged::new(TenantId::new("b"), 3),
//! ];
//!
//! let merged = ResultMerger::new().merge(records, &MergeOptions::by(|v: &i32| *v));
//! let values: Vec<i32> = merged.iter().map(|r| r.value).collect();
//! assert_eq!(values, vec![1, 3, 5]);
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Tagged;

/// Sort direction for merged records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
type SeenFilter<T> = Box<dyn FnMut(&T) -> bool + Send>;

/// The key records are ordered by.
pub struct MergeKey<T> {
    compare: Comparator<T>,
}

impl<T: 'static> MergeKey<T> {
    /// Orders records by the key `key` extracts.
    pub fn by<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(move |a: &T, b: &T| key(a).cmp(&key(b))),
        }
    }
}

impl<T> MergeKey<T> {
    /// Compares two records by this key.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.compare)(a, b)
    }
}

impl<T> Clone for MergeKey<T> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for MergeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeKey").finish_non_exhaustive()
    }
}

/// The key records are de-duplicated by.
pub struct DedupKey<T> {
    filter: Arc<dyn Fn() -> SeenFilter<T> + Send + Sync>,
}

impl<T: 'static> DedupKey<T> {
    /// De-duplicates records whose `key` is equal.
    pub fn by<K, F>(key: F) -> Self
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let key = Arc::new(key);
        Self {
            filter: Arc::new(move || {
                let key = Arc::clone(&key);
                let mut seen = HashSet::new();
                Box::new(move |record: &T| seen.insert(key(record))) as SeenFilter<T>
            }),
        }
    }
}

impl<T> DedupKey<T> {
    /// Returns a fresh filter that accepts the first record for each key.
    fn first_seen(&self) -> SeenFilter<T> {
        (self.filter)()
    }
}

impl<T> Clone for DedupKey<T> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<T> fmt::Debug for DedupKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupKey").finish_non_exhaustive()
    }
}

/// Options for merging records.
///
/// Records are sorted by `key` in `direction`. Deduplication and a result
/// limit are off unless set.
pub struct MergeOptions<T> {
    key: MergeKey<T>,
    direction: SortDirection,
    dedup: Option<DedupKey<T>>,
    limit: Option<usize>,
}

impl<T> MergeOptions<T> {
    /// Sorts ascending by `key`.
    pub fn with_key(key: MergeKey<T>) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
            dedup: None,
            limit: None,
        }
    }

    /// Sets the sort direction.
    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sorts largest key first.
    pub fn descending(self) -> Self {
        self.direction(SortDirection::Descending)
    }

    /// Keeps at most `limit` records after sorting and deduplication.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the sort direction.
    pub fn sort_direction(&self) -> SortDirection {
        self.direction
    }

    /// Returns the result limit.
    pub fn max_records(&self) -> Option<usize> {
        self.limit
    }
}

impl<T: 'static> MergeOptions<T> {
    /// Sorts ascending by the key `key` extracts.
    pub fn by<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::with_key(MergeKey::by(key))
    }

    /// Keeps only the first record, after sorting, for each value of `key`.
    pub fn dedup_by<K, F>(mut self, key: F) -> Self
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.dedup = Some(DedupKey::by(key));
        self
    }
}

impl<T> Clone for MergeOptions<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            direction: self.direction,
            dedup: self.dedup.clone(),
            limit: self.limit,
        }
    }
}

impl<T> fmt::Debug for MergeOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("direction", &self.direction)
            .field("dedup", &self.dedup.is_some())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Combines tagged records from many tenants into one ordered view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger;

impl ResultMerger {
    /// Creates a new result merger.
    pub fn new() -> Self {
        Self
    }

    /// Sorts, de-duplicates and limits `records` according to `options`.
    pub fn merge<T>(
        &self,
        mut records: Vec<Tagged<T>>,
        options: &MergeOptions<T>,
    ) -> Vec<Tagged<T>> {
        // sort_by is stable; reversing the comparator keeps ties in arrival order.
        match options.direction {
            SortDirection::Ascending => {
                records.sort_by(|a, b| options.key.compare(&a.value, &b.value))
            }
            SortDirection::Descending => {
                records.sort_by(|a, b| options.key.compare(&b.value, &a.value))
            }
        }

        if let Some(dedup) = &options.dedup {
            let mut first_seen = dedup.first_seen();
            records.retain(|record| first_seen(&record.value));
        }

        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        records
    }
}
