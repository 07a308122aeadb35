//! Diffing of fetched collections into long-lived ones.
//!
//! Consumers hold `Arc`s into the collections, so reconciliation keeps the
//! existing `Arc` for every entry that survives a refresh instead of
//! replacing the whole collection.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Number of entries added and removed by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Entries added.
    pub added: usize,
    /// Entries removed.
    pub removed: usize,
}

impl ReconcileStats {
    /// Whether the collection changed at all.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Set-diff `target` against `incoming` by key.
///
/// Entries whose key is absent from `incoming` are dropped; entries whose
/// key is new are appended; entries present in both keep their existing
/// `Arc`. Duplicate keys in `incoming` collapse to the first occurrence.
pub fn update_with_key<T, K, F>(target: &mut Vec<Arc<T>>, incoming: Vec<T>, key: F) -> ReconcileStats
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let incoming_keys: HashSet<K> = incoming.iter().map(&key).collect();

    let before = target.len();
    target.retain(|entry| incoming_keys.contains(&key(entry.as_ref())));
    let removed = before - target.len();

    let mut present: HashSet<K> = target.iter().map(|entry| key(entry.as_ref())).collect();
    let mut added = 0;
    for entry in incoming {
        if present.insert(key(&entry)) {
            target.push(Arc::new(entry));
            added += 1;
        }
    }

    ReconcileStats { added, removed }
}

/// Set-diff `target` against `incoming` with an equality comparer.
///
/// Same contract as [`update_with_key`] for values that have no natural
/// hashable key.
pub fn update_with_comparer<T, F>(
    target: &mut Vec<Arc<T>>,
    incoming: Vec<T>,
    same: F,
) -> ReconcileStats
where
    F: Fn(&T, &T) -> bool,
{
    let before = target.len();
    target.retain(|entry| incoming.iter().any(|new| same(entry.as_ref(), new)));
    let removed = before - target.len();

    let mut added = 0;
    for entry in incoming {
        if !target.iter().any(|existing| same(existing.as_ref(), &entry)) {
            target.push(Arc::new(entry));
            added += 1;
        }
    }

    ReconcileStats { added, removed }
}

/// Overwrite `target` slot by slot, padding to `min_slots` with placeholders.
///
/// The result has `max(incoming.len(), min_slots)` entries. A slot whose
/// value is unchanged keeps its existing `Arc`.
pub fn update_by_index_with<T, P>(
    target: &mut Vec<Arc<T>>,
    incoming: Vec<T>,
    min_slots: usize,
    placeholder: P,
) -> ReconcileStats
where
    T: PartialEq,
    P: Fn() -> T,
{
    let len = incoming.len().max(min_slots);
    let mut incoming = incoming.into_iter();
    let mut stats = ReconcileStats::default();

    for index in 0..len {
        let value = incoming.next().unwrap_or_else(&placeholder);
        match target.get(index) {
            Some(existing) if **existing == value => {}
            Some(_) => {
                target[index] = Arc::new(value);
                stats.added += 1;
                stats.removed += 1;
            }
            None => {
                target.push(Arc::new(value));
                stats.added += 1;
            }
        }
    }

    if target.len() > len {
        stats.removed += target.len() - len;
        target.truncate(len);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        key: u32,
        label: &'static str,
    }

    fn entry(key: u32, label: &'static str) -> Entry {
        Entry { key, label }
    }

    #[test]
    fn set_diff_keeps_surviving_references() {
        let mut target = vec![Arc::new(entry(1, "A")), Arc::new(entry(2, "B"))];
        let old_b = Arc::clone(&target[1]);

        let stats = update_with_key(
            &mut target,
            vec![entry(2, "B2"), entry(3, "C")],
            |e| e.key,
        );

        assert_eq!(stats, ReconcileStats { added: 1, removed: 1 });
        assert_eq!(target.len(), 2);
        assert!(target.iter().all(|e| e.key != 1));
        let b = target.iter().find(|e| e.key == 2).unwrap();
        assert!(Arc::ptr_eq(b, &old_b));
        assert_eq!(b.label, "B");
        assert!(target.iter().any(|e| e.key == 3 && e.label == "C"));
    }

    #[test]
    fn comparer_matches_key_strategy() {
        let mut target = vec![Arc::new(entry(1, "A")), Arc::new(entry(2, "B"))];
        let old_b = Arc::clone(&target[1]);
        let stats = update_with_comparer(
            &mut target,
            vec![entry(2, "B"), entry(3, "C")],
            |a, b| a.key == b.key,
        );
        assert_eq!(stats, ReconcileStats { added: 1, removed: 1 });
        assert!(Arc::ptr_eq(&target[0], &old_b));
    }

    #[test]
    fn index_diff_pads_to_min_slots() {
        let mut target: Vec<Arc<Entry>> = Vec::new();
        update_by_index_with(&mut target, vec![entry(7, "x")], 3, || entry(0, "-"));
        assert_eq!(target.len(), 3);
        assert_eq!(*target[0], entry(7, "x"));
        assert_eq!(*target[1], entry(0, "-"));
        assert_eq!(*target[2], entry(0, "-"));
    }

    #[test]
    fn index_diff_shrinks_back_to_min_slots() {
        let mut target: Vec<Arc<Entry>> = (1..=5).map(|k| Arc::new(entry(k, "n"))).collect();
        let first = Arc::clone(&target[0]);
        let stats = update_by_index_with(&mut target, vec![entry(1, "n")], 3, || entry(0, "-"));
        assert_eq!(target.len(), 3);
        assert!(Arc::ptr_eq(&target[0], &first));
        assert_eq!(stats.removed, 4);
    }

    #[test]
    fn index_diff_grows_beyond_min_slots() {
        let mut target: Vec<Arc<Entry>> = Vec::new();
        let incoming: Vec<Entry> = (1..=4).map(|k| entry(k, "n")).collect();
        update_by_index_with(&mut target, incoming.clone(), 3, || entry(0, "-"));
        assert_eq!(target.iter().map(|e| (**e).clone()).collect::<Vec<_>>(), incoming);
    }

    proptest! {
        #[test]
        fn set_diff_yields_incoming_key_set(
            old in prop::collection::vec(0u32..20, 0..15),
            new in prop::collection::vec(0u32..20, 0..15),
        ) {
            let mut target: Vec<Arc<u32>> = Vec::new();
            update_with_key(&mut target, old.clone(), |v| *v);
            let survivors: Vec<Arc<u32>> = target
                .iter()
                .filter(|v| new.contains(&***v))
                .cloned()
                .collect();

            update_with_key(&mut target, new.clone(), |v| *v);

            let mut got: Vec<u32> = target.iter().map(|v| **v).collect();
            let mut want: Vec<u32> = new.clone();
            got.sort_unstable();
            want.sort_unstable();
            want.dedup();
            prop_assert_eq!(got, want);

            for survivor in survivors {
                prop_assert!(target.iter().any(|v| Arc::ptr_eq(v, &survivor)));
            }
        }

        #[test]
        fn index_diff_length_and_prefix(
            old in prop::collection::vec(1u32..10, 0..8),
            new in prop::collection::vec(1u32..10, 0..8),
        ) {
            let mut target: Vec<Arc<u32>> = old.into_iter().map(Arc::new).collect();
            update_by_index_with(&mut target, new.clone(), 3, || 0);

            prop_assert_eq!(target.len(), new.len().max(3));
            for (i, value) in target.iter().enumerate() {
                let expected = new.get(i).copied().unwrap_or(0);
                prop_assert_eq!(**value, expected);
            }
        }
    }
}
