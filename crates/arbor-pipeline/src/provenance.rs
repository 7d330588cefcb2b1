//! Bidirectional original ↔ current tracking for one pipeline run.
//!
//! Invariants: every identity reachable from the working snapshot has a
//! `current_to_original` entry (possibly `None` for synthesized trees);
//! `original_to_current` is defined exactly for identities that trace back
//! to an original unit and always names the *latest* replacement. Asking
//! about an identity this run never produced is a contract violation by a
//! transformer and panics rather than silently corrupting attribution.

use arbor_core::UnitId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ProvenanceMap {
    current_to_original: HashMap<UnitId, Option<UnitId>>,
    original_to_current: HashMap<UnitId, UnitId>,
    /// Synthesized units in insertion order, each slot always naming the
    /// latest identity of that synthesized tree.
    added: Vec<UnitId>,
}

impl ProvenanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `current` as the latest tree for `original`. Used when
    /// seeding the run: `current` is the annotated rewrite of `original`,
    /// or `original` itself when annotation is skipped.
    pub fn seed(&mut self, original: UnitId, current: UnitId) {
        self.current_to_original.insert(current, Some(original));
        self.original_to_current.insert(original, current);
    }

    pub fn is_tracked(&self, id: UnitId) -> bool {
        self.current_to_original.contains_key(&id)
    }

    /// Original ancestor of a current tree; `None` means synthesized.
    ///
    /// Panics when `id` is not a current tree of this run: the transformer
    /// handed back a tree the pipeline never produced or tracked.
    pub fn ancestor_of(&self, id: UnitId) -> Option<UnitId> {
        match self.current_to_original.get(&id) {
            Some(ancestor) => *ancestor,
            None => panic!("provenance: {id} is not a current tree of this run"),
        }
    }

    /// Latest tree standing in for `original`, if `original` was ever
    /// seeded.
    pub fn current_of(&self, original: UnitId) -> Option<UnitId> {
        self.original_to_current.get(&original).copied()
    }

    /// `new` takes over from current tree `old`. An original's mapping is
    /// updated in place (`original_to_current` never holds more than the
    /// latest tree), and a synthesized tree stays synthesized, only its
    /// current identity changes.
    pub fn record_replacement(&mut self, old: UnitId, new: UnitId) {
        match self.ancestor_of(old) {
            Some(ancestor) => {
                self.current_to_original.remove(&old);
                self.current_to_original.insert(new, Some(ancestor));
                self.original_to_current.insert(ancestor, new);
            }
            None => {
                self.current_to_original.remove(&old);
                self.current_to_original.insert(new, None);
                if let Some(slot) = self.added.iter_mut().find(|slot| **slot == old) {
                    *slot = new;
                }
            }
        }
    }

    /// Track a freshly synthesized tree.
    pub fn record_addition(&mut self, new: UnitId) {
        self.current_to_original.insert(new, None);
        self.added.push(new);
    }

    /// Synthesized trees still alive, in insertion order.
    pub fn added(&self) -> &[UnitId] {
        &self.added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id() -> UnitId {
        UnitId::fresh()
    }

    #[test]
    fn seeded_original_round_trips() {
        let mut map = ProvenanceMap::new();
        let original = id();
        let annotated = id();
        map.seed(original, annotated);

        assert_eq!(map.ancestor_of(annotated), Some(original));
        assert_eq!(map.current_of(original), Some(annotated));
    }

    #[test]
    fn re_replacement_updates_instead_of_duplicating() {
        let mut map = ProvenanceMap::new();
        let a = id();
        map.seed(a, a);

        let b = id();
        map.record_replacement(a, b);
        let c = id();
        map.record_replacement(b, c);

        assert_eq!(map.current_of(a), Some(c));
        assert_eq!(map.ancestor_of(c), Some(a));
        assert!(!map.is_tracked(b));
    }

    #[test]
    fn synthesized_stays_synthesized_across_replacement() {
        let mut map = ProvenanceMap::new();
        let d = id();
        map.record_addition(d);

        let d2 = id();
        map.record_replacement(d, d2);

        assert_eq!(map.ancestor_of(d2), None);
        assert_eq!(map.added(), &[d2]);
    }

    #[test]
    #[should_panic(expected = "not a current tree")]
    fn untracked_lookup_is_fatal() {
        let map = ProvenanceMap::new();
        map.ancestor_of(id());
    }
}
