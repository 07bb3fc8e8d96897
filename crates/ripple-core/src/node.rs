//! The unit of identity in the dependency graph.
//!
//! A [`DepNode`] is a `(key, source)` pair plus two pieces of non-identity
//! mutable state: the content fingerprint and the per-invocation traced flag.
//! Equality and hashing cover the `(key, source)` projection only -- nodes are
//! held in hash-based indexes while their fingerprint mutates during
//! integration and their traced flag flips during tracing, and including
//! either field in the hash would silently orphan the node in any map it was
//! already stored in.
//!
//! # Soundness invariant
//!
//! `source == None ⇒ fingerprint == None`: an expatriate (a declaration
//! referenced before its defining file has been read) cannot carry a
//! fingerprint, because a fingerprint asserts "I have seen this declaration's
//! defining text" and only an owning file can supply that text. The invariant
//! is enforced at the single validating constructor and at every fingerprint
//! mutation. Violating it means the integration logic upstream is defective;
//! a too-small invalidation set miscompiles silently, so the process aborts
//! loudly instead of repairing.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::error::CoreError;
use crate::fingerprint::Fingerprint;
use crate::intern::SymbolTable;
use crate::key::DepKey;
use crate::source::DepSource;

/// A dependency-graph node. See the module docs for the identity and
/// soundness invariants.
#[derive(Debug, Clone)]
pub struct DepNode {
    /// Immutable for the node's life.
    key: DepKey,
    /// Immutable for the node's life. Moving a declaration to another file is
    /// modeled as replacing the node, never as mutating this field.
    source: Option<DepSource>,
    /// Mutable; excluded from identity.
    fingerprint: Option<Fingerprint>,
    /// Invocation-scoped visit marker; excluded from identity, never
    /// persisted.
    traced: bool,
}

impl DepNode {
    /// The single validating constructor.
    ///
    /// # Panics
    ///
    /// Aborts if `source` is absent while `fingerprint` is present. This is a
    /// programming defect in the caller, not a recoverable condition.
    pub fn new(key: DepKey, source: Option<DepSource>, fingerprint: Option<Fingerprint>) -> Self {
        if source.is_none() && fingerprint.is_some() {
            panic!("expatriate node may not carry a fingerprint: {key:?}");
        }
        DepNode {
            key,
            source,
            fingerprint,
            traced: false,
        }
    }

    /// Creates an expat node: no owning source, no fingerprint.
    pub fn expat(key: DepKey) -> Self {
        DepNode::new(key, None, None)
    }

    pub fn key(&self) -> DepKey {
        self.key
    }

    pub fn source(&self) -> Option<DepSource> {
        self.source
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    /// Returns `true` if no file has claimed this declaration yet.
    pub fn is_expat(&self) -> bool {
        self.source.is_none()
    }

    /// Updates the fingerprint in place. Identity (and therefore membership
    /// in any set or map keyed by this node) is unaffected.
    ///
    /// # Panics
    ///
    /// Aborts if this node is an expat and `fingerprint` is `Some` -- the
    /// soundness invariant is re-validated on every mutation, never only
    /// checked after the fact.
    pub fn set_fingerprint(&mut self, fingerprint: Option<Fingerprint>) {
        if self.source.is_none() && fingerprint.is_some() {
            panic!(
                "expatriate node may not acquire a fingerprint: {key:?}",
                key = self.key
            );
        }
        self.fingerprint = fingerprint;
    }

    /// Whether a tracing pass has already reached this node in the current
    /// invocation.
    pub fn is_traced(&self) -> bool {
        self.traced
    }

    /// Marks the node as reached by the current tracing pass.
    ///
    /// Returns `true` if the flag flipped, `false` if the node was already
    /// traced. The flag flips at most once per invocation; it is the cycle
    /// guard for the worklist traversal.
    pub fn mark_traced(&mut self) -> bool {
        let flipped = !self.traced;
        self.traced = true;
        flipped
    }

    /// Resets the traced flag. Test- and debug-facing; normal operation has
    /// no `traced -> untraced` transition.
    pub fn mark_untraced(&mut self) {
        self.traced = false;
    }

    /// Checks the soundness invariant. Intended for bulk validation after
    /// graph mutations in debug builds, not for hot paths.
    pub fn verify(&self) -> Result<(), CoreError> {
        if self.source.is_none() && self.fingerprint.is_some() {
            return Err(CoreError::ExpatFingerprint { key: self.key });
        }
        Ok(())
    }

    /// Total order for deterministic iteration and serialization: key order,
    /// then expats before sourced nodes, then absent fingerprints before
    /// present ones. A tie-break convenience, not a correctness requirement
    /// of tracing.
    pub fn cmp_using(&self, other: &DepNode, table: &SymbolTable) -> Ordering {
        let by_key = self.key.cmp_using(&other.key, table);
        if by_key != Ordering::Equal {
            return by_key;
        }
        let by_source = match (self.source, other.source) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp_using(b, table),
        };
        if by_source != Ordering::Equal {
            return by_source;
        }
        match (self.fingerprint, other.fingerprint) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp_using(b, table),
        }
    }

    /// Renders the key plus the owning source, or an explicit expatriate
    /// marker, for diagnostics.
    pub fn describe(&self, table: &SymbolTable) -> String {
        match self.source {
            Some(source) => format!("{} @ {}", self.key.describe(table), source.path(table)),
            None => format!("{} [expatriate]", self.key.describe(table)),
        }
    }
}

// Identity is the (key, source) projection only. Fingerprint and traced are
// deliberately excluded; see the module docs.
impl PartialEq for DepNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}

impl Eq for DepNode {}

impl Hash for DepNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.source.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Aspect;
    use std::collections::HashSet;

    fn setup() -> (SymbolTable, DepKey, DepSource) {
        let mut table = SymbolTable::new();
        let key = DepKey::top_level(Aspect::Interface, table.intern("f"));
        let source = DepSource::new(&mut table, "a.src");
        (table, key, source)
    }

    #[test]
    fn fingerprint_mutation_preserves_identity_and_hash_membership() {
        let (mut table, key, source) = setup();
        let fp1 = Fingerprint::of_text(&mut table, "v1");
        let fp2 = Fingerprint::of_text(&mut table, "v2");

        let mut node = DepNode::new(key, Some(source), Some(fp1));
        let snapshot = node.clone();

        let mut set = HashSet::new();
        set.insert(node.clone());

        node.set_fingerprint(Some(fp2));
        assert_eq!(node, snapshot);
        assert!(set.contains(&node), "still found after fingerprint change");

        node.mark_traced();
        assert_eq!(node, snapshot);
        assert!(set.contains(&node), "still found after tracing");
    }

    #[test]
    #[should_panic(expected = "may not carry a fingerprint")]
    fn constructing_expat_with_fingerprint_aborts() {
        let (mut table, key, _) = setup();
        let fp = Fingerprint::of_text(&mut table, "v1");
        let _ = DepNode::new(key, None, Some(fp));
    }

    #[test]
    #[should_panic(expected = "may not acquire a fingerprint")]
    fn mutating_expat_to_carry_fingerprint_aborts() {
        let (mut table, key, _) = setup();
        let fp = Fingerprint::of_text(&mut table, "v1");
        let mut expat = DepNode::expat(key);
        expat.set_fingerprint(Some(fp));
    }

    #[test]
    fn sourced_node_may_drop_fingerprint() {
        let (mut table, key, source) = setup();
        let fp = Fingerprint::of_text(&mut table, "v1");
        let mut node = DepNode::new(key, Some(source), Some(fp));
        node.set_fingerprint(None);
        assert!(node.fingerprint().is_none());
        assert!(node.verify().is_ok());
    }

    #[test]
    fn mark_traced_flips_exactly_once() {
        let (_, key, _) = setup();
        let mut node = DepNode::expat(key);
        assert!(!node.is_traced());
        assert!(node.mark_traced());
        assert!(!node.mark_traced());
        assert!(node.is_traced());
        node.mark_untraced();
        assert!(!node.is_traced());
    }

    #[test]
    fn expats_sort_before_sourced_nodes_with_equal_keys() {
        let (table, key, source) = setup();
        let expat = DepNode::expat(key);
        let sourced = DepNode::new(key, Some(source), None);
        assert_eq!(expat.cmp_using(&sourced, &table), Ordering::Less);
        assert_eq!(sourced.cmp_using(&expat, &table), Ordering::Greater);
    }

    #[test]
    fn absent_fingerprint_sorts_before_present() {
        let (mut table, key, source) = setup();
        let fp = Fingerprint::of_text(&mut table, "v1");
        let bare = DepNode::new(key, Some(source), None);
        let printed = DepNode::new(key, Some(source), Some(fp));
        assert_eq!(bare.cmp_using(&printed, &table), Ordering::Less);
    }

    #[test]
    fn describe_marks_expats() {
        let (table, key, source) = setup();
        let expat = DepNode::expat(key);
        assert_eq!(expat.describe(&table), "interface top-level 'f' [expatriate]");
        let sourced = DepNode::new(key, Some(source), None);
        assert_eq!(sourced.describe(&table), "interface top-level 'f' @ a.src");
    }

    #[test]
    fn verify_accepts_all_constructible_states() {
        let (mut table, key, source) = setup();
        let fp = Fingerprint::of_text(&mut table, "v1");
        assert!(DepNode::expat(key).verify().is_ok());
        assert!(DepNode::new(key, Some(source), None).verify().is_ok());
        assert!(DepNode::new(key, Some(source), Some(fp)).verify().is_ok());
    }
}
