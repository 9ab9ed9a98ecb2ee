//! Prefix trie with trailing-wildcard patterns.
//!
//! Keys are resource prefixes such as `www.corpA.com/admin` or
//! `www.corpA.com/*`. Each pattern terminates at one node, which stores a map
//! from subject/group name to a value. A trailing `*` does not create an edge:
//! it marks the node reached by the preceding characters as a wildcard
//! boundary, and the entries land in that node's wildcard map.
//!
//! Lookup resolution, for a query `q`:
//! - walk `q` byte by byte, remembering the deepest wildcard boundary passed;
//! - if the walk consumes `q`, the node it ends on decides: its exact map, or
//!   its wildcard map when it is a boundary without exact entries (a pattern
//!   matches itself). A node with neither decides with no entries, so every
//!   key is a hard miss there. Boundaries passed above it are never consulted;
//! - if the walk stops early, the deepest boundary passed decides, or nothing
//!   matches.
//!
//! The root only ends a walk for the empty query. No exact pattern can end
//! there, so it decides only when it is itself a boundary.
//!
//! Nodes live in an arena and refer to their children by index. Child lookup
//! goes through [`Branching`], so the dense ASCII table can be swapped for a
//! sparse map when resources are not plain ASCII.

use std::collections::{BTreeMap, HashMap};

use crate::authz::errors::AuthzError;

/// Index of a node in the trie arena.
pub type NodeId = u32;

/// The root is always the first arena slot and is never anyone's child.
pub const ROOT: NodeId = 0;

/// Byte-keyed child map of a trie node.
pub trait Branching: Default {
    /// Whether `byte` belongs to the alphabet this representation can store.
    fn accepts(byte: u8) -> bool;
    fn child(&self, byte: u8) -> Option<NodeId>;
    /// Callers only pass bytes for which [`Branching::accepts`] holds.
    fn set_child(&mut self, byte: u8, id: NodeId);
    /// Children in ascending byte order.
    fn children(&self) -> Vec<(u8, NodeId)>;
}

/// 128 slots indexed by the ASCII code point. Slot value 0 means "no child".
#[derive(Debug, Clone)]
pub struct DenseBranch {
    slots: Box<[NodeId; 128]>,
}

impl Default for DenseBranch {
    fn default() -> Self {
        Self {
            slots: Box::new([0; 128]),
        }
    }
}

impl Branching for DenseBranch {
    fn accepts(byte: u8) -> bool {
        byte.is_ascii()
    }

    fn child(&self, byte: u8) -> Option<NodeId> {
        self.slots
            .get(byte as usize)
            .copied()
            .filter(|id| *id != ROOT)
    }

    fn set_child(&mut self, byte: u8, id: NodeId) {
        self.slots[byte as usize] = id;
    }

    fn children(&self) -> Vec<(u8, NodeId)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, id)| **id != ROOT)
            .map(|(b, id)| (b as u8, *id))
            .collect()
    }
}

/// Ordered map of present children only. Accepts every byte value.
#[derive(Debug, Clone, Default)]
pub struct SparseBranch {
    slots: BTreeMap<u8, NodeId>,
}

impl Branching for SparseBranch {
    fn accepts(_byte: u8) -> bool {
        true
    }

    fn child(&self, byte: u8) -> Option<NodeId> {
        self.slots.get(&byte).copied()
    }

    fn set_child(&mut self, byte: u8, id: NodeId) {
        self.slots.insert(byte, id);
    }

    fn children(&self) -> Vec<(u8, NodeId)> {
        self.slots.iter().map(|(b, id)| (*b, *id)).collect()
    }
}

#[derive(Debug, Clone)]
struct Node<V, B> {
    children: B,
    /// Entries of patterns ending exactly here.
    exact: Option<HashMap<String, V>>,
    /// Entries of `<path to here>*` patterns. `Some` marks a wildcard boundary.
    wildcard: Option<HashMap<String, V>>,
}

impl<V, B: Branching> Node<V, B> {
    fn new() -> Self {
        Self {
            children: B::default(),
            exact: None,
            wildcard: None,
        }
    }
}

/// A validated insertion pattern.
struct Pattern<'a> {
    literal: &'a [u8],
    wildcard: bool,
}

#[derive(Debug, Clone)]
pub struct PrefixTrie<V, B = DenseBranch> {
    nodes: Vec<Node<V, B>>,
    /// Entries seen at a node that holds none of its own. Always empty.
    no_entries: HashMap<String, V>,
}

impl<V: Clone, B: Branching> Default for PrefixTrie<V, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, B: Branching> PrefixTrie<V, B> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new()],
            no_entries: HashMap::new(),
        }
    }

    /// Check a prefix without touching the trie.
    pub fn validate_prefix(prefix: &str) -> Result<(), AuthzError> {
        Self::parse_pattern(prefix).map(|_| ())
    }

    /// The whole prefix is checked before any node is created, so a rejected
    /// insertion leaves the trie untouched.
    fn parse_pattern(prefix: &str) -> Result<Pattern<'_>, AuthzError> {
        let bytes = prefix.as_bytes();
        let Some((&last, head)) = bytes.split_last() else {
            return Err(AuthzError::EmptyPrefix);
        };

        if head.contains(&b'*') {
            return Err(AuthzError::InvalidWildcardPosition {
                prefix: prefix.to_string(),
            });
        }

        let wildcard = last == b'*';
        let literal = if wildcard { head } else { bytes };

        if let Some((position, &byte)) = literal.iter().enumerate().find(|(_, b)| !B::accepts(**b)) {
            return Err(AuthzError::UnsupportedCharacter {
                prefix: prefix.to_string(),
                byte,
                position,
            });
        }

        Ok(Pattern { literal, wildcard })
    }

    /// Walk the pattern, creating missing nodes, and return the map the
    /// pattern's entries belong in.
    fn entries_mut(&mut self, prefix: &str) -> Result<&mut HashMap<String, V>, AuthzError> {
        let pattern = Self::parse_pattern(prefix)?;

        let mut id = ROOT;
        for &byte in pattern.literal {
            id = match self.nodes[id as usize].children.child(byte) {
                Some(child) => child,
                None => {
                    let child = self.nodes.len() as NodeId;
                    self.nodes.push(Node::new());
                    self.nodes[id as usize].children.set_child(byte, child);
                    child
                }
            };
        }

        let node = &mut self.nodes[id as usize];
        let slot = if pattern.wildcard {
            &mut node.wildcard
        } else {
            &mut node.exact
        };
        Ok(slot.get_or_insert_with(HashMap::new))
    }

    /// Set `key` to `value` under `prefix`, replacing any previous value.
    pub fn insert(&mut self, prefix: &str, key: impl Into<String>, value: V) -> Result<(), AuthzError> {
        self.entries_mut(prefix)?.insert(key.into(), value);
        Ok(())
    }

    /// Replace every entry stored under `prefix`.
    pub fn set_all(&mut self, prefix: &str, entries: HashMap<String, V>) -> Result<(), AuthzError> {
        *self.entries_mut(prefix)? = entries;
        Ok(())
    }

    /// Merge entries under `prefix`, overwriting by key.
    pub fn add_all<I>(&mut self, prefix: &str, entries: I) -> Result<(), AuthzError>
    where
        I: IntoIterator<Item = (String, V)>,
    {
        self.entries_mut(prefix)?.extend(entries);
        Ok(())
    }

    /// Find the entry map that decides `query`, if any pattern matches it.
    fn resolve(&self, query: &str) -> Option<&HashMap<String, V>> {
        let mut candidate: Option<NodeId> = None;
        let mut id = ROOT;

        for &byte in query.as_bytes() {
            let node = &self.nodes[id as usize];
            if node.wildcard.is_some() {
                candidate = Some(id);
            }
            match node.children.child(byte) {
                Some(child) => id = child,
                None => return self.wildcard_entries(candidate),
            }
        }

        if id == ROOT {
            return self.wildcard_entries(Some(ROOT));
        }

        let node = &self.nodes[id as usize];
        Some(
            node.exact
                .as_ref()
                .or(node.wildcard.as_ref())
                .unwrap_or(&self.no_entries),
        )
    }

    fn wildcard_entries(&self, candidate: Option<NodeId>) -> Option<&HashMap<String, V>> {
        candidate.and_then(|id| self.nodes[id as usize].wildcard.as_ref())
    }

    /// Value for `key` at the pattern that decides `query`.
    pub fn matches(&self, query: &str, key: &str) -> Result<V, AuthzError> {
        let entries = self.match_prefix(query)?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| AuthzError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Every entry at the pattern that decides `query`.
    pub fn match_prefix(&self, query: &str) -> Result<&HashMap<String, V>, AuthzError> {
        self.resolve(query).ok_or_else(|| AuthzError::NoPrefixMatch {
            resource: query.to_string(),
        })
    }

    /// Structural lookup of an inserted pattern. Wildcard boundaries along the
    /// way are ignored; a trailing `*` reads the pattern's wildcard entries.
    pub fn get(&self, prefix: &str, key: &str) -> Result<V, AuthzError> {
        let (literal, wildcard) = match prefix.strip_suffix('*') {
            Some(head) => (head, true),
            None => (prefix, false),
        };

        let mut id = ROOT;
        for &byte in literal.as_bytes() {
            id = self.nodes[id as usize]
                .children
                .child(byte)
                .ok_or_else(|| AuthzError::PrefixNotFound {
                    prefix: prefix.to_string(),
                })?;
        }

        let node = &self.nodes[id as usize];
        let entries = if wildcard { &node.wildcard } else { &node.exact };
        entries
            .as_ref()
            .and_then(|e| e.get(key))
            .cloned()
            .ok_or_else(|| AuthzError::KeyNotFound {
                key: key.to_string(),
            })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children_of(&self, id: NodeId) -> Vec<(u8, NodeId)> {
        self.nodes
            .get(id as usize)
            .map(|n| n.children.children())
            .unwrap_or_default()
    }

    pub fn is_wildcard_boundary(&self, id: NodeId) -> bool {
        self.nodes
            .get(id as usize)
            .is_some_and(|n| n.wildcard.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corp_tree() -> PrefixTrie<i32> {
        let mut tree = PrefixTrie::new();
        tree.insert("www.corpA.com/*", "John", 100).unwrap();
        tree.insert("www.corpA.com/*", "Jim", 100).unwrap();
        tree.insert("www.corpA.com/admin", "John", 100).unwrap();
        tree
    }

    #[test]
    fn test_insert_then_get() {
        let tree = corp_tree();
        assert_eq!(tree.get("www.corpA.com/admin", "John").unwrap(), 100);
        assert_eq!(tree.get("www.corpA.com/*", "Jim").unwrap(), 100);
    }

    #[test]
    fn test_get_nonexistent() {
        let tree = corp_tree();
        let err = tree.get("www.corpC.com/", "John").unwrap_err();
        assert!(matches!(err, AuthzError::PrefixNotFound { .. }));

        let err = tree.get("www.corpA.com/admin", "nox_subject").unwrap_err();
        assert!(matches!(err, AuthzError::KeyNotFound { .. }));

        // Interior node: exists structurally but holds no entries
        let err = tree.get("www.corpA.com/adm", "John").unwrap_err();
        assert!(matches!(err, AuthzError::KeyNotFound { .. }));
    }

    #[test]
    fn test_get_ignores_wildcards() {
        let tree = corp_tree();
        // "www.corpA.com/x" would match the wildcard, but get is structural
        let err = tree.get("www.corpA.com/x", "John").unwrap_err();
        assert!(matches!(err, AuthzError::PrefixNotFound { .. }));
    }

    #[test]
    fn test_match_through_wildcard() {
        let tree = corp_tree();
        assert_eq!(tree.matches("www.corpA.com/someresource", "John").unwrap(), 100);
    }

    #[test]
    fn test_longest_prefix_precedence() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("a/*", "u", 1).unwrap();
        tree.insert("a/b", "u", 2).unwrap();

        assert_eq!(tree.matches("a/b", "u").unwrap(), 2);
        assert_eq!(tree.matches("a/bc", "u").unwrap(), 1);
    }

    #[test]
    fn test_deepest_wildcard_wins() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("a/*", "u", 1).unwrap();
        tree.insert("a/b/*", "u", 2).unwrap();

        assert_eq!(tree.matches("a/b/c/d", "u").unwrap(), 2);
        assert_eq!(tree.matches("a/bx", "u").unwrap(), 1);
    }

    #[test]
    fn test_exact_miss_does_not_fall_back() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("a/*", "u", 1).unwrap();
        tree.insert("a/", "v", 7).unwrap();

        let err = tree.matches("a/", "u").unwrap_err();
        assert!(matches!(err, AuthzError::KeyNotFound { key } if key == "u"));
    }

    #[test]
    fn test_wildcard_matches_itself() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("a/*", "u", 1).unwrap();
        assert_eq!(tree.matches("a/", "u").unwrap(), 1);
    }

    #[test]
    fn test_interior_node_is_a_hard_miss() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("a/*", "u", 1).unwrap();
        tree.insert("a/bcd", "u", 2).unwrap();

        let err = tree.matches("a/bc", "u").unwrap_err();
        assert!(matches!(err, AuthzError::KeyNotFound { key } if key == "u"));
        assert!(tree.match_prefix("a/bc").unwrap().is_empty());

        // one byte past the interior node leaves the walk early
        assert_eq!(tree.matches("a/bx", "u").unwrap(), 1);
        assert_eq!(tree.matches("a/bcd", "u").unwrap(), 2);
    }

    #[test]
    fn test_miss_at_wildcard_is_key_not_found() {
        let tree = corp_tree();
        let err = tree.matches("www.corpA.com/x", "nobody").unwrap_err();
        assert!(matches!(err, AuthzError::KeyNotFound { .. }));
    }

    #[test]
    fn test_no_prefix_match() {
        let tree = corp_tree();
        let err = tree.matches("www.corpB.com/", "John").unwrap_err();
        assert!(matches!(err, AuthzError::NoPrefixMatch { .. }));

        let err = tree.match_prefix("").unwrap_err();
        assert!(matches!(err, AuthzError::NoPrefixMatch { .. }));
    }

    #[test]
    fn test_root_wildcard_matches_everything() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("*", "u", 3).unwrap();
        assert_eq!(tree.matches("anything/at/all", "u").unwrap(), 3);
        assert_eq!(tree.matches("", "u").unwrap(), 3);
    }

    #[test]
    fn test_match_prefix_returns_whole_map() {
        let tree = corp_tree();
        let entries = tree.match_prefix("www.corpA.com/x").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["Jim"], 100);

        let entries = tree.match_prefix("www.corpA.com/admin").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_invalid_prefixes() {
        let mut tree = PrefixTrie::<i32>::new();
        assert!(matches!(
            tree.insert("a*b/c", "u", 1).unwrap_err(),
            AuthzError::InvalidWildcardPosition { .. }
        ));
        assert!(matches!(
            tree.insert("**", "u", 1).unwrap_err(),
            AuthzError::InvalidWildcardPosition { .. }
        ));
        assert!(matches!(
            tree.insert("", "u", 1).unwrap_err(),
            AuthzError::EmptyPrefix
        ));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_unsupported_character_leaves_no_nodes() {
        let mut tree = PrefixTrie::<i32>::new();
        let err = tree.insert("abc/é", "u", 1).unwrap_err();
        assert!(matches!(
            err,
            AuthzError::UnsupportedCharacter { position: 4, .. }
        ));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_sparse_branch_accepts_utf8() {
        let mut tree = PrefixTrie::<i32, SparseBranch>::new();
        tree.insert("café/*", "u", 5).unwrap();
        assert_eq!(tree.matches("café/menu", "u").unwrap(), 5);
        assert_eq!(tree.get("café/*", "u").unwrap(), 5);
    }

    #[test]
    fn test_dense_lookup_with_non_ascii_query() {
        let tree = corp_tree();
        assert_eq!(tree.matches("www.corpA.com/ü", "Jim").unwrap(), 100);
    }

    #[test]
    fn test_idempotent_overwrite() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("p", "k", 1).unwrap();
        tree.insert("p", "k", 2).unwrap();
        assert_eq!(tree.get("p", "k").unwrap(), 2);
    }

    #[test]
    fn test_set_all_replaces_and_add_all_merges() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("p/*", "old", 1).unwrap();

        tree.add_all("p/*", [("new".to_string(), 2)]).unwrap();
        assert_eq!(tree.get("p/*", "old").unwrap(), 1);
        assert_eq!(tree.get("p/*", "new").unwrap(), 2);

        tree.set_all("p/*", HashMap::from([("only".to_string(), 3)]))
            .unwrap();
        assert!(tree.get("p/*", "old").is_err());
        assert_eq!(tree.get("p/*", "only").unwrap(), 3);
    }

    #[test]
    fn test_structure_accessors() {
        let mut tree = PrefixTrie::<i32>::new();
        tree.insert("ab*", "u", 1).unwrap();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.children_of(ROOT), vec![(b'a', 1)]);
        assert!(tree.is_wildcard_boundary(2));
        assert!(!tree.is_wildcard_boundary(1));
        assert!(tree.children_of(99).is_empty());
    }
}
