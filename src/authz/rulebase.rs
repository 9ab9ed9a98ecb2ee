//! The decision point: a compiled prefix trie, a group directory and a default
//! access mask.
//!
//! A `Rulebase` is built single-threaded through the `&mut self` methods and
//! then only read. Reads take `&self` and touch no shared mutable state, so a
//! finished rulebase can be shared across threads behind an `Arc`. Mutating a
//! rulebase that is already serving reads is not supported; build a new one
//! and publish it through [`SharedRulebase::replace`].

use std::sync::{Arc, PoisonError, RwLock};

use crate::authz::compiler;
use crate::authz::errors::AuthzError;
use crate::authz::groups::GroupDirectory;
use crate::authz::trie::PrefixTrie;
use crate::authz::types::{DefaultMode, GroupRecord, Permissions, Rule, Verb};

#[derive(Debug, Clone, Default)]
pub struct Rulebase {
    trie: PrefixTrie<Permissions>,
    groups: GroupDirectory,
    default_access: Permissions,
    default_mode: DefaultMode,
    rule_count: usize,
}

impl Rulebase {
    pub fn new(default_access: Permissions, default_mode: DefaultMode) -> Self {
        Self {
            default_access,
            default_mode,
            ..Self::default()
        }
    }

    /// Build a rulebase in one go. Fails on the first rule that does not compile.
    pub fn build(
        rules: &[Rule],
        groups: &[GroupRecord],
        default_access: Permissions,
        default_mode: DefaultMode,
    ) -> Result<Self, AuthzError> {
        let mut rb = Self::new(default_access, default_mode);
        for rule in rules {
            rb.add(rule)?;
        }
        rb.add_groups(groups);
        Ok(rb)
    }

    /// Compile and insert one rule. A rejected rule leaves the rulebase as it was.
    pub fn add(&mut self, rule: &Rule) -> Result<(), AuthzError> {
        compiler::compile_rule(rule, &mut self.trie)?;
        self.rule_count += 1;
        Ok(())
    }

    pub fn add_group<S: AsRef<str>>(&mut self, group: &str, members: &[S]) {
        self.groups.add_group(group, members);
    }

    pub fn add_groups(&mut self, records: &[GroupRecord]) {
        self.groups.add_groups(records);
    }

    pub fn set_default_access(&mut self, default_access: Permissions) {
        self.default_access = default_access;
    }

    pub fn set_default_mode(&mut self, default_mode: DefaultMode) {
        self.default_mode = default_mode;
    }

    pub fn default_access(&self) -> Permissions {
        self.default_access
    }

    pub fn default_mode(&self) -> DefaultMode {
        self.default_mode
    }

    pub fn trie(&self) -> &PrefixTrie<Permissions> {
        &self.trie
    }

    pub fn groups(&self) -> &GroupDirectory {
        &self.groups
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Verbs `subject` may use on `resource`, combining the subject's own
    /// entry, the entries of every group it belongs to, and the default mask.
    pub fn decide(&self, subject: &str, resource: &str) -> Permissions {
        let entries = match self.trie.match_prefix(resource) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::trace!(subject, resource, "No rule matches, applying default");
                return self.default_access;
            }
        };

        let subject_flags = entries.get(subject).copied();
        let group_flags = self
            .groups
            .groups_of(subject)
            .filter_map(|g| entries.get(g).copied())
            .reduce(|acc, p| acc | p);

        let matched = match (subject_flags, group_flags) {
            (None, None) => None,
            (s, g) => Some(s.unwrap_or_default() | g.unwrap_or_default()),
        };

        let decision = match (self.default_mode, matched) {
            (DefaultMode::Additive, m) => m.unwrap_or_default() | self.default_access,
            (DefaultMode::Fallback, Some(m)) => m,
            (DefaultMode::Fallback, None) => self.default_access,
        };

        tracing::debug!(subject, resource, %decision, "Decided access");
        decision
    }

    /// Subject-only lookup: group memberships are ignored, and the default mask
    /// is returned when no rule or no entry for the subject matches.
    pub fn lookup_subject(&self, subject: &str, resource: &str) -> Permissions {
        match self.trie.matches(resource, subject) {
            Ok(permissions) => permissions,
            Err(e) => {
                tracing::trace!(subject, resource, reason = %e, "Lookup missed, applying default");
                self.default_access
            }
        }
    }

    pub fn is_allowed(&self, subject: &str, resource: &str, verb: Verb) -> bool {
        self.decide(subject, resource).contains(verb)
    }
}

/// The rulebase generation currently serving requests.
///
/// Readers take an `Arc` to the current generation and keep it for as long as
/// they need it; a reload swaps in a new generation without touching the old one.
#[derive(Debug)]
pub struct SharedRulebase {
    current: RwLock<Arc<Rulebase>>,
}

impl SharedRulebase {
    pub fn new(rulebase: Rulebase) -> Self {
        Self {
            current: RwLock::new(Arc::new(rulebase)),
        }
    }

    pub fn current(&self) -> Arc<Rulebase> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish a new generation and return the one it replaced.
    pub fn replace(&self, rulebase: Rulebase) -> Arc<Rulebase> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(rulebase))
    }
}
