use std::collections::{BTreeSet, HashMap};

use crate::authz::types::GroupRecord;

/// subject name -> groups the subject belongs to
#[derive(Debug, Clone, Default)]
pub struct GroupDirectory {
    memberships: HashMap<String, BTreeSet<String>>,
}

impl GroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `group` to each member's set. Repeated declarations are absorbed.
    pub fn add_group<S: AsRef<str>>(&mut self, group: &str, members: &[S]) {
        for member in members {
            self.memberships
                .entry(member.as_ref().to_string())
                .or_default()
                .insert(group.to_string());
        }
    }

    pub fn add_groups<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a GroupRecord>,
    {
        for record in records {
            self.add_group(&record.group, &record.members);
        }
    }

    /// Groups of `subject`, in name order. Unknown subjects belong to none.
    pub fn groups_of(&self, subject: &str) -> impl Iterator<Item = &str> {
        self.memberships
            .get(subject)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of distinct groups declared.
    pub fn group_count(&self) -> usize {
        self.memberships
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    }
}
