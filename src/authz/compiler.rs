use crate::authz::errors::AuthzError;
use crate::authz::trie::{Branching, PrefixTrie};
use crate::authz::types::{Permissions, Rule, Verb};

/// OR together the bits of each verb name. An empty list compiles to
/// [`Permissions::NONE`], an explicit deny-all.
pub fn compile<S: AsRef<str>>(verbs: &[S]) -> Result<Permissions, AuthzError> {
    verbs.iter().try_fold(Permissions::NONE, |acc, name| {
        let verb: Verb = name.as_ref().parse()?;
        Ok(acc | verb)
    })
}

/// Translate one rule into trie entries. Every ACL entry and the resource
/// pattern are validated first, so a rejected rule leaves the trie unchanged.
pub fn compile_rule<B: Branching>(
    rule: &Rule,
    trie: &mut PrefixTrie<Permissions, B>,
) -> Result<(), AuthzError> {
    PrefixTrie::<Permissions, B>::validate_prefix(&rule.resource)?;

    let entries = rule
        .acl
        .iter()
        .map(|(subject, verbs)| Ok((subject.clone(), compile(verbs)?)))
        .collect::<Result<Vec<_>, AuthzError>>()?;

    tracing::trace!(
        resource = %rule.resource,
        entries = entries.len(),
        "Compiled rule"
    );

    trie.add_all(&rule.resource, entries)
}
