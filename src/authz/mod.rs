pub mod compiler;
pub mod dot;
pub mod errors;
pub mod groups;
pub mod loader;
pub mod policy;
pub mod rulebase;
pub mod trie;
pub mod types;
pub mod web;

pub use errors::AuthzError;
pub use groups::GroupDirectory;
pub use rulebase::{Rulebase, SharedRulebase};
pub use trie::{Branching, DenseBranch, PrefixTrie, SparseBranch};
pub use types::{DefaultMode, GroupRecord, Permissions, Rule, Verb};
