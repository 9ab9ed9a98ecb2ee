use std::path::Path;

use crate::authz::errors::AuthzError;
use crate::authz::policy::parse_kdl_document;
use crate::authz::rulebase::Rulebase;
use crate::authz::types::*;

/// Load all `.kdl` policy files from the given directory and compile them
/// into a single `Rulebase`.
pub fn load_policies(
    dir: &Path,
    default_access: Permissions,
    default_mode: DefaultMode,
) -> Result<Rulebase, AuthzError> {
    if !dir.is_dir() {
        return Err(AuthzError::InvalidPolicy(format!(
            "policies directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut all_parsed = Vec::new();

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    for entry in &entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| AuthzError::PolicyLoadError {
                path: path.display().to_string(),
                source,
            })?;
        all_parsed.push(parse_kdl_document(&contents)?);
    }

    let rulebase = compile_policies(all_parsed, default_access, default_mode)?;

    tracing::info!(
        files = entries.len(),
        rules = rulebase.rule_count(),
        groups = rulebase.groups().group_count(),
        nodes = rulebase.trie().node_count(),
        default_access = %rulebase.default_access(),
        default_mode = ?rulebase.default_mode(),
        "Loaded authorization policies"
    );

    Ok(rulebase)
}

/// Merge all parsed policies into one `Rulebase`. Rules apply in file order,
/// so a later rule for the same pattern and subject overwrites an earlier one.
pub fn compile_policies(
    parsed: Vec<ParsedPolicy>,
    default_access: Permissions,
    default_mode: DefaultMode,
) -> Result<Rulebase, AuthzError> {
    let mut rules: Vec<Rule> = Vec::new();
    let mut groups: Vec<GroupRecord> = Vec::new();

    for p in parsed {
        rules.extend(p.rules);
        groups.extend(p.groups);
    }

    Rulebase::build(&rules, &groups, default_access, default_mode)
}
