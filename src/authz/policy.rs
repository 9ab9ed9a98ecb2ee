use std::collections::BTreeMap;

use crate::authz::errors::AuthzError;
use crate::authz::types::*;
use kdl::KdlDocument;

/// Parse a KDL document string into rule and group records.
///
/// ```kdl
/// rule "www.corpA.com/*" {
///     acl "Jim" "GET" "PUT"
///     acl "guests"
/// }
///
/// group "admins" {
///     - "Jim"
/// }
/// ```
pub fn parse_kdl_document(source: &str) -> Result<ParsedPolicy, AuthzError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AuthzError::KdlParse(e.to_string()))?;

    let mut policy = ParsedPolicy::default();

    for node in doc.nodes() {
        match node.name().value() {
            "rule" => {
                let resource = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(
                        "rule node requires a resource argument (e.g. rule \"www.corpA.com/*\")"
                            .into(),
                    )
                })?;

                let mut acl = BTreeMap::new();

                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "acl" => {
                                let mut args = acl_args(child, &resource)?.into_iter();
                                let subject = args.next().ok_or_else(|| {
                                    AuthzError::InvalidPolicy(format!(
                                        "acl entry in rule `{resource}` requires a subject (e.g. acl \"Jim\" \"GET\")"
                                    ))
                                })?;
                                acl.insert(subject, args.collect());
                            }
                            other => {
                                return Err(AuthzError::InvalidPolicy(format!(
                                    "unexpected child `{other}` in rule `{resource}` (expected `acl`)"
                                )));
                            }
                        }
                    }
                }

                policy.rules.push(Rule { resource, acl });
            }
            "group" => {
                let group = first_string_arg(node).ok_or_else(|| {
                    AuthzError::InvalidPolicy(
                        "group node requires a string argument (e.g. group \"admins\")".into(),
                    )
                })?;

                let members = dash_list(node);
                policy.groups.push(GroupRecord { group, members });
            }
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(policy)
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &kdl::KdlNode) -> Option<String> {
    string_args(node).into_iter().next()
}

/// All positional string arguments of a node, in order.
fn string_args(node: &kdl::KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

/// Arguments of an `acl` node. Every entry must be a positional string.
fn acl_args(node: &kdl::KdlNode, resource: &str) -> Result<Vec<String>, AuthzError> {
    let mut args = Vec::new();
    for entry in node.entries() {
        let subject = args.first().map(String::as_str).unwrap_or("<none>");
        if let Some(name) = entry.name() {
            return Err(AuthzError::InvalidPolicy(format!(
                "acl entry for `{subject}` in rule `{resource}` has property `{}`; list verbs as plain strings",
                name.value()
            )));
        }
        let Some(value) = entry.value().as_string() else {
            return Err(AuthzError::InvalidPolicy(format!(
                "acl entry for `{subject}` in rule `{resource}` has non-string value `{}`",
                entry.value()
            )));
        };
        args.push(value.to_string());
    }
    Ok(args)
}

/// Extract dash-list children: nodes named "-" whose first argument is a string.
fn dash_list(node: &kdl::KdlNode) -> Vec<String> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    children
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}
