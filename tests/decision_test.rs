use std::collections::BTreeMap;

use prefix_authz::authz::policy::parse_kdl_document;
use prefix_authz::authz::{loader, DefaultMode, GroupRecord, Permissions, Rule, Rulebase, Verb};

const CORP_POLICY: &str = r#"
rule "www.corpA.com/*" {
    acl "Jim" "GET"
    acl "John" "GET" "PUT"
    acl "auditors" "GET"
}

rule "www.corpA.com/admin" {
    acl "Jim"
    acl "admins" "GET" "PUT" "POST" "DELETE"
}

rule "www.corpA.com/admin/*" {
    acl "admins" "GET" "UPDATE"
}

group "admins" {
    - "John"
}

group "auditors" {
    - "Kate"
}
"#;

fn corp_rulebase(default_access: Permissions, mode: DefaultMode) -> Rulebase {
    let parsed = parse_kdl_document(CORP_POLICY).unwrap();
    loader::compile_policies(vec![parsed], default_access, mode).unwrap()
}

#[test]
fn test_corp_policy_decisions() {
    let rb = corp_rulebase(Permissions::NONE, DefaultMode::Additive);

    assert_eq!(rb.decide("Jim", "www.corpA.com/index.html"), Permissions::from(Verb::Get));
    assert_eq!(rb.decide("John", "www.corpA.com/index.html"), Verb::Get | Verb::Put);
    assert_eq!(rb.decide("Kate", "www.corpA.com/reports"), Permissions::from(Verb::Get));

    // explicit deny at the exact admin page
    assert_eq!(rb.decide("Jim", "www.corpA.com/admin"), Permissions::NONE);
    assert_eq!(
        rb.decide("John", "www.corpA.com/admin"),
        Verb::Get | Verb::Put | Verb::Post | Verb::Delete
    );

    // below admin/ only the deeper wildcard applies
    assert_eq!(rb.decide("John", "www.corpA.com/admin/users"), Verb::Get | Verb::Update);
    assert_eq!(rb.decide("Jim", "www.corpA.com/admin/users"), Permissions::NONE);
}

#[test]
fn test_unmatched_resource_uses_default_for_everyone() {
    let rb = corp_rulebase(Permissions::from(Verb::Get), DefaultMode::Additive);
    for subject in ["Jim", "John", "Kate", "stranger"] {
        assert_eq!(rb.decide(subject, "www.corpB.com/"), Permissions::from(Verb::Get));
    }
}

#[test]
fn test_default_modes_differ_on_explicit_entries() {
    let additive = corp_rulebase(Permissions::from(Verb::Get), DefaultMode::Additive);
    let fallback = corp_rulebase(Permissions::from(Verb::Get), DefaultMode::Fallback);

    // Jim is explicitly denied on the admin page
    assert_eq!(additive.decide("Jim", "www.corpA.com/admin"), Permissions::from(Verb::Get));
    assert_eq!(fallback.decide("Jim", "www.corpA.com/admin"), Permissions::NONE);

    // Kate has no entry on the admin page at all
    assert_eq!(fallback.decide("Kate", "www.corpA.com/admin"), Permissions::from(Verb::Get));
}

#[test]
fn test_lookup_subject_matches_trie_semantics() {
    let rb = corp_rulebase(Permissions::from(Verb::Delete), DefaultMode::Additive);

    assert_eq!(rb.lookup_subject("John", "www.corpA.com/x"), Verb::Get | Verb::Put);
    // John only reaches the admin page through a group
    assert_eq!(
        rb.lookup_subject("John", "www.corpA.com/admin"),
        Permissions::from(Verb::Delete)
    );
}

#[test]
fn test_build_from_records() {
    let rules = vec![Rule {
        resource: "api.example.com/v1/*".into(),
        acl: BTreeMap::from([("svc".to_string(), vec!["POST".to_string()])]),
    }];
    let groups = vec![GroupRecord {
        group: "svc".into(),
        members: vec!["billing".into(), "billing".into()],
    }];

    let rb = Rulebase::build(&rules, &groups, Permissions::NONE, DefaultMode::Fallback).unwrap();
    assert!(rb.is_allowed("billing", "api.example.com/v1/invoices", Verb::Post));
    assert!(!rb.is_allowed("billing", "api.example.com/v2/invoices", Verb::Post));
    assert_eq!(rb.groups().groups_of("billing").count(), 1);
}
