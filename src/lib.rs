//! prefix-authz - prefix/wildcard ACL decision engine
//!
//! Given a subject and a resource path, computes the set of permitted verbs by
//! matching the resource against prefix rules and combining subject, group and
//! default permissions. Meant to be called once per request by a gateway or
//! reverse proxy.

pub mod authz;
pub mod errors;
pub mod settings;
