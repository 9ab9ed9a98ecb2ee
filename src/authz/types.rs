use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::authz::errors::AuthzError;

/// Operation verbs recognized by the rule compiler. The discriminant is the bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Verb {
    Get = 1,
    Put = 2,
    Post = 4,
    Delete = 8,
    Update = 16,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Put, Verb::Post, Verb::Delete, Verb::Update];

    pub fn bit(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Delete => "DELETE",
            Verb::Update => "UPDATE",
        }
    }
}

impl FromStr for Verb {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| AuthzError::UnknownVerb(s.to_string()))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask of permitted verbs. `Permissions::NONE` is an explicit deny-all,
/// not the absence of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(u32);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, verb: Verb) -> bool {
        self.0 & verb.bit() != 0
    }

    pub fn verbs(self) -> Vec<Verb> {
        Verb::ALL.into_iter().filter(|v| self.contains(*v)).collect()
    }
}

impl From<Verb> for Permissions {
    fn from(verb: Verb) -> Self {
        Self(verb.bit())
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOr<Verb> for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Verb) -> Self::Output {
        Permissions(self.0 | rhs.bit())
    }
}

impl BitOr for Verb {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions(self.bit() | rhs.bit())
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names: Vec<&str> = self.verbs().into_iter().map(Verb::as_str).collect();
        f.write_str(&names.join("|"))
    }
}

/// How the default access mask combines with matched entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultMode {
    /// Default applies only when neither the subject nor its groups have an entry.
    Fallback,
    /// Default is always OR'd in as a floor.
    #[default]
    Additive,
}

// ---------- Build-time records ----------

/// A resource pattern and the verbs each subject or group holds on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// e.g. "www.corpA.com/*"
    pub resource: String,
    /// subject or group name -> verb names; an empty list denies everything
    pub acl: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group: String,
    pub members: Vec<String>,
}

/// Intermediate result from parsing a single KDL file.
#[derive(Debug, Clone, Default)]
pub struct ParsedPolicy {
    pub rules: Vec<Rule>,
    pub groups: Vec<GroupRecord>,
}

// ---------- API request/response types ----------

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    /// e.g. "Jim"
    pub subject: String,
    /// e.g. "www.corpA.com/admin"
    pub resource: String,
}

#[derive(Debug, Serialize)]
pub struct DecideResponse {
    pub permissions: Permissions,
    pub verbs: Vec<String>,
}

impl From<Permissions> for DecideResponse {
    fn from(permissions: Permissions) -> Self {
        Self {
            permissions,
            verbs: permissions
                .verbs()
                .into_iter()
                .map(|v| v.as_str().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub subject: String,
    pub resource: String,
    /// e.g. "PUT"
    pub verb: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub rules: usize,
    pub groups: usize,
}
