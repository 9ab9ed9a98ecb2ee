use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Prefix cannot be empty")]
    #[diagnostic(
        code(prefix_authz::trie::empty_prefix),
        help("Use a literal resource such as \"www.corpA.com/admin\" or a pattern such as \"www.corpA.com/*\"")
    )]
    EmptyPrefix,

    #[error("Prefix `{prefix}` contains '*' before its last character")]
    #[diagnostic(
        code(prefix_authz::trie::wildcard_position),
        help("A wildcard is only allowed as the final character of a pattern")
    )]
    InvalidWildcardPosition { prefix: String },

    #[error("Prefix `{prefix}` contains unsupported byte 0x{byte:02x} at position {position}")]
    #[diagnostic(
        code(prefix_authz::trie::unsupported_character),
        help("The dense trie only accepts ASCII resource paths")
    )]
    UnsupportedCharacter {
        prefix: String,
        byte: u8,
        position: usize,
    },

    #[error("Unknown verb `{0}`")]
    #[diagnostic(
        code(prefix_authz::compiler::unknown_verb),
        help("Recognized verbs: GET, PUT, POST, DELETE, UPDATE")
    )]
    UnknownVerb(String),

    #[error("Key `{key}` does not exist")]
    #[diagnostic(code(prefix_authz::lookup::key_not_found))]
    KeyNotFound { key: String },

    #[error("Prefix `{prefix}` does not exist")]
    #[diagnostic(code(prefix_authz::lookup::prefix_not_found))]
    PrefixNotFound { prefix: String },

    #[error("No rule matches `{resource}`")]
    #[diagnostic(code(prefix_authz::lookup::no_prefix_match))]
    NoPrefixMatch { resource: String },

    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(prefix_authz::policy_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid policy: {0}")]
    #[diagnostic(
        code(prefix_authz::invalid_policy),
        help("Each policy file must contain `rule` or `group` KDL nodes")
    )]
    InvalidPolicy(String),

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(prefix_authz::kdl_parse),
        help("Check your KDL file syntax at https://kdl.dev")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(prefix_authz::io))]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// True for the ordinary negative outcomes of a read. Hosts map these to deny.
    pub fn is_negative_lookup(&self) -> bool {
        matches!(
            self,
            AuthzError::KeyNotFound { .. }
                | AuthzError::PrefixNotFound { .. }
                | AuthzError::NoPrefixMatch { .. }
        )
    }
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthzError::EmptyPrefix
            | AuthzError::InvalidWildcardPosition { .. }
            | AuthzError::UnsupportedCharacter { .. }
            | AuthzError::UnknownVerb(_)
            | AuthzError::InvalidPolicy(_)
            | AuthzError::KdlParse(_) => StatusCode::BAD_REQUEST,
            e if e.is_negative_lookup() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
