use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::authz::compiler;
use crate::authz::{AuthzError, DefaultMode, Permissions};
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub policies: Policies,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policies {
    /// Directory scanned for `*.kdl` policy files. Default: policies
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Access {
    /// Verbs granted when no rule decides, e.g. ["GET"]
    #[serde(default)]
    pub default: Vec<String>,
    /// `additive` ORs the default into every decision; `fallback` applies it
    /// only when neither the subject nor its groups have an entry.
    #[serde(default)]
    pub mode: DefaultMode,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8181,
        }
    }
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("policies"),
        }
    }
}

impl Access {
    pub fn default_permissions(&self) -> Result<Permissions, AuthzError> {
        compiler::compile(&self.default)
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, AppError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)?
            .set_default("server.port", Server::default().port)?
            .set_default(
                "policies.dir",
                Policies::default().dir.to_string_lossy().to_string(),
            )?
            .set_default("access.default", Vec::<String>::new())?
            .set_default("access.mode", "additive")?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: PREFIX_AUTHZ__SERVER__PORT=9090, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("PREFIX_AUTHZ").separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        if s.policies.dir.is_relative() {
            s.policies.dir = std::env::current_dir()?.join(&s.policies.dir);
        }

        Ok(s)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
