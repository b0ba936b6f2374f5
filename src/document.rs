use std::collections::BTreeMap;
use std::{fs, io, path::Path};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Config file {0} not found")]
    ConfigNotFound(String),

    #[error("Config file {path} is not a valid document: {reason}")]
    ConfigParseError { path: String, reason: String },

    #[error("Validation errors in {path}: {reason}")]
    ValidationError { path: String, reason: String },

    #[error("Config file {path} declares schema version {version}, expected {}", SCHEMA_VERSION)]
    UnsupportedVersion { path: String, version: u32 },

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Http,
    Worker,
    Lambda,
    Frontend,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Http,
        ServiceKind::Worker,
        ServiceKind::Lambda,
        ServiceKind::Frontend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Http => "http",
            ServiceKind::Worker => "worker",
            ServiceKind::Lambda => "lambda",
            ServiceKind::Frontend => "frontend",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type EnvMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcsDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Tenant {
    pub tenant: String,
    pub subdomain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_settings: Option<serde_json::Map<String, Value>>,
}

/// Either a single value or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nginx_sidecar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queues: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nginx_sidecar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LambdaEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nginx_sidecar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FrontendEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nginx_sidecar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenants: Option<Vec<Tenant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefaults>,
}

/// Per-kind maps of service records, keyed by service name in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSet {
    #[serde(default)]
    pub http: IndexMap<String, HttpEntry>,
    #[serde(default)]
    pub worker: IndexMap<String, WorkerEntry>,
    #[serde(default)]
    pub lambda: IndexMap<String, LambdaEntry>,
    #[serde(default)]
    pub frontend: IndexMap<String, FrontendEntry>,
}

impl ServiceSet {
    pub fn of(&self, kind: ServiceKind) -> &dyn ServiceMap {
        match kind {
            ServiceKind::Http => &self.http,
            ServiceKind::Worker => &self.worker,
            ServiceKind::Lambda => &self.lambda,
            ServiceKind::Frontend => &self.frontend,
        }
    }
}

/// Records of one kind keyed by service name, read back as JSON for merging.
pub trait ServiceMap {
    fn names(&self) -> Vec<&str>;

    fn contains(&self, name: &str) -> bool;

    fn record(&self, name: &str) -> Result<Option<Value>, serde_json::Error>;

    fn records(&self) -> Result<Vec<(String, Value)>, serde_json::Error>;
}

impl<T: Serialize> ServiceMap for IndexMap<String, T> {
    fn names(&self) -> Vec<&str> {
        return self.keys().map(String::as_str).collect();
    }

    fn contains(&self, name: &str) -> bool {
        return self.contains_key(name);
    }

    fn record(&self, name: &str) -> Result<Option<Value>, serde_json::Error> {
        return self.get(name).map(serde_json::to_value).transpose();
    }

    fn records(&self) -> Result<Vec<(String, Value)>, serde_json::Error> {
        return self
            .iter()
            .map(|(name, entry)| serde_json::to_value(entry).map(|value| (name.clone(), value)))
            .collect();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefaults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<LambdaEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<FrontendEntry>,
}

impl KindDefaults {
    pub fn for_kind(&self, kind: ServiceKind) -> Result<Option<Value>, serde_json::Error> {
        let defaults = match kind {
            ServiceKind::Http => self.http.as_ref().map(serde_json::to_value),
            ServiceKind::Worker => self.worker.as_ref().map(serde_json::to_value),
            ServiceKind::Lambda => self.lambda.as_ref().map(serde_json::to_value),
            ServiceKind::Frontend => self.frontend.as_ref().map(serde_json::to_value),
        };

        return defaults.transpose();
    }
}

/// The customer-agnostic service catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseCatalog {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub defaults: KindDefaults,

    #[serde(default)]
    pub services: ServiceSet,
}

impl Default for BaseCatalog {
    fn default() -> Self {
        return Self {
            version: SCHEMA_VERSION,
            defaults: KindDefaults::default(),
            services: ServiceSet::default(),
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefaults>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalOverrides>,

    #[serde(default)]
    pub http: IndexMap<String, HttpEntry>,
    #[serde(default)]
    pub worker: IndexMap<String, WorkerEntry>,
    #[serde(default)]
    pub lambda: IndexMap<String, LambdaEntry>,
    #[serde(default)]
    pub frontend: IndexMap<String, FrontendEntry>,
}

impl Overrides {
    pub fn of(&self, kind: ServiceKind) -> &dyn ServiceMap {
        match kind {
            ServiceKind::Http => &self.http,
            ServiceKind::Worker => &self.worker,
            ServiceKind::Lambda => &self.lambda,
            ServiceKind::Frontend => &self.frontend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CustomerDocument {
    #[serde(default = "default_version")]
    pub version: u32,

    #[validate(length(min = 1))]
    pub customer: String,

    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default)]
    pub enable: Vec<String>,

    #[serde(default)]
    pub disable: Vec<String>,

    #[serde(default)]
    pub overrides: Overrides,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

trait Versioned {
    fn version(&self) -> u32;
}

impl Versioned for BaseCatalog {
    fn version(&self) -> u32 {
        self.version
    }
}

impl Versioned for CustomerDocument {
    fn version(&self) -> u32 {
        self.version
    }
}

pub fn load_catalog(path: &Path) -> Result<BaseCatalog, Error> {
    return load(path);
}

pub fn load_customer(path: &Path) -> Result<CustomerDocument, Error> {
    let document: CustomerDocument = load(path)?;

    match document.validate() {
        Ok(_) => (),
        Err(error) => {
            return Err(Error::ValidationError {
                path: path.display().to_string(),
                reason: error.to_string(),
            })
        }
    }

    return Ok(document);
}

/// Reads a config source, telling a missing file apart from other I/O failures.
pub(crate) fn read_source<E>(
    path: &Path,
    not_found: impl FnOnce(String) -> E,
    unknown: impl FnOnce(String) -> E,
) -> Result<String, E> {
    return match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            Err(not_found(path.display().to_string()))
        }
        Err(error) => Err(unknown(error.to_string())),
    };
}

fn load<T: DeserializeOwned + Versioned>(path: &Path) -> Result<T, Error> {
    let contents = read_source(path, Error::ConfigNotFound, Error::Unknown)?;

    let document: T = match serde_json::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ConfigParseError {
            path: path.display().to_string(),
            reason: error.to_string(),
        }),
    }?;

    if document.version() != SCHEMA_VERSION {
        return Err(Error::UnsupportedVersion {
            path: path.display().to_string(),
            version: document.version(),
        });
    }

    tracing::debug!(path = %path.display(), "Loaded config document");
    return Ok(document);
}
