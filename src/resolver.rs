use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::descriptor::{
    EcsSettings, ResolvedCommon, ResolvedConfig, ResolvedFrontend, ResolvedHttp, ResolvedLambda,
    ResolvedService, ResolvedWorker, DEFAULT_CPU, DEFAULT_MEMORY,
};
use crate::document::{
    self, BaseCatalog, CustomerDocument, EcsDefaults, EnvMap, OneOrMany, ServiceKind, ServiceMap,
    Tenant,
};
use crate::filter::ServiceFilter;
use crate::merge::{deep_merge, merge_at};
use crate::policy::{self, PolicyBundles};
use crate::repository::{derive_repos, tech_and_sidecar};
use crate::stack;

pub const DEFAULT_HTTP_PORT: u16 = 9000;
pub const DEFAULT_HTTP_HEALTH_PATH: &str = "/health";
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;
pub const DEFAULT_FRONTEND_HEALTH_PATH: &str = "/api/health";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Policy(#[from] policy::Error),

    #[error("Override for {kind} service {name} has no entry in the base catalog")]
    UnknownOverrideTarget { kind: ServiceKind, name: String },

    #[error("Merged {kind} service {name} is invalid: {reason}")]
    InvalidEntry {
        kind: ServiceKind,
        name: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Fail on overrides that target services missing from the catalog instead
    /// of dropping them.
    pub strict_overrides: bool,
}

/// The record left after folding every layer of the merge chain.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergedFields {
    image_tag: Option<String>,
    path: Option<String>,
    port: Option<u16>,
    health_path: Option<String>,
    tech: Option<String>,
    nginx_sidecar: Option<bool>,
    policies: Option<Vec<String>>,
    command: Option<Vec<String>>,
    queues: Option<Vec<String>>,
    triggered_by: Option<OneOrMany>,
    env: Option<EnvMap>,
    tenants: Option<Vec<Tenant>>,
    ecs: Option<EcsDefaults>,
}

pub struct Resolver<'a> {
    stack: &'a str,
    catalog: &'a BaseCatalog,
    customer: &'a CustomerDocument,
    filter: ServiceFilter,
    bundles: PolicyBundles,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(stack: &'a str, catalog: &'a BaseCatalog, customer: &'a CustomerDocument) -> Self {
        return Self {
            stack,
            catalog,
            customer,
            filter: ServiceFilter::new(customer.enable.iter().cloned(), customer.disable.iter().cloned()),
            bundles: PolicyBundles::default(),
            options: ResolveOptions::default(),
        };
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        return self;
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, Error> {
        self.check_override_targets()?;

        let mut config = ResolvedConfig {
            customer: self.customer.customer.clone(),
            environment: self.customer.environment.clone(),
            ..ResolvedConfig::default()
        };

        for kind in ServiceKind::ALL {
            let entries = self
                .catalog
                .services
                .of(kind)
                .records()
                .map_err(|error| invalid_entry(kind, "*", error))?;

            for (name, entry) in entries {
                if let Some(service) = self.resolve_one(kind, &name, &entry)? {
                    config.push(service);
                }
            }
        }

        tracing::info!(
            stack = self.stack,
            customer = %config.customer,
            environment = %config.environment,
            http = config.count(ServiceKind::Http),
            worker = config.count(ServiceKind::Worker),
            lambda = config.count(ServiceKind::Lambda),
            frontend = config.count(ServiceKind::Frontend),
            "Resolved service configuration"
        );

        return Ok(config);
    }

    pub fn resolve_one(
        &self,
        kind: ServiceKind,
        name: &str,
        entry: &Value,
    ) -> Result<Option<ResolvedService>, Error> {
        if !self.filter.is_wanted(name) {
            tracing::debug!(%kind, service = name, "Service not enabled for customer, skipping");
            return Ok(None);
        }

        let merged = self.merge_chain(kind, name, entry)?;
        let fields: MergedFields = match serde_json::from_value(merged) {
            Ok(fields) => fields,
            Err(error) => return Err(invalid_entry(kind, name, error)),
        };

        let (tech, nginx_sidecar) = tech_and_sidecar(kind, fields.tech, fields.nginx_sidecar);
        let repos = derive_repos(self.stack, &self.customer.environment, name, nginx_sidecar);
        let policies = self.bundles.resolve(fields.policies.as_deref().unwrap_or(&[]))?;

        let common = ResolvedCommon {
            name: name.to_string(),
            kind,
            image_tag: fields.image_tag,
            ecs: normalize_ecs(fields.ecs),
            policies,
            image_repo: repos.image_repo,
            nginx_sidecar_image_repo: repos.nginx_sidecar_image_repo,
            nginx_sidecar,
        };

        let service = match kind {
            ServiceKind::Http => ResolvedService::Http(ResolvedHttp {
                common,
                path: fields.path.unwrap_or_else(|| default_http_path(name)),
                port: fields.port.unwrap_or(DEFAULT_HTTP_PORT),
                health_path: fields
                    .health_path
                    .unwrap_or_else(|| DEFAULT_HTTP_HEALTH_PATH.to_string()),
                tech: tech.unwrap_or_else(|| "laravel".to_string()),
            }),
            ServiceKind::Worker => ResolvedService::Worker(ResolvedWorker {
                common,
                command: fields.command,
                queues: fields.queues,
            }),
            ServiceKind::Lambda => ResolvedService::Lambda(ResolvedLambda {
                common,
                triggered_by: fields
                    .triggered_by
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default(),
                env: fields.env,
            }),
            ServiceKind::Frontend => ResolvedService::Frontend(ResolvedFrontend {
                common,
                port: fields.port.unwrap_or(DEFAULT_FRONTEND_PORT),
                health_path: fields
                    .health_path
                    .unwrap_or_else(|| DEFAULT_FRONTEND_HEALTH_PATH.to_string()),
                tech: tech.unwrap_or_else(|| "nextjs".to_string()),
                env: fields.env,
                tenants: fields.tenants,
            }),
        };

        tracing::debug!(
            %kind,
            service = name,
            image_repo = %service.common().image_repo,
            "Resolved service"
        );
        return Ok(Some(service));
    }

    /// kind defaults < global ECS defaults < catalog entry < customer global
    /// ecs/env < customer per-service override
    fn merge_chain(&self, kind: ServiceKind, name: &str, entry: &Value) -> Result<Value, Error> {
        let overrides = &self.customer.overrides;
        let mut merged = catalog_record(self.catalog, kind, name, entry)?;

        if let Some(global) = &overrides.global {
            if let Some(ecs) = &global.ecs {
                merge_at(&mut merged, "ecs", &to_value(kind, name, ecs)?);
            }
            if let Some(env) = &global.env {
                merge_at(&mut merged, "ecs", &json!({ "env": env }));
            }
        }

        let service_override = overrides
            .of(kind)
            .record(name)
            .map_err(|error| invalid_entry(kind, name, error))?;
        return Ok(deep_merge(merged, service_override.as_ref()));
    }

    fn check_override_targets(&self) -> Result<(), Error> {
        for kind in ServiceKind::ALL {
            for name in self.customer.overrides.of(kind).names() {
                if self.catalog.services.of(kind).contains(name) {
                    continue;
                }

                if self.options.strict_overrides {
                    return Err(Error::UnknownOverrideTarget {
                        kind,
                        name: name.to_string(),
                    });
                }

                tracing::warn!(
                    %kind,
                    service = name,
                    customer = %self.customer.customer,
                    "Override targets a service missing from the base catalog, ignoring it"
                );
            }
        }

        return Ok(());
    }
}

/// The catalog's own layers of one entry: kind defaults, then global ECS
/// defaults, then the entry itself. Customer layers go on top of this.
pub fn catalog_record(
    catalog: &BaseCatalog,
    kind: ServiceKind,
    name: &str,
    entry: &Value,
) -> Result<Value, Error> {
    let defaults = &catalog.defaults;

    let kind_defaults = defaults
        .for_kind(kind)
        .map_err(|error| invalid_entry(kind, name, error))?;
    let mut merged = deep_merge(Value::Object(Map::new()), kind_defaults.as_ref());

    if let Some(ecs) = &defaults.ecs {
        merge_at(&mut merged, "ecs", &to_value(kind, name, ecs)?);
    }

    return Ok(deep_merge(merged, Some(entry)));
}

fn normalize_ecs(ecs: Option<EcsDefaults>) -> EcsSettings {
    let ecs = ecs.unwrap_or_default();
    return EcsSettings {
        cpu: ecs.cpu.unwrap_or(DEFAULT_CPU),
        memory: ecs.memory.unwrap_or(DEFAULT_MEMORY),
        env: ecs.env.unwrap_or_default(),
    };
}

/// `users_profile-service` becomes `users-profile`.
fn default_http_path(name: &str) -> String {
    return name
        .strip_suffix("-service")
        .unwrap_or(name)
        .replace('_', "-");
}

fn to_value(kind: ServiceKind, name: &str, ecs: &EcsDefaults) -> Result<Value, Error> {
    return serde_json::to_value(ecs).map_err(|error| invalid_entry(kind, name, error));
}

pub(crate) fn invalid_entry(kind: ServiceKind, name: &str, error: serde_json::Error) -> Error {
    return Error::InvalidEntry {
        kind,
        name: name.to_string(),
        reason: error.to_string(),
    };
}

/// Loads both documents and resolves every enabled service for `stack`.
///
/// Without a `customer_path` the customer document is looked up next to the
/// base catalog, under `customers/<customer>.<environment>.json`.
pub fn resolve(
    stack: &str,
    base_path: &Path,
    customer_path: Option<&Path>,
) -> Result<ResolvedConfig, crate::Error> {
    return resolve_with_options(stack, base_path, customer_path, ResolveOptions::default());
}

pub fn resolve_with_options(
    stack: &str,
    base_path: &Path,
    customer_path: Option<&Path>,
    options: ResolveOptions,
) -> Result<ResolvedConfig, crate::Error> {
    let catalog = document::load_catalog(base_path)?;

    let customer_path = match customer_path {
        Some(path) => path.to_path_buf(),
        None => stack::infer_customer_path(stack, base_path)?,
    };
    let customer = document::load_customer(&customer_path)?;

    let config = Resolver::new(stack, &catalog, &customer)
        .with_options(options)
        .resolve()?;

    return Ok(config);
}
