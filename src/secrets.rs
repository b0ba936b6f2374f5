use std::convert::Infallible;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::descriptor::ResolvedConfig;

/// Hands out one handle per secret name for the lifetime of a provisioning run.
///
/// Pass it explicitly to whatever creates secrets; two callers asking for the
/// same name get the handle the first one created.
#[derive(Debug)]
pub struct SecretRegistry<H> {
    secrets: IndexMap<String, H>,
}

impl<H> Default for SecretRegistry<H> {
    fn default() -> Self {
        return Self {
            secrets: IndexMap::new(),
        };
    }
}

impl<H> SecretRegistry<H> {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn ensure<E, F>(&mut self, name: &str, create: F) -> Result<&H, E>
    where
        F: FnOnce(&str) -> Result<H, E>,
    {
        if !self.secrets.contains_key(name) {
            let handle = create(name)?;
            self.secrets.insert(name.to_string(), handle);
        } else {
            tracing::debug!(secret = name, "Reusing secret already created in this run");
        }

        return Ok(&self.secrets[name]);
    }

    pub fn get(&self, name: &str) -> Option<&H> {
        return self.secrets.get(name);
    }

    pub fn len(&self) -> usize {
        return self.secrets.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.secrets.is_empty();
    }

    pub fn into_handles(self) -> Vec<H> {
        return self.secrets.into_values().collect();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSecret {
    pub name: String,
    pub tenant: String,
    pub initial_value: Value,
}

pub fn tenant_secret_name(stack: &str, tenant: &str) -> String {
    return format!("{}-{}-secret", stack, tenant);
}

/// One secret per tenant served by any frontend, seeded with the tenant's
/// custom settings.
pub fn plan_tenant_secrets(
    config: &ResolvedConfig,
    stack: &str,
    registry: &mut SecretRegistry<TenantSecret>,
) {
    let tenants = config
        .frontend
        .iter()
        .filter_map(|frontend| frontend.tenants.as_ref())
        .flatten();

    for tenant in tenants {
        let name = tenant_secret_name(stack, &tenant.tenant);
        let planned = registry.ensure(&name, |name| -> Result<_, Infallible> {
            let settings = config
                .tenant_settings(&tenant.tenant)
                .cloned()
                .unwrap_or_else(Map::new);

            tracing::info!(secret = name, tenant = %tenant.tenant, "Planned tenant secret");
            Ok(TenantSecret {
                name: name.to_string(),
                tenant: tenant.tenant.clone(),
                initial_value: Value::Object(settings),
            })
        });

        match planned {
            Ok(_) => (),
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::plan_tenant_secrets;
    use super::tenant_secret_name;
    use super::SecretRegistry;
    use crate::descriptor::{
        EcsSettings, ResolvedCommon, ResolvedConfig, ResolvedFrontend,
    };
    use crate::document::{ServiceKind, Tenant};

    fn frontend(name: &str, tenants: Vec<Tenant>) -> ResolvedFrontend {
        return ResolvedFrontend {
            common: ResolvedCommon {
                name: name.to_string(),
                kind: ServiceKind::Frontend,
                image_tag: None,
                ecs: EcsSettings::default(),
                policies: vec![],
                image_repo: format!("staging-services-{}-repo", name),
                nginx_sidecar_image_repo: None,
                nginx_sidecar: false,
            },
            port: 3000,
            health_path: "/api/health".to_string(),
            tech: "nextjs".to_string(),
            env: None,
            tenants: Some(tenants),
        };
    }

    fn tenant(name: &str, settings: Option<serde_json::Value>) -> Tenant {
        return Tenant {
            tenant: name.to_string(),
            subdomain: name.to_string(),
            custom_settings: settings.map(|value| value.as_object().unwrap().clone()),
        };
    }

    #[test]
    fn ensure_creates_once() {
        let mut registry: SecretRegistry<u32> = SecretRegistry::new();
        let mut created = 0;

        for _ in 0..3 {
            let handle: Result<&u32, ()> = registry.ensure("quest-app-key", |_| {
                created += 1;
                Ok(42)
            });
            assert_eq!(Ok(&42), handle);
        }

        assert_eq!(1, created);
        assert_eq!(1, registry.len());
    }

    #[test]
    fn failed_creation_is_not_cached() {
        let mut registry: SecretRegistry<u32> = SecretRegistry::new();

        let failed: Result<&u32, &str> = registry.ensure("db", |_| Err("boom"));
        assert_eq!(Err("boom"), failed);
        assert_eq!(true, registry.is_empty());

        let created: Result<&u32, &str> = registry.ensure("db", |_| Ok(7));
        assert_eq!(Ok(&7), created);
    }

    #[test]
    fn registries_do_not_share_state() {
        let mut first: SecretRegistry<u32> = SecretRegistry::new();
        let second: SecretRegistry<u32> = SecretRegistry::new();

        let _: Result<&u32, ()> = first.ensure("shared", |_| Ok(1));
        assert_eq!(Some(&1), first.get("shared"));
        assert_eq!(None, second.get("shared"));
    }

    #[test]
    fn one_secret_per_tenant() {
        let config = ResolvedConfig {
            customer: "quest".to_string(),
            environment: "staging".to_string(),
            frontend: vec![
                frontend(
                    "web",
                    vec![
                        tenant("acme", Some(json!({"theme": "dark"}))),
                        tenant("globex", None),
                    ],
                ),
                frontend("admin", vec![tenant("acme", Some(json!({"theme": "light"})))]),
            ],
            ..ResolvedConfig::default()
        };

        let mut registry = SecretRegistry::new();
        plan_tenant_secrets(&config, "quest-staging", &mut registry);

        let secrets = registry.into_handles();
        assert_eq!(2, secrets.len());
        assert_eq!(tenant_secret_name("quest-staging", "acme"), secrets[0].name);
        assert_eq!("quest-staging-acme-secret", secrets[0].name);
        assert_eq!(json!({"theme": "dark"}), secrets[0].initial_value);
        assert_eq!("globex", secrets[1].tenant);
        assert_eq!(json!({}), secrets[1].initial_value);
    }

    #[test]
    fn planning_keeps_secrets_already_in_registry() {
        let config = ResolvedConfig {
            frontend: vec![frontend("web", vec![tenant("acme", Some(json!({"theme": "dark"})))])],
            ..ResolvedConfig::default()
        };

        let mut registry = SecretRegistry::new();
        let _: Result<_, ()> = registry.ensure("quest-staging-acme-secret", |name| {
            Ok(super::TenantSecret {
                name: name.to_string(),
                tenant: "acme".to_string(),
                initial_value: json!({"seeded": true}),
            })
        });
        plan_tenant_secrets(&config, "quest-staging", &mut registry);

        assert_eq!(1, registry.len());
        assert_eq!(
            Some(&json!({"seeded": true})),
            registry
                .get("quest-staging-acme-secret")
                .map(|secret| &secret.initial_value)
        );
    }
}
