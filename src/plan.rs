use serde::Serialize;

use crate::descriptor::ResolvedConfig;
use crate::document;
use crate::manifest::StackEntry;
use crate::repository::{repository_plan, resolved_repositories, PlannedRepository};
use crate::resolver::{resolve_with_options, ResolveOptions};
use crate::secrets::{plan_tenant_secrets, SecretRegistry, TenantSecret};
use crate::stack::StackIdentity;

/// Everything the provisioning layer needs for one stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackPlan {
    pub stack: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ResolvedConfig>,
    pub repositories: Vec<PlannedRepository>,
    pub tenant_secrets: Vec<TenantSecret>,
}

pub fn build(entry: &StackEntry) -> Result<StackPlan, crate::Error> {
    let stack = entry.stack_name();

    if entry.base_only {
        return build_catalog_only(entry);
    }

    let options = ResolveOptions {
        strict_overrides: entry.strict_overrides,
    };
    let customer_path = entry.customer.as_ref().map(|file| file.location.as_path());
    let config = resolve_with_options(stack, &entry.base.location, customer_path, options)?;

    let mut registry = SecretRegistry::new();
    plan_tenant_secrets(&config, stack, &mut registry);

    return Ok(StackPlan {
        stack: stack.to_string(),
        repositories: resolved_repositories(&config),
        tenant_secrets: registry.into_handles(),
        config: Some(config),
    });
}

fn build_catalog_only(entry: &StackEntry) -> Result<StackPlan, crate::Error> {
    let stack = entry.stack_name();
    let catalog = document::load_catalog(&entry.base.location)?;

    let environment = match &entry.environment {
        Some(environment) => environment.clone(),
        None => StackIdentity::parse(stack)?.environment,
    };

    return Ok(StackPlan {
        stack: stack.to_string(),
        config: None,
        repositories: repository_plan(&catalog, stack, &environment)?,
        tenant_secrets: vec![],
    });
}
