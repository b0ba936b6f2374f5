use serde::Serialize;
use serde_json::Value;

use crate::descriptor::ResolvedConfig;
use crate::document::{BaseCatalog, ServiceKind, ServiceMap};
use crate::resolver::{self, catalog_record, invalid_entry};
use crate::stack::StackKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRepos {
    pub image_repo: String,
    pub nginx_sidecar_image_repo: Option<String>,
}

/// `<environment>-<services|core>-<service>-repo`, plus `-nginx-repo` for the sidecar.
pub fn derive_repos(stack: &str, environment: &str, service_name: &str, sidecar: bool) -> ImageRepos {
    let base = format!(
        "{}-{}-{}",
        environment,
        StackKind::of(stack).segment(),
        service_name
    );

    return ImageRepos {
        image_repo: format!("{}-repo", base),
        nginx_sidecar_image_repo: sidecar.then(|| format!("{}-nginx-repo", base)),
    };
}

/// Laravel runs behind PHP-FPM and gets an nginx sidecar. So does a service
/// that names no technology at all.
pub fn default_sidecar_for_tech(tech: Option<&str>) -> bool {
    match tech {
        None => true,
        Some(tech) => tech.eq_ignore_ascii_case("laravel"),
    }
}

pub fn default_tech(kind: ServiceKind) -> Option<&'static str> {
    match kind {
        ServiceKind::Http => Some("laravel"),
        ServiceKind::Frontend => Some("nextjs"),
        ServiceKind::Worker | ServiceKind::Lambda => None,
    }
}

/// Technology of a merged service record, falling back to the kind's default,
/// and whether it runs with an nginx sidecar.
pub fn tech_and_sidecar(
    kind: ServiceKind,
    tech: Option<String>,
    nginx_sidecar: Option<bool>,
) -> (Option<String>, bool) {
    let tech = tech.or_else(|| default_tech(kind).map(str::to_string));
    let sidecar = nginx_sidecar.unwrap_or_else(|| default_sidecar_for_tech(tech.as_deref()));
    return (tech, sidecar);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRepository {
    pub service: String,
    pub kind: ServiceKind,
    pub repository: String,
    pub sidecar: bool,
}

/// Every image repository the catalog needs, regardless of which customers
/// enable which services.
pub fn repository_plan(
    catalog: &BaseCatalog,
    stack: &str,
    environment: &str,
) -> Result<Vec<PlannedRepository>, resolver::Error> {
    let mut planned = Vec::new();

    for kind in ServiceKind::ALL {
        let entries = catalog
            .services
            .of(kind)
            .records()
            .map_err(|error| invalid_entry(kind, "*", error))?;

        for (name, entry) in entries {
            let record = catalog_record(catalog, kind, &name, &entry)?;
            let tech = record.get("tech").and_then(Value::as_str).map(str::to_string);
            let explicit_sidecar = record.get("nginxSidecar").and_then(Value::as_bool);
            let (_, sidecar) = tech_and_sidecar(kind, tech, explicit_sidecar);
            let repos = derive_repos(stack, environment, &name, sidecar);

            planned.push(PlannedRepository {
                service: name.clone(),
                kind,
                repository: repos.image_repo,
                sidecar: false,
            });

            if let Some(sidecar_repo) = repos.nginx_sidecar_image_repo {
                planned.push(PlannedRepository {
                    service: format!("{}-nginx", name),
                    kind,
                    repository: sidecar_repo,
                    sidecar: true,
                });
            }
        }
    }

    tracing::debug!(stack, count = planned.len(), "Planned image repositories");
    return Ok(planned);
}

/// Image repositories the resolved services of one customer pull from.
pub fn resolved_repositories(config: &ResolvedConfig) -> Vec<PlannedRepository> {
    let mut planned = Vec::new();

    for common in config.commons() {
        planned.push(PlannedRepository {
            service: common.name.clone(),
            kind: common.kind,
            repository: common.image_repo.clone(),
            sidecar: false,
        });

        if let Some(sidecar_repo) = &common.nginx_sidecar_image_repo {
            planned.push(PlannedRepository {
                service: format!("{}-nginx", common.name),
                kind: common.kind,
                repository: sidecar_repo.clone(),
                sidecar: true,
            });
        }
    }

    return planned;
}
