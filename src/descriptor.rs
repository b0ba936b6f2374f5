use serde::{Deserialize, Serialize};

use crate::document::{EnvMap, ServiceKind, Tenant};

pub const DEFAULT_CPU: u32 = 256;
pub const DEFAULT_MEMORY: u32 = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcsSettings {
    pub cpu: u32,
    pub memory: u32,
    pub env: EnvMap,
}

impl Default for EcsSettings {
    fn default() -> Self {
        return Self {
            cpu: DEFAULT_CPU,
            memory: DEFAULT_MEMORY,
            env: EnvMap::new(),
        };
    }
}

/// Fields every resolved service carries, whatever its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCommon {
    pub name: String,
    pub kind: ServiceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    pub ecs: EcsSettings,
    pub policies: Vec<String>,
    pub image_repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nginx_sidecar_image_repo: Option<String>,
    pub nginx_sidecar: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedHttp {
    #[serde(flatten)]
    pub common: ResolvedCommon,
    pub path: String,
    pub port: u16,
    pub health_path: String,
    pub tech: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedWorker {
    #[serde(flatten)]
    pub common: ResolvedCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queues: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLambda {
    #[serde(flatten)]
    pub common: ResolvedCommon,
    pub triggered_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFrontend {
    #[serde(flatten)]
    pub common: ResolvedCommon,
    pub port: u16,
    pub health_path: String,
    pub tech: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenants: Option<Vec<Tenant>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedService {
    Http(ResolvedHttp),
    Worker(ResolvedWorker),
    Lambda(ResolvedLambda),
    Frontend(ResolvedFrontend),
}

impl ResolvedService {
    pub fn common(&self) -> &ResolvedCommon {
        match self {
            ResolvedService::Http(service) => &service.common,
            ResolvedService::Worker(service) => &service.common,
            ResolvedService::Lambda(service) => &service.common,
            ResolvedService::Frontend(service) => &service.common,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub customer: String,
    pub environment: String,
    pub http: Vec<ResolvedHttp>,
    pub worker: Vec<ResolvedWorker>,
    pub lambda: Vec<ResolvedLambda>,
    pub frontend: Vec<ResolvedFrontend>,
}

impl ResolvedConfig {
    pub fn push(&mut self, service: ResolvedService) {
        match service {
            ResolvedService::Http(service) => self.http.push(service),
            ResolvedService::Worker(service) => self.worker.push(service),
            ResolvedService::Lambda(service) => self.lambda.push(service),
            ResolvedService::Frontend(service) => self.frontend.push(service),
        }
    }

    pub fn count(&self, kind: ServiceKind) -> usize {
        match kind {
            ServiceKind::Http => self.http.len(),
            ServiceKind::Worker => self.worker.len(),
            ServiceKind::Lambda => self.lambda.len(),
            ServiceKind::Frontend => self.frontend.len(),
        }
    }

    /// Common fields of every resolved service, kind by kind in catalog order.
    pub fn commons(&self) -> impl Iterator<Item = &ResolvedCommon> {
        let http = self.http.iter().map(|service| &service.common);
        let worker = self.worker.iter().map(|service| &service.common);
        let lambda = self.lambda.iter().map(|service| &service.common);
        let frontend = self.frontend.iter().map(|service| &service.common);

        return http.chain(worker).chain(lambda).chain(frontend);
    }

    /// Custom settings of the first frontend that serves `tenant`.
    pub fn tenant_settings(&self, tenant: &str) -> Option<&serde_json::Map<String, serde_json::Value>> {
        return self
            .frontend
            .iter()
            .filter_map(|frontend| frontend.tenants.as_ref())
            .flatten()
            .find(|candidate| candidate.tenant == tenant)
            .and_then(|candidate| candidate.custom_settings.as_ref());
    }
}
