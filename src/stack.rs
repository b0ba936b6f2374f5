use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::document;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unable to infer customer and environment from stack {0}, pass the customer document path explicitly")]
    StackIdentityAmbiguous(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Services,
    Core,
}

impl StackKind {
    pub fn of(stack: &str) -> Self {
        if stack.contains("-services") {
            return StackKind::Services;
        }

        return StackKind::Core;
    }

    pub fn segment(&self) -> &'static str {
        match self {
            StackKind::Services => "services",
            StackKind::Core => "core",
        }
    }
}

/// A stack name of the form `<customer>-<environment>[-<suffix>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackIdentity {
    pub customer: String,
    pub environment: String,
    pub suffix: Option<String>,
}

fn stack_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        RegexBuilder::new(r"^([a-z0-9-]+)-(staging|production)(?:-(.+))?$")
            .case_insensitive(true)
            .build()
            .expect("stack pattern is a valid regex")
    })
}

impl StackIdentity {
    pub fn parse(stack: &str) -> Result<Self, Error> {
        let captures = match stack_pattern().captures(stack) {
            Some(captures) => captures,
            None => return Err(Error::StackIdentityAmbiguous(stack.to_string())),
        };

        return Ok(Self {
            customer: captures[1].to_string(),
            environment: captures[2].to_string(),
            suffix: captures.get(3).map(|suffix| suffix.as_str().to_string()),
        });
    }

    /// `<customers_dir>/<customer>.<environment>.json`
    pub fn customer_document(&self, customers_dir: &Path) -> PathBuf {
        return customers_dir.join(format!("{}.{}.json", self.customer, self.environment));
    }
}

/// Finds the customer document for `stack` next to the base catalog.
pub fn infer_customer_path(stack: &str, base_path: &Path) -> Result<PathBuf, crate::Error> {
    let identity = StackIdentity::parse(stack)?;
    let customers_dir = base_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("customers");
    let guess = identity.customer_document(&customers_dir);

    if !guess.exists() {
        return Err(document::Error::ConfigNotFound(guess.display().to_string()).into());
    }

    tracing::debug!(stack, path = %guess.display(), "Inferred customer document");
    return Ok(guess);
}
