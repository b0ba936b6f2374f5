use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::document::read_source;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Stack {0} is not listed in the manifest")]
    UnknownStack(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ConfigFile {
    pub location: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StackEntry {
    #[validate(required, length(min = 1))]
    pub stack_name: Option<String>,

    /// Used by catalog-only entries whose stack name carries no environment.
    pub environment: Option<String>,

    #[validate(custom = "validate_json_file")]
    pub base: ConfigFile,

    #[validate(custom = "validate_json_file")]
    pub customer: Option<ConfigFile>,

    #[validate(custom = "validate_json_file")]
    pub output: ConfigFile,

    #[serde(default)]
    pub base_only: bool,

    #[serde(default)]
    pub strict_overrides: bool,
}

impl StackEntry {
    pub fn stack_name(&self) -> &str {
        return self.stack_name.as_deref().unwrap_or_default();
    }
}

pub type Manifest = Vec<StackEntry>;

pub fn parse(path: &PathBuf) -> Result<Manifest, Error> {
    let contents = read_source(path, Error::FileNotFound, Error::Unknown)?;

    let manifest: Manifest = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    for stack_entry in &manifest {
        match stack_entry.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }
    }

    tracing::debug!(path = %path.display(), stacks = manifest.len(), "Parsed manifest");
    return Ok(manifest);
}

/// Narrows the manifest down to `stack` when one is given.
pub fn select(manifest: Manifest, stack: Option<&str>) -> Result<Manifest, Error> {
    let stack = match stack {
        Some(stack) => stack,
        None => return Ok(manifest),
    };

    let selected: Manifest = manifest
        .into_iter()
        .filter(|entry| entry.stack_name() == stack)
        .collect();

    if selected.is_empty() {
        return Err(Error::UnknownStack(stack.to_string()));
    }

    return Ok(selected);
}

fn validate_json_file(json_file: &ConfigFile) -> Result<(), ValidationError> {
    let file_extension = match json_file.location.extension() {
        Some(extension) => extension,
        None => {
            return Err(ValidationError::new(
                "Unable to parse the extension of the JSON file location",
            ))
        }
    };
    if file_extension != "json" {
        return Err(ValidationError::new(
            "The JSON file location has to end with `.json`",
        ));
    }

    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    use super::parse;
    use super::select;
    use super::ConfigFile;
    use super::Error;
    use super::Manifest;
    use super::StackEntry;
    use tempfile::tempdir;

    fn stack_entry(stack_name: Option<&str>, output: &str) -> StackEntry {
        return StackEntry {
            stack_name: stack_name.map(String::from),
            environment: None,
            base: ConfigFile {
                location: PathBuf::from("configs/base.json"),
            },
            customer: None,
            output: ConfigFile {
                location: PathBuf::from(output),
            },
            base_only: false,
            strict_overrides: false,
        };
    }

    fn write_manifest(manifest: &Manifest) -> (tempfile::TempDir, PathBuf) {
        let manifest_contents = serde_yaml::to_string(manifest).unwrap();

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("stacks.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{}", manifest_contents).unwrap();

        return (dir, file_path);
    }

    #[test]
    fn file_does_not_exist() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("stacks.yaml");

        let result = parse(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }

    #[test]
    fn file_wrong_format() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("stacks.yaml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "Not yaml").unwrap();

        let result = parse(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::ParsingError(_) => {}
            _ => panic!("Expected `ParsingError` error"),
        }
    }

    #[test]
    fn file_missing_stack_name() {
        let manifest: Manifest = vec![stack_entry(None, "out/plan.json")];
        let (_dir, file_path) = write_manifest(&manifest);

        let result = parse(&file_path);
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn output_must_be_json() {
        let manifest: Manifest = vec![stack_entry(Some("quest-staging-services"), "out/plan.yaml")];
        let (_dir, file_path) = write_manifest(&manifest);

        let result = parse(&file_path);
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn parses_the_manifest() {
        let manifest: Manifest = vec![stack_entry(Some("quest-staging-services"), "out/plan.json")];
        let (_dir, file_path) = write_manifest(&manifest);

        let result = parse(&file_path);
        assert_eq!(false, result.is_err());
        assert_eq!("quest-staging-services", result.unwrap()[0].stack_name());
    }

    #[test]
    fn selects_a_single_stack() {
        let manifest: Manifest = vec![
            stack_entry(Some("quest-staging-services"), "out/staging.json"),
            stack_entry(Some("quest-production-services"), "out/production.json"),
        ];

        let selected = select(manifest, Some("quest-production-services")).unwrap();
        assert_eq!(1, selected.len());
        assert_eq!(PathBuf::from("out/production.json"), selected[0].output.location);
    }

    #[test]
    fn selecting_unknown_stack_fails() {
        let manifest: Manifest = vec![stack_entry(Some("quest-staging-services"), "out/plan.json")];

        let result = select(manifest, Some("acme-staging-services"));
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::UnknownStack(stack) => assert_eq!("acme-staging-services", stack),
            _ => panic!("Expected `UnknownStack` error"),
        }
    }
}
