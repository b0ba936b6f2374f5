use std::fs;
use std::path::Path;

use crate::plan::StackPlan;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unable to serialize plan for stack {stack}: {reason}")]
    SerializationError { stack: String, reason: String },

    #[error("Unable to write {path}: {reason}")]
    WriteError { path: String, reason: String },
}

pub fn write(path: &Path, plan: &StackPlan) -> Result<(), Error> {
    let file_contents = match serde_json::to_string_pretty(plan) {
        Ok(contents) => contents,
        Err(error) => {
            return Err(Error::SerializationError {
                stack: plan.stack.clone(),
                reason: error.to_string(),
            })
        }
    };

    let write_error = |error: std::io::Error| Error::WriteError {
        path: path.display().to_string(),
        reason: error.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, file_contents).map_err(write_error)?;

    tracing::info!(stack = %plan.stack, path = %path.display(), "Wrote stack plan");
    return Ok(());
}
