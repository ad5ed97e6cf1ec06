//! Project serialization: writing `ProjectRecord` to JSON files.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ProjectError, ProjectResult};
use crate::types::ProjectRecord;

/// Serialize a project to a pretty-printed JSON string.
pub fn to_json_string(project: &ProjectRecord) -> ProjectResult<String> {
    let json = serde_json::to_string_pretty(project)?;
    debug!(
        project_name = %project.name,
        json_len = json.len(),
        "Serialized project to JSON"
    );
    Ok(json)
}

/// Save a project to a file at the given path.
///
/// Data is written to a sibling temporary file and then renamed over the
/// target, so an interrupted write never leaves a truncated project behind.
pub fn save_project(project: &ProjectRecord, path: &Path) -> ProjectResult<()> {
    let json = to_json_string(project)?;
    let temp_path = path.with_extension("splice.tmp");

    std::fs::write(&temp_path, json.as_bytes()).map_err(|e| {
        tracing::error!(path = %temp_path.display(), error = %e, "Failed to write temp file");
        ProjectError::Io(e)
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        tracing::error!(
            from = %temp_path.display(),
            to = %path.display(),
            error = %e,
            "Failed to rename temp file to target"
        );
        ProjectError::Io(e)
    })?;

    info!(
        project_name = %project.name,
        path = %path.display(),
        items = project.items.len(),
        "Project saved successfully"
    );
    Ok(())
}
