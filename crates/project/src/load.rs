//! Project deserialization: loading `ProjectRecord` from JSON files.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ProjectError, ProjectResult};
use crate::types::{ProjectRecord, CURRENT_VERSION};

/// Deserialize and validate a project from a JSON string.
pub fn from_json_string(json: &str) -> ProjectResult<ProjectRecord> {
    let project: ProjectRecord = serde_json::from_str(json)?;
    debug!(
        project_name = %project.name,
        version = project.version,
        items = project.items.len(),
        compositions = project.compositions.len(),
        "Deserialized project from JSON"
    );
    validate_project(&project)?;
    Ok(project)
}

/// Load a project from a file at the given path.
pub fn load_project(path: &Path) -> ProjectResult<ProjectRecord> {
    if !path.exists() {
        return Err(ProjectError::NotFound {
            path: path.display().to_string(),
        });
    }

    let json = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read project file");
        ProjectError::Io(e)
    })?;

    let project = from_json_string(&json)?;

    info!(
        project_name = %project.name,
        path = %path.display(),
        items = project.items.len(),
        compositions = project.compositions.len(),
        "Project loaded successfully"
    );
    Ok(project)
}

/// Validate structural requirements of a loaded project.
fn validate_project(project: &ProjectRecord) -> ProjectResult<()> {
    if project.version > CURRENT_VERSION {
        return Err(ProjectError::UnsupportedVersion {
            version: project.version,
        });
    }

    if project.name.is_empty() {
        warn!("Project has empty name");
        return Err(ProjectError::InvalidProject {
            reason: "project name is empty".into(),
        });
    }

    if project.settings.width == 0 || project.settings.height == 0 {
        return Err(ProjectError::InvalidProject {
            reason: format!(
                "invalid resolution: {}x{}",
                project.settings.width, project.settings.height
            ),
        });
    }

    if project.settings.frame_rate <= 0.0 {
        return Err(ProjectError::InvalidProject {
            reason: format!("invalid frame rate: {}", project.settings.frame_rate),
        });
    }

    let mut seen = HashSet::new();
    for item in &project.items {
        if !seen.insert(item.id.as_str()) {
            return Err(ProjectError::InvalidProject {
                reason: format!("duplicate item id: {}", item.id),
            });
        }
    }

    let track_ids: HashSet<&str> = project.tracks.iter().map(|t| t.id.as_str()).collect();
    for item in &project.items {
        if !track_ids.contains(item.track_id.as_str()) {
            // Lenient: orphaned items are kept and surfaced, not rejected.
            warn!(item_id = %item.id, track_id = %item.track_id, "Item references non-existent track");
        }
    }

    let composition_ids: HashSet<&str> =
        project.compositions.iter().map(|c| c.id.as_str()).collect();
    for item in &project.items {
        if let Some(id) = item.composition_id() {
            if !composition_ids.contains(id) {
                warn!(item_id = %item.id, composition_id = id, "Composition item references missing composition");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::{save_project, to_json_string};
    use crate::types::{Marker, ProjectSettings};
    use splice_timeline::{MediaSource, TimelineItem, TimelineTrack};

    fn sample_project() -> ProjectRecord {
        let mut project = ProjectRecord::new("Load Test", ProjectSettings::default());
        project.tracks.push(TimelineTrack::new("v1", "Video 1", 0.0));
        project.items.push(TimelineItem::video(
            "clip-1",
            "v1",
            0,
            150,
            MediaSource::new("media-1", 300, 30.0),
        ));
        project.markers.push(Marker {
            id: "m1".into(),
            frame: 90,
            label: "Beat".into(),
            color: "#ff0000".into(),
            duration_in_frames: 0,
        });
        project.in_point = Some(10);
        project
    }

    #[test]
    fn from_json_string_round_trip() {
        let project = sample_project();
        let json = to_json_string(&project).expect("serialize");
        let loaded = from_json_string(&json).expect("deserialize");
        assert_eq!(loaded, project);
    }

    #[test]
    fn load_project_file_round_trip() {
        let dir = std::env::temp_dir().join("splice_project_load_test");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("load_test.splice");

        save_project(&sample_project(), &path).expect("save");
        let loaded = load_project(&path).expect("load");
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.markers[0].frame, 90);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn load_project_nonexistent_file() {
        let err = load_project(Path::new("/nonexistent/path/project.splice")).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn validate_rejects_bad_records() {
        let mut project = sample_project();
        project.name.clear();
        let err = from_json_string(&to_json_string(&project).unwrap()).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let mut project = sample_project();
        project.settings.frame_rate = -1.0;
        let err = from_json_string(&to_json_string(&project).unwrap()).unwrap_err();
        assert!(err.to_string().contains("frame rate"));

        let mut project = sample_project();
        project.version = CURRENT_VERSION + 1;
        let err = from_json_string(&to_json_string(&project).unwrap()).unwrap_err();
        assert!(matches!(err, ProjectError::UnsupportedVersion { .. }));

        let mut project = sample_project();
        let dup = project.items[0].clone();
        project.items.push(dup);
        let err = from_json_string(&to_json_string(&project).unwrap()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
