//! Project hydration and serialization.
//!
//! Loading replaces every store of the session and drops navigation and
//! history. Saving flushes any open sub-composition back into its record
//! first, so the written project always describes the root timeline.

use std::path::Path;

use splice_project::{touch_modified, ProjectRecord, ProjectSettings};
use splice_timeline::{CompositionStore, TimelineData, TimelineState};
use tracing::info;

use crate::engine::{ProjectInfo, TimelineEngine};
use crate::error::EngineResult;
use crate::view::ViewState;

impl TimelineEngine {
    /// Start an empty project.
    pub fn new_project(&mut self, name: &str, settings: ProjectSettings) {
        let record = ProjectRecord::new(name, settings);
        self.load_project(record);
    }

    /// Replace the whole session with `record`.
    pub fn load_project(&mut self, record: ProjectRecord) {
        self.playback.pause();
        let timeline = TimelineData {
            items: record.items,
            tracks: record.tracks,
            transitions: record.transitions,
            keyframes: record.keyframes,
        };
        self.state = TimelineState::from(timeline);
        self.compositions = CompositionStore::from_vec(record.compositions);
        self.config.timeline_fps = record.settings.fps();
        self.config.resolution = record.settings.resolution();
        self.view = ViewState::from_parts(
            record.markers,
            record.in_point,
            record.out_point,
            record.zoom_level,
            record.scroll_position,
        );

        self.navigator.reset();
        self.history.clear();
        self.history_stash.clear();
        self.pending_breakages.clear();
        self.touched.clear();
        self.selection.clear();
        self.playback.set_current_frame(record.current_frame.max(0));
        self.mark_saved();

        info!(
            name = %record.name,
            items = self.state.items.items().len(),
            compositions = self.compositions.all().len(),
            "Project loaded"
        );
        self.project = ProjectInfo {
            name: record.name,
            created_at: Some(record.created_at),
            settings: record.settings,
        };
    }

    /// Serialize the session. Open sub-compositions are written into their
    /// records and the root timeline is taken from the bottom of the stash.
    pub fn to_project_record(&self) -> EngineResult<ProjectRecord> {
        let mut compositions = self.compositions.clone();
        let stashed = self.navigator.stashed();
        if let Some(active) = self.navigator.active_composition_id() {
            compositions.update_state(active, &self.state)?;
        }
        for parked in stashed.iter().skip(1) {
            if let Some(id) = parked.composition_id.as_deref() {
                compositions.update_state(id, &parked.state)?;
            }
        }
        let (root, current_frame) = match stashed.first() {
            Some(root) => (root.state.clone(), root.current_frame),
            None => (self.state.clone(), self.playback.current_frame()),
        };

        let timeline = TimelineData::from(root);
        let mut record = ProjectRecord::new(self.project.name.clone(), self.project.settings.clone());
        if let Some(created_at) = &self.project.created_at {
            record.created_at = created_at.clone();
        }
        record.tracks = timeline.tracks;
        record.items = timeline.items;
        record.transitions = timeline.transitions;
        record.keyframes = timeline.keyframes;
        record.compositions = compositions.all().to_vec();
        record.markers = self.view.markers().to_vec();
        record.in_point = self.view.in_point();
        record.out_point = self.view.out_point();
        record.current_frame = current_frame;
        record.zoom_level = self.view.zoom_level();
        record.scroll_position = self.view.scroll_position();
        touch_modified(&mut record);
        Ok(record)
    }

    pub fn project_name(&self) -> &str {
        &self.project.name
    }

    pub fn project_settings(&self) -> &ProjectSettings {
        &self.project.settings
    }

    pub fn rename_project(&mut self, name: &str) {
        self.project.name = name.to_string();
    }

    /// Write the project to `path` and clear the dirty flag.
    pub fn save_to(&mut self, path: &Path) -> EngineResult<()> {
        let record = self.to_project_record()?;
        splice_project::save_project(&record, path)?;
        self.project.created_at = Some(record.created_at);
        self.mark_saved();
        info!(path = %path.display(), "Project saved");
        Ok(())
    }

    /// Read a project from `path`; the session is untouched on error.
    pub fn load_from(&mut self, path: &Path) -> EngineResult<()> {
        let record = splice_project::load_project(path)?;
        self.load_project(record);
        Ok(())
    }
}
