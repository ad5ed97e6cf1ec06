//! The editing session.
//!
//! [`TimelineEngine`] owns every store of one editing session: the working
//! timeline (root or the open sub-composition), the composition registry,
//! the navigation stack, history, markers and the collaborator handles.
//! Edit verbs live in `crate::actions` as further `impl` blocks; each one
//! runs inside [`TimelineEngine::execute`].

use std::collections::BTreeSet;

use splice_common::{EngineConfig, Frame};
use splice_project::ProjectSettings;
use splice_timeline::{
    CompositionNavigator, CompositionStore, Outcome, SpeedLimits, TimelineError, TimelineItem,
    TimelineResult, TimelineState,
};
use tracing::{debug, warn};

use crate::collaborators::{PlaybackClock, SelectionSink};
use crate::dispatch::{apply_events, repair_transitions, TransitionBreakage};
use crate::error::EngineResult;
use crate::history::HistoryManager;
use crate::playback::PlaybackState;
use crate::selection::SelectionState;
use crate::snapshot::TimelineSnapshot;
use crate::view::ViewState;

/// Name and creation info carried through load/save.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ProjectInfo {
    pub name: String,
    pub created_at: Option<String>,
    pub settings: ProjectSettings,
}

pub struct TimelineEngine {
    pub(crate) config: EngineConfig,
    /// Working collections of the active context.
    pub(crate) state: TimelineState,
    pub(crate) compositions: CompositionStore,
    pub(crate) navigator: CompositionNavigator,
    pub(crate) history: HistoryManager,
    /// Parent histories parked while a sub-composition is open.
    pub(crate) history_stash: Vec<HistoryManager>,
    pub(crate) pending_breakages: Vec<TransitionBreakage>,
    /// Items whose geometry changed during the running command.
    pub(crate) touched: BTreeSet<String>,
    pub(crate) magnetic: bool,
    pub(crate) playback: Box<dyn PlaybackClock>,
    pub(crate) selection: Box<dyn SelectionSink>,
    pub(crate) view: ViewState,
    pub(crate) project: ProjectInfo,
    command_depth: usize,
    dirty: bool,
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for TimelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineEngine")
            .field("items", &self.state.items.items().len())
            .field("compositions", &self.compositions.all().len())
            .field("depth", &self.navigator.depth())
            .field("undo", &self.history.undo_count())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl TimelineEngine {
    /// Engine with in-memory playback and selection.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(
            config,
            Box::new(PlaybackState::new()),
            Box::new(SelectionState::new()),
        )
    }

    pub fn with_collaborators(
        config: EngineConfig,
        playback: Box<dyn PlaybackClock>,
        selection: Box<dyn SelectionSink>,
    ) -> Self {
        let settings = ProjectSettings {
            width: config.resolution.width,
            height: config.resolution.height,
            frame_rate: config.timeline_fps.as_f64(),
            ..ProjectSettings::default()
        };
        Self {
            navigator: CompositionNavigator::new(config.max_nesting_depth),
            history: HistoryManager::new(config.max_history_entries),
            history_stash: Vec::new(),
            magnetic: config.magnetic_mode,
            state: TimelineState::new(),
            compositions: CompositionStore::new(),
            pending_breakages: Vec::new(),
            touched: BTreeSet::new(),
            playback,
            selection,
            view: ViewState::new(),
            project: ProjectInfo {
                name: "Untitled".to_string(),
                created_at: None,
                settings,
            },
            config,
            command_depth: 0,
            dirty: false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Collections of the active timeline context.
    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    pub fn compositions(&self) -> &CompositionStore {
        &self.compositions
    }

    pub fn navigator(&self) -> &CompositionNavigator {
        &self.navigator
    }

    pub fn item(&self, id: &str) -> Option<&TimelineItem> {
        self.state.items.get(id)
    }

    pub fn playback(&self) -> &dyn PlaybackClock {
        self.playback.as_ref()
    }

    pub fn playback_mut(&mut self) -> &mut dyn PlaybackClock {
        self.playback.as_mut()
    }

    pub fn selection(&self) -> &dyn SelectionSink {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> &mut dyn SelectionSink {
        self.selection.as_mut()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Markers and view state are not undo-tracked.
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Frame rate of the active context.
    pub fn fps(&self) -> f64 {
        self.navigator
            .active_composition_id()
            .and_then(|id| self.compositions.get(id))
            .map(|c| c.fps)
            .unwrap_or_else(|| self.config.timeline_fps.as_f64())
    }

    pub fn is_magnetic_mode(&self) -> bool {
        self.magnetic
    }

    pub fn set_magnetic_mode(&mut self, enabled: bool) {
        self.magnetic = enabled;
        debug!(enabled, "Magnetic mode toggled");
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Transitions removed by repair since the last drain.
    pub fn pending_breakages(&self) -> &[TransitionBreakage] {
        &self.pending_breakages
    }

    pub fn take_pending_breakages(&mut self) -> Vec<TransitionBreakage> {
        std::mem::take(&mut self.pending_breakages)
    }

    // ------------------------------------------------------------------
    // Commands & history
    // ------------------------------------------------------------------

    /// Run `action` as one undoable command.
    ///
    /// The action's item events are folded in as it goes; transitions are
    /// repaired once it returns. A change is recorded under `label` only if
    /// the snapshot differs afterwards. An error rolls every store back.
    /// Nested calls run inline as part of the outer command.
    pub fn execute<T>(
        &mut self,
        label: &str,
        action: impl FnOnce(&mut Self) -> EngineResult<T>,
    ) -> EngineResult<T> {
        if self.command_depth > 0 {
            return action(self);
        }

        let before = self.snapshot();
        let breakages_before = self.pending_breakages.len();
        self.command_depth += 1;
        let result = action(self).map(|value| {
            self.repair_touched();
            value
        });
        self.command_depth -= 1;
        self.touched.clear();

        match result {
            Ok(value) => {
                if self.snapshot() != before {
                    self.history.push(label, before);
                    self.dirty = true;
                    debug!(label, "Command applied");
                }
                Ok(value)
            }
            Err(err) => {
                before.restore(&mut self.state, &mut self.compositions);
                self.pending_breakages.truncate(breakages_before);
                warn!(label, error = %err, "Command rejected");
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    /// Restore the state before the last command. Returns false when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            return false;
        };
        self.restore_snapshot(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            return false;
        };
        self.restore_snapshot(next);
        true
    }

    /// Drop undo and redo history of the active context.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Group the following commands into one undo entry labelled `label`.
    pub fn begin_batch(&mut self, label: &str) {
        let before = self.snapshot();
        self.history.start_batch(label, before);
    }

    /// Close the batch; returns whether an entry was recorded.
    pub fn end_batch(&mut self) -> bool {
        let current = self.snapshot();
        self.history.end_batch(&current)
    }

    pub fn is_batching(&self) -> bool {
        self.history.is_batching()
    }

    pub(crate) fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot::capture(&self.state, &self.compositions)
    }

    fn restore_snapshot(&mut self, snapshot: TimelineSnapshot) {
        snapshot.restore(&mut self.state, &mut self.compositions);
        self.dirty = true;
        let surviving: Vec<String> = self
            .selection
            .selected_item_ids()
            .into_iter()
            .filter(|id| self.state.items.contains(id))
            .collect();
        self.selection.select_items(&surviving);
    }

    // ------------------------------------------------------------------
    // Helpers for verbs
    // ------------------------------------------------------------------

    /// Fold a primitive outcome's events into the dependent stores.
    pub(crate) fn apply<T>(&mut self, outcome: Outcome<T>) -> T {
        apply_events(&mut self.state, &outcome.events, &mut self.touched);
        outcome.value
    }

    fn repair_touched(&mut self) {
        if self.touched.is_empty() {
            return;
        }
        let broken = repair_transitions(&mut self.state, &self.touched);
        self.pending_breakages.extend(broken);
    }

    pub(crate) fn require_item(&self, id: &str) -> TimelineResult<&TimelineItem> {
        self.state
            .items
            .get(id)
            .ok_or_else(|| TimelineError::ItemNotFound {
                item_id: id.to_string(),
            })
    }

    pub(crate) fn ensure_track_unlocked(&self, track_id: &str) -> TimelineResult<()> {
        if self.state.items.is_track_locked(track_id) {
            return Err(TimelineError::TrackLocked {
                track_id: track_id.to_string(),
            });
        }
        Ok(())
    }

    /// Every item must exist and sit on an unlocked track.
    pub(crate) fn ensure_items_editable(&self, ids: &[String]) -> TimelineResult<()> {
        for id in ids {
            let item = self.require_item(id)?;
            self.ensure_track_unlocked(&item.track_id)?;
        }
        Ok(())
    }

    pub(crate) fn ensure_item_editable(&self, id: &str) -> TimelineResult<&TimelineItem> {
        let item = self.require_item(id)?;
        self.ensure_track_unlocked(&item.track_id)?;
        Ok(item)
    }

    pub(crate) fn speed_limits(&self) -> SpeedLimits {
        SpeedLimits {
            min: self.config.min_speed,
            max: self.config.max_speed,
        }
    }

    pub(crate) fn select(&mut self, ids: &[String]) {
        self.selection.select_items(ids);
    }

    /// Ids of items on `track_id` starting at or after `frame`, excluding
    /// `except`.
    pub(crate) fn items_from(&self, track_id: &str, frame: Frame, except: &[&str]) -> Vec<String> {
        self.state
            .items
            .items_on_track(track_id)
            .into_iter()
            .filter(|i| i.from >= frame && !except.contains(&i.id.as_str()))
            .map(|i| i.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{TimelineTrack, TrimOptions};

    fn engine_with_clip() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine
            .execute("Setup", |e| {
                e.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
                let out = e.state.items.add_item(TimelineItem::text("a", "t1", 0, 60, "A"));
                e.apply(out);
                Ok(())
            })
            .unwrap();
        engine.clear_history();
        engine.mark_saved();
        engine
    }

    #[test]
    fn unchanged_command_is_not_recorded() {
        let mut engine = engine_with_clip();
        engine.execute("Nothing", |_| Ok(())).unwrap();
        assert!(!engine.can_undo());
        assert!(!engine.is_dirty());
    }

    #[test]
    fn changed_command_is_recorded_and_undoable() {
        let mut engine = engine_with_clip();
        let before = engine.state().clone();
        engine
            .execute("Shift", |e| {
                let out = e.state.items.shift_items(&["a".to_string()], 10);
                e.apply(out);
                Ok(())
            })
            .unwrap();
        assert!(engine.is_dirty());
        assert_eq!(engine.undo_label(), Some("Shift"));

        assert!(engine.undo());
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.redo_label(), Some("Shift"));
        assert!(engine.redo());
        assert_eq!(engine.item("a").unwrap().from, 10);
        assert!(!engine.redo());
    }

    #[test]
    fn failed_command_rolls_back() {
        let mut engine = engine_with_clip();
        let before = engine.state().clone();
        let result: EngineResult<()> = engine.execute("Half done", |e| {
            let out = e
                .state
                .items
                .trim_item_end("a", -10, 30.0, TrimOptions::CLAMPED)?;
            e.apply(out);
            Err(TimelineError::invalid("late failure").into())
        });
        assert!(result.is_err());
        assert_eq!(engine.state(), &before);
        assert!(!engine.can_undo());
    }

    #[test]
    fn nested_execute_records_once() {
        let mut engine = engine_with_clip();
        engine
            .execute("Outer", |e| {
                e.execute("Inner", |e| {
                    let out = e.state.items.shift_items(&["a".to_string()], 5);
                    e.apply(out);
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(engine.undo_count(), 1);
        assert_eq!(engine.undo_label(), Some("Outer"));
    }

    #[test]
    fn batch_collapses_commands() {
        let mut engine = engine_with_clip();
        engine.begin_batch("Drag");
        for _ in 0..3 {
            engine
                .execute("Step", |e| {
                    let out = e.state.items.shift_items(&["a".to_string()], 1);
                    e.apply(out);
                    Ok(())
                })
                .unwrap();
        }
        assert!(engine.end_batch());
        assert_eq!(engine.undo_count(), 1);
        engine.undo();
        assert_eq!(engine.item("a").unwrap().from, 0);
    }

    #[test]
    fn undo_prunes_vanished_selection() {
        let mut engine = engine_with_clip();
        engine
            .execute("Add", |e| {
                let out = e.state.items.add_item(TimelineItem::text("b", "t1", 60, 30, "B"));
                e.apply(out);
                Ok(())
            })
            .unwrap();
        engine.selection_mut().select_items(&["a".to_string(), "b".to_string()]);
        engine.undo();
        assert_eq!(engine.selection().selected_item_ids(), vec!["a".to_string()]);
    }

    #[test]
    fn locked_track_rejects_edits() {
        let mut engine = engine_with_clip();
        engine
            .state
            .items
            .update_track("t1", &splice_timeline::TrackPatch {
                locked: Some(true),
                ..Default::default()
            })
            .unwrap();
        let err = engine.ensure_items_editable(&["a".to_string()]).unwrap_err();
        assert!(matches!(err, TimelineError::TrackLocked { .. }));
    }
}
