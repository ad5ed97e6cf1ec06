//! Item and track selection.

use serde::{Deserialize, Serialize};

use crate::collaborators::SelectionSink;

/// Default [`SelectionSink`]: which items and tracks are selected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    selected_items: Vec<String>,
    selected_tracks: Vec<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an item. If `multi` is false, clears the item selection first.
    pub fn select_item(&mut self, item_id: &str, multi: bool) {
        if !multi {
            self.selected_items.clear();
        }
        if !self.is_item_selected(item_id) {
            self.selected_items.push(item_id.to_string());
        }
    }

    pub fn deselect_item(&mut self, item_id: &str) {
        self.selected_items.retain(|id| id != item_id);
    }

    pub fn select_track(&mut self, track_id: &str, multi: bool) {
        if !multi {
            self.selected_tracks.clear();
        }
        if !self.selected_tracks.iter().any(|id| id == track_id) {
            self.selected_tracks.push(track_id.to_string());
        }
    }

    pub fn selected_items(&self) -> &[String] {
        &self.selected_items
    }

    pub fn selected_tracks(&self) -> &[String] {
        &self.selected_tracks
    }

    pub fn is_item_selected(&self, item_id: &str) -> bool {
        self.selected_items.iter().any(|id| id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_items.is_empty() && self.selected_tracks.is_empty()
    }
}

impl SelectionSink for SelectionState {
    fn select_items(&mut self, item_ids: &[String]) {
        self.selected_items.clear();
        for id in item_ids {
            self.select_item(id, true);
        }
    }

    fn clear(&mut self) {
        self.selected_items.clear();
        self.selected_tracks.clear();
    }

    fn selected_item_ids(&self) -> Vec<String> {
        self.selected_items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_selection_is_empty() {
        let sel = SelectionState::new();
        assert!(sel.is_empty());
        assert!(sel.selected_item_ids().is_empty());
    }

    #[test]
    fn select_item_single_and_multi() {
        let mut sel = SelectionState::new();
        sel.select_item("a", false);
        sel.select_item("b", false);
        assert_eq!(sel.selected_items(), ["b".to_string()]);

        sel.select_item("c", true);
        sel.select_item("c", true);
        assert_eq!(sel.selected_items().len(), 2);

        sel.deselect_item("b");
        assert!(!sel.is_item_selected("b"));
    }

    #[test]
    fn sink_replaces_item_selection() {
        let mut sel = SelectionState::new();
        sel.select_item("old", false);
        sel.select_track("t1", false);
        sel.select_items(&["x".to_string(), "y".to_string(), "x".to_string()]);
        assert_eq!(sel.selected_item_ids(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(sel.selected_tracks().len(), 1);

        SelectionSink::clear(&mut sel);
        assert!(sel.is_empty());
    }
}
