//! Sub-composition navigation stack.
//!
//! Tracks which timeline is open for editing. Entering pushes the current
//! context onto a stash; exiting pops it. The navigator only keeps the stack;
//! the caller swaps the working state and writes composition records.

use serde::{Deserialize, Serialize};
use splice_common::Frame;
use tracing::info;

use crate::error::{TimelineError, TimelineResult};
use crate::state::TimelineState;
use crate::types::TimelineItem;

/// One entry of the breadcrumb trail; `composition_id = None` is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub composition_id: Option<String>,
    pub name: String,
}

/// A parked timeline context.
#[derive(Clone, Debug, PartialEq)]
pub struct StashedContext {
    /// Composition that was active when this context was parked.
    pub composition_id: Option<String>,
    pub state: TimelineState,
    pub current_frame: Frame,
}

/// What `exit` hands back: the composition that was left and the parent
/// context to restore.
#[derive(Clone, Debug, PartialEq)]
pub struct ExitedContext {
    pub composition_id: String,
    pub parent: StashedContext,
}

#[derive(Clone, Debug)]
pub struct CompositionNavigator {
    active: Option<String>,
    breadcrumbs: Vec<Breadcrumb>,
    stash: Vec<StashedContext>,
    max_depth: usize,
}

impl Default for CompositionNavigator {
    fn default() -> Self {
        Self::new(2)
    }
}

impl CompositionNavigator {
    /// `max_depth` counts the root timeline as level 1.
    pub fn new(max_depth: usize) -> Self {
        Self {
            active: None,
            breadcrumbs: vec![Breadcrumb {
                composition_id: None,
                name: "Main".to_string(),
            }],
            stash: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn active_composition_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    /// Current nesting level; 1 at the root.
    pub fn depth(&self) -> usize {
        self.stash.len() + 1
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parked contexts, outermost first.
    pub fn stashed(&self) -> &[StashedContext] {
        &self.stash
    }

    /// Whether `composition_id` is active or parked below the active one.
    pub fn is_open(&self, composition_id: &str) -> bool {
        self.active.as_deref() == Some(composition_id)
            || self
                .stash
                .iter()
                .any(|s| s.composition_id.as_deref() == Some(composition_id))
    }

    pub fn is_root(&self) -> bool {
        self.active.is_none()
    }

    /// Whether a new composition may be created at the current level.
    pub fn can_nest(&self) -> bool {
        self.depth() < self.max_depth
    }

    /// Validate an enter without changing anything.
    pub fn check_enter(&self, composition_id: &str) -> TimelineResult<()> {
        if self.depth() + 1 > self.max_depth {
            return Err(TimelineError::NestingTooDeep {
                max_depth: self.max_depth,
                composition_id: composition_id.to_string(),
            });
        }
        if self.is_open(composition_id) {
            return Err(TimelineError::CompositionCycle {
                composition_id: composition_id.to_string(),
            });
        }
        Ok(())
    }

    /// Park the current context and make `composition_id` active.
    pub fn enter(
        &mut self,
        composition_id: &str,
        name: &str,
        parked: TimelineState,
        current_frame: Frame,
    ) -> TimelineResult<()> {
        self.check_enter(composition_id)?;
        self.stash.push(StashedContext {
            composition_id: self.active.take(),
            state: parked,
            current_frame,
        });
        self.active = Some(composition_id.to_string());
        self.breadcrumbs.push(Breadcrumb {
            composition_id: Some(composition_id.to_string()),
            name: name.to_string(),
        });
        info!(composition_id, depth = self.depth(), "Entered composition");
        Ok(())
    }

    /// Pop one level. `None` at the root.
    pub fn exit(&mut self) -> Option<ExitedContext> {
        let composition_id = self.active.clone()?;
        let parent = self.stash.pop()?;
        self.breadcrumbs.pop();
        self.active = parent.composition_id.clone();
        info!(composition_id = %composition_id, depth = self.depth(), "Exited composition");
        Some(ExitedContext {
            composition_id,
            parent,
        })
    }

    /// Drop all navigation state (project load).
    pub fn reset(&mut self) {
        *self = Self::new(self.max_depth);
    }
}

/// First composition item on `state` that references `composition_id`.
pub fn find_reference<'a>(state: &'a TimelineState, composition_id: &str) -> Option<&'a TimelineItem> {
    state
        .items
        .items()
        .iter()
        .filter(|i| i.composition_id() == Some(composition_id))
        .min_by_key(|i| i.from)
}

/// Map a parent-timeline frame into a composition item's local frame space.
pub fn frame_into(item: &TimelineItem, parent_frame: Frame) -> Frame {
    (parent_frame - item.from).clamp(0, item.duration_in_frames - 1)
}

/// Map a local frame back onto the parent timeline through `item`.
pub fn frame_out_of(item: &TimelineItem, local_frame: Frame) -> Frame {
    item.from + local_frame.clamp(0, item.duration_in_frames - 1)
}
