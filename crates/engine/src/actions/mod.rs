//! Edit verbs.
//!
//! Each submodule adds an `impl TimelineEngine` block. A verb validates its
//! preconditions, then runs its primitive mutations inside one
//! [`execute`](crate::TimelineEngine::execute) call so it is a single undo
//! step.

pub(crate) mod compositions;
mod edits;
mod effects;
mod freeze;
mod items;
mod keyframes;
mod magnetic;
mod project;
mod tracks;
mod transitions;
mod trim;
