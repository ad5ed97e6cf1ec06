//! `splice-project` -- Project file save/load for the Splice timeline engine.
//!
//! A project is one JSON document holding the root timeline (tracks, items,
//! transitions, keyframes), the sub-composition registry, markers and view
//! state.
//!
//! # Usage
//!
//! ```rust,no_run
//! use splice_project::{load_project, save_project, ProjectRecord, ProjectSettings};
//! use std::path::Path;
//!
//! let project = ProjectRecord::new("My Project", ProjectSettings::default());
//! save_project(&project, Path::new("project.splice")).unwrap();
//!
//! let loaded = load_project(Path::new("project.splice")).unwrap();
//! assert_eq!(loaded.name, "My Project");
//! ```

pub mod error;
pub mod load;
pub mod save;
pub mod types;

// Re-export primary API at crate root
pub use error::{ProjectError, ProjectResult};
pub use load::{from_json_string, load_project};
pub use save::{save_project, to_json_string};
pub use types::{touch_modified, Marker, ProjectRecord, ProjectSettings, CURRENT_VERSION};
