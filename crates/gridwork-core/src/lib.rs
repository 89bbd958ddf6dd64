//! Gridwork Core Library
//!
//! Interactive manipulation engine for the Gridwork vector drawing editor:
//! turns pointer drags into transforms on selected elements and path nodes,
//! with grid and alignment snapping, overlay handles and undo-checkpointed
//! actions.

pub mod camera;
pub mod canvas;
pub mod edit;
pub mod error;
pub mod geom;
pub mod handles;
pub mod input;
pub mod manip;
pub mod path;
pub mod physize;
pub mod prefs;
pub mod refresh;
pub mod scene;
pub mod snap;
pub mod tools;

pub use camera::Camera;
pub use canvas::{BOX_SELECT_ACTION, Canvas};
pub use edit::{EditState, HandleMode, SelectedState};
pub use error::{EditError, EditResult};
pub use geom::{AlignAnchor, Axis, BBoxPos, DeltaTransform, delta_transform};
pub use handles::{Handle, HandleId, HandleKind, HandleRegistry, HandleShape, HandleStrategy, HandleSub};
pub use input::{Modifiers, PointerEvent, PointerTarget};
pub use path::{PathCmd, PathData, PathNode, decompose, set_one_point, set_point};
pub use physize::{PhysSize, StdSize, Units};
pub use prefs::Preferences;
pub use refresh::{RefreshScheduler, Repaint, RequestOutcome};
pub use scene::{Drawing, Element, ElementId, ElementKind, Scene};
pub use snap::{
    AlignCandidates, AlignMatch, BBoxSnap, SnapEngine, SnapResult, snap_to_increment, snap_to_point,
};
pub use tools::ToolKind;
