//! Per-document edit state: tool, selection, drag bookkeeping and the action
//! lifecycle.

use crate::input::PointerTarget;
use crate::path::PathNode;
use crate::scene::ElementId;
use crate::snap::AlignCandidates;
use crate::tools::ToolKind;
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Selection entry for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedState<G> {
    /// Geometry before the current manipulation. Every drag update is
    /// applied on top of this, never on top of live geometry.
    pub init_geom: G,
}

/// What dragging a reshape-bbox handle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleMode {
    #[default]
    Reshape,
    Rotate,
}

impl HandleMode {
    pub fn toggle(self) -> Self {
        match self {
            HandleMode::Reshape => HandleMode::Rotate,
            HandleMode::Rotate => HandleMode::Reshape,
        }
    }
}

/// The action currently in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Action {
    name: String,
    data: String,
}

/// Manipulation state of an open document.
///
/// `G` is the scene's geometry snapshot type.
#[derive(Debug, Clone)]
pub struct EditState<G> {
    pub tool: ToolKind,
    pub handle_mode: HandleMode,
    selected: HashMap<ElementId, SelectedState<G>>,
    /// Selection order, so handle indices stay stable.
    order: Vec<ElementId>,
    action: Option<Action>,
    locked: bool,

    /// Pointer position at press, in window coordinates.
    pub drag_start_pos: Point,
    /// Latest (possibly constrained or snapped) pointer position.
    pub drag_cur_pos: Point,
    /// Selection bbox when the drag started.
    pub drag_sel_start_bbox: Rect,
    /// Selection bbox following the raw pointer.
    pub drag_sel_cur_bbox: Rect,
    /// Selection bbox after snapping; transforms are computed from this.
    pub drag_sel_eff_bbox: Rect,
    /// What the press landed on, until release.
    pub drag_target: Option<PointerTarget>,
    /// Node being dragged in node editing.
    pub drag_node: Option<usize>,

    /// Snap candidates gathered at the start of the manipulation.
    pub align: AlignCandidates,

    /// Path whose nodes are being edited.
    pub active_path: Option<ElementId>,
    /// Nodes of the active path, from the last decomposition.
    pub path_nodes: Vec<PathNode>,
    /// Command indices that start each run of nodes.
    pub path_cmds: Vec<usize>,
    /// Number of node handles currently shown.
    pub n_node_handles: usize,
    /// Something was selected by the press without being dragged yet.
    pub sel_no_drag: bool,
}

impl<G> Default for EditState<G> {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            handle_mode: HandleMode::default(),
            selected: HashMap::new(),
            order: Vec::new(),
            action: None,
            locked: false,
            drag_start_pos: Point::ZERO,
            drag_cur_pos: Point::ZERO,
            drag_sel_start_bbox: Rect::ZERO,
            drag_sel_cur_bbox: Rect::ZERO,
            drag_sel_eff_bbox: Rect::ZERO,
            drag_target: None,
            drag_node: None,
            align: AlignCandidates::new(),
            active_path: None,
            path_nodes: Vec::new(),
            path_cmds: Vec::new(),
            n_node_handles: 0,
            sel_no_drag: false,
        }
    }
}

impl<G> EditState<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an action. Does nothing and returns false while another action
    /// is active or a start is in progress.
    pub fn start_action(&mut self, name: &str, data: &str) -> bool {
        let started = self.begin_action(name, data);
        if started {
            self.unlock_action();
        }
        started
    }

    /// First half of [`EditState::start_action`]: record the action and keep
    /// the lock held until [`EditState::unlock_action`]. Lets the caller take
    /// an undo checkpoint while further starts are still refused.
    pub fn begin_action(&mut self, name: &str, data: &str) -> bool {
        if self.locked || self.action.is_some() {
            log::debug!(
                "Ignoring start of {name}: {} already active",
                self.action_name()
            );
            return false;
        }
        self.locked = true;
        self.action = Some(Action {
            name: name.to_string(),
            data: data.to_string(),
        });
        log::debug!("Action started: {name} ({data})");
        true
    }

    pub fn unlock_action(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Finish the current action and clear the drag anchors.
    pub fn done_action(&mut self) {
        if let Some(action) = self.action.take() {
            log::debug!("Action done: {}", action.name);
        }
        self.locked = false;
        self.drag_reset();
    }

    pub fn in_action(&self) -> bool {
        self.action.is_some()
    }

    /// Name of the active action, empty when idle.
    pub fn action_name(&self) -> &str {
        self.action.as_ref().map_or("", |a| a.name.as_str())
    }

    pub fn action_data(&self) -> &str {
        self.action.as_ref().map_or("", |a| a.data.as_str())
    }

    /// Clear the per-drag pointer state. Selection bboxes stay, since they
    /// describe the selection rather than the drag.
    pub fn drag_reset(&mut self) {
        self.drag_start_pos = Point::ZERO;
        self.drag_cur_pos = Point::ZERO;
        self.drag_target = None;
        self.drag_node = None;
    }

    /// Anchor a new selection drag at `pos` with the selection's current bbox.
    pub fn drag_sel_start(&mut self, pos: Point, bbox: Rect) {
        self.drag_start_pos = pos;
        self.drag_cur_pos = pos;
        self.drag_sel_start_bbox = bbox;
        self.drag_sel_cur_bbox = bbox;
        self.drag_sel_eff_bbox = bbox;
    }

    /// Add an element with its geometry snapshot. Reselecting replaces the
    /// snapshot and keeps the original order.
    pub fn select(&mut self, id: ElementId, init_geom: G) {
        if self
            .selected
            .insert(id, SelectedState { init_geom })
            .is_none()
        {
            self.order.push(id);
        }
    }

    pub fn unselect(&mut self, id: ElementId) -> bool {
        if self.selected.remove(&id).is_some() {
            self.order.retain(|&o| o != id);
            true
        } else {
            false
        }
    }

    pub fn reset_selected(&mut self) {
        self.selected.clear();
        self.order.clear();
    }

    /// Replace the geometry snapshot of a selected element.
    pub fn set_init_geom(&mut self, id: ElementId, geom: G) -> bool {
        match self.selected.get_mut(&id) {
            Some(state) => {
                state.init_geom = geom;
                true
            }
            None => false,
        }
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selected.contains_key(&id)
    }

    pub fn has_selected(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.order.len()
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> &[ElementId] {
        &self.order
    }

    pub fn first_selected(&self) -> Option<ElementId> {
        self.order.first().copied()
    }

    /// Selected elements with their snapshots, in selection order.
    pub fn selected_elements(&self) -> impl Iterator<Item = (ElementId, &SelectedState<G>)> {
        self.order
            .iter()
            .filter_map(|id| self.selected.get(id).map(|s| (*id, s)))
    }

    pub fn selected_state(&self, id: ElementId) -> Option<&SelectedState<G>> {
        self.selected.get(&id)
    }

    /// Forget the node decomposition of the active path.
    pub fn clear_path_nodes(&mut self) {
        self.active_path = None;
        self.path_nodes.clear();
        self.path_cmds.clear();
        self.n_node_handles = 0;
    }
}
