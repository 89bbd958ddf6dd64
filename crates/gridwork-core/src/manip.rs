//! Manipulation controllers: move, resize, rotate, path node editing and
//! rubber-band selection, plus pointer event dispatch.
//!
//! Each drag update recomputes the whole transform from the drag start and
//! applies it to the selection's pre-manipulation geometry.

use crate::canvas::{BOX_SELECT_ACTION, Canvas};
use crate::edit::HandleMode;
use crate::error::{EditError, EditResult};
use crate::geom::{BBoxPos, DeltaTransform, clamp_min_size, rect_size};
use crate::handles::{HandleId, HandleKind};
use crate::input::{Modifiers, PointerEvent, PointerTarget};
use crate::path::{decompose, set_one_point};
use crate::scene::Scene;
use crate::snap::{ANGLE_SNAP_INCREMENT, constrain_point, snap_angle};
use kurbo::{Point, Rect, Size, Vec2};

/// Move the edges a reshape handle controls.
fn reshape_edges(pos: BBoxPos, cur: &mut Rect, delta: Vec2) {
    match pos {
        BBoxPos::UpL => {
            cur.x0 += delta.x;
            cur.y0 += delta.y;
        }
        BBoxPos::UpC => cur.y0 += delta.y,
        BBoxPos::UpR => {
            cur.y0 += delta.y;
            cur.x1 += delta.x;
        }
        BBoxPos::DnL => {
            cur.x0 += delta.x;
            cur.y1 += delta.y;
        }
        BBoxPos::DnC => cur.y1 += delta.y,
        BBoxPos::DnR => {
            cur.x1 += delta.x;
            cur.y1 += delta.y;
        }
        BBoxPos::LfM => cur.x0 += delta.x,
        BBoxPos::RtM => cur.x1 += delta.x,
    }
}

/// Per-handle rotation geometry. Moves the dragged corners of `cur` and
/// returns the `(dx, dy)` whose angle is the rotation, and the pivot.
///
/// Corner handles pivot on a corner of the start box, edge handles on its
/// center, and each handle measures its angle along its own pair of edges.
fn rotate_geometry(pos: BBoxPos, start: Rect, cur: &mut Rect, delta: Vec2) -> (Vec2, Point) {
    let center = start.center();
    match pos {
        BBoxPos::UpL => {
            cur.x0 += delta.x;
            cur.y0 += delta.y;
            (
                Vec2::new(start.x1 - cur.x0, start.y0 - cur.y0),
                Point::new(start.x1, start.y0),
            )
        }
        BBoxPos::UpC | BBoxPos::UpR => {
            cur.y0 += delta.y;
            cur.x1 += delta.x;
            let axis = Vec2::new(cur.x1 - start.x0, cur.y0 - start.y0);
            let pivot = if pos == BBoxPos::UpC {
                center
            } else {
                Point::new(start.x0, start.y0)
            };
            (axis, pivot)
        }
        BBoxPos::DnL | BBoxPos::LfM => {
            cur.x0 += delta.x;
            cur.y1 += delta.y;
            let axis = Vec2::new(start.x1 - cur.x0, start.y1 - cur.y1);
            let pivot = if pos == BBoxPos::DnL {
                Point::new(start.x1, start.y1)
            } else {
                center
            };
            (axis, pivot)
        }
        BBoxPos::DnC | BBoxPos::DnR | BBoxPos::RtM => {
            cur.x1 += delta.x;
            cur.y1 += delta.y;
            let axis = Vec2::new(cur.x1 - start.x0, cur.y1 - start.y1);
            let pivot = if pos == BBoxPos::DnR {
                Point::new(start.x0, start.y1)
            } else {
                center
            };
            (axis, pivot)
        }
    }
}

/// `new / old`, or 1 when the old extent is degenerate.
fn ratio(new: f64, old: f64) -> f64 {
    if old.abs() < f64::EPSILON { 1.0 } else { new / old }
}

impl<S: Scene> Canvas<S> {
    /// Start the action of a selection gesture once, with its candidates.
    fn start_selection_action(&mut self, action: &str) {
        if self.edit.in_action() {
            return;
        }
        let names = self.selected_names();
        if self.manip_start(action, &names) {
            self.gather_alignment_candidates();
        }
    }

    /// Move the selection by a pointer delta.
    pub fn drag_move(&mut self, delta: Vec2) -> EditResult<()> {
        if !self.edit.has_selected() {
            return Ok(());
        }
        self.edit.drag_sel_cur_bbox = self.edit.drag_sel_cur_bbox + delta;
        self.start_selection_action("Move");

        let eff = self.snap_cur_bbox(true).effective;
        let start = self.edit.drag_sel_start_bbox;
        let xf = DeltaTransform::new(
            eff.origin() - start.origin(),
            Vec2::new(1.0, 1.0),
            0.0,
            start.origin(),
        );
        self.apply_to_selected(&xf)?;

        self.set_sel_handles(eff);
        self.manip_update();
        Ok(())
    }

    /// Resize the selection by dragging one of the eight reshape handles.
    pub fn reshape_drag(&mut self, pos: BBoxPos, delta: Vec2) -> EditResult<()> {
        if !self.edit.has_selected() {
            return Ok(());
        }
        self.start_selection_action("Reshape");

        let mut cur = self.edit.drag_sel_cur_bbox;
        reshape_edges(pos, &mut cur, delta);
        self.edit.drag_sel_cur_bbox = clamp_min_size(cur);

        let eff = self.snap_cur_bbox(false).effective;
        let start = self.edit.drag_sel_start_bbox;
        let (st_size, eff_size) = (rect_size(start), rect_size(eff));
        let xf = DeltaTransform::new(
            eff.origin() - start.origin(),
            Vec2::new(ratio(eff_size.x, st_size.x), ratio(eff_size.y, st_size.y)),
            0.0,
            start.origin(),
        );
        log::trace!("Reshape {}: scale {:?}", pos.name(), xf.scale);
        self.apply_to_selected(&xf)?;

        self.set_sel_handles(eff);
        self.manip_update();
        Ok(())
    }

    /// Rotate the selection by dragging one of the eight handles in rotate
    /// mode. The angle snaps to [`ANGLE_SNAP_INCREMENT`] degrees.
    pub fn rotate_drag(&mut self, pos: BBoxPos, delta: Vec2) -> EditResult<()> {
        if !self.edit.has_selected() {
            return Ok(());
        }
        self.start_selection_action("Rotate");

        let start = self.edit.drag_sel_start_bbox;
        let mut cur = self.edit.drag_sel_cur_bbox;
        let (axis, pivot) = rotate_geometry(pos, start, &mut cur, delta);
        self.edit.drag_sel_cur_bbox = cur;

        let degrees = snap_angle(axis.y.atan2(axis.x).to_degrees(), ANGLE_SNAP_INCREMENT);
        log::trace!("Rotate {}: {degrees} degrees about {pivot:?}", pos.name());
        self.apply_to_selected(&DeltaTransform::rotate_about(degrees.to_radians(), pivot))?;

        self.set_sel_handles(cur);
        self.manip_update();
        Ok(())
    }

    /// Track the rubber band from the press position to `pos`.
    pub fn rubber_band_drag(&mut self, pos: Point) {
        if !self.edit.in_action() {
            self.edit.start_action(BOX_SELECT_ACTION, "");
        }
        self.edit.drag_cur_pos = pos;
        let band = Rect::from_points(self.edit.drag_start_pos, pos);
        self.set_rubber_band(band);
        self.manip_update();
    }

    // --- Path node editing ---

    /// Decompose the first selected path and show a handle on each node.
    pub fn update_node_handles(&mut self) -> EditResult<()> {
        let path_id = self
            .edit
            .selected_ids()
            .iter()
            .copied()
            .find(|&id| self.scene.path(id).is_some());
        let Some(id) = path_id else {
            self.remove_node_handles();
            return Ok(());
        };
        let to_window = self
            .scene
            .path_to_window(id, self.view())
            .ok_or(EditError::NotAPath(id))?;
        let path = self.scene.path(id).ok_or(EditError::NotAPath(id))?;
        let (nodes, cmds) = decompose(path, to_window);

        for (i, node) in nodes.iter().enumerate() {
            let hid = HandleId::node_point(i);
            self.handles.request(hid, Size::ZERO);
            self.handles.set_position(hid, node.win_pt);
        }
        self.handles.deactivate_from(HandleKind::NodePoint, nodes.len());

        let mut n_ctrls = 0;
        for ctrl in nodes.iter().flat_map(|n| n.win_ctrls.iter().copied()) {
            let hid = HandleId::node_ctrl(n_ctrls);
            self.handles.request(hid, Size::ZERO);
            self.handles.set_position(hid, ctrl);
            n_ctrls += 1;
        }
        self.handles.deactivate_from(HandleKind::NodeCtrl, n_ctrls);

        self.edit.n_node_handles = nodes.len();
        self.edit.active_path = Some(id);
        self.edit.path_nodes = nodes;
        self.edit.path_cmds = cmds;
        Ok(())
    }

    /// Hide node handles and forget the active path.
    pub fn remove_node_handles(&mut self) {
        self.handles.deactivate_all(HandleKind::NodePoint);
        self.handles.deactivate_all(HandleKind::NodeCtrl);
        self.edit.clear_path_nodes();
    }

    /// Press on node handle `index`.
    pub fn node_press(&mut self, index: usize, pos: Point) {
        self.edit.sel_no_drag = false;
        self.edit.drag_target = Some(PointerTarget::Handle(HandleId::node_point(index)));
        self.edit.drag_node = Some(index);
        self.edit.drag_start_pos = pos;
        self.edit.drag_cur_pos = pos;
        self.last_pos = pos;
    }

    /// Drag node `index` to the pointer position `pos`.
    ///
    /// With `constrain` the move keeps only its dominant axis; otherwise it
    /// snaps to other nodes, alignment candidates and the grid when node
    /// snapping is on. The path keeps the decomposition taken at press time,
    /// and only the dragged handle moves until release.
    pub fn node_drag(&mut self, index: usize, pos: Point, constrain: bool) -> EditResult<()> {
        let path_id = self.edit.active_path.ok_or(EditError::NoActivePath)?;
        let len = self.edit.path_nodes.len();
        if index >= len {
            return Err(EditError::NodeOutOfRange { index, len });
        }

        if !self.edit.in_action() {
            let name = self.scene.element_name(path_id).unwrap_or_default();
            if self.manip_start("NodeAdj", &name) {
                self.gather_alignment_candidates();
                for (i, node) in self.edit.path_nodes.iter().enumerate() {
                    if i != index {
                        self.edit.align.add_node(node.win_pt);
                    }
                }
            }
        }
        self.show_align_match(None);

        let mut point = pos;
        if constrain {
            point = constrain_point(self.edit.drag_start_pos, point).0;
        } else if self.prefs().snap_nodes {
            let grid = self.snap_engine().grid(&self.camera);
            point = self
                .snap_engine()
                .snap_node_point(point, &self.edit.align, grid)
                .point;
        }
        self.edit.drag_cur_pos = point;
        let delta = point - self.edit.drag_start_pos;

        let to_window = self
            .scene
            .path_to_window(path_id, self.view())
            .ok_or(EditError::NotAPath(path_id))?;
        let path = self
            .scene
            .path_mut(path_id)
            .ok_or(EditError::NotAPath(path_id))?;
        set_one_point(path, &self.edit.path_nodes, index, delta, to_window)?;

        let win_pt = self.edit.path_nodes[index].win_pt;
        self.handles
            .set_position(HandleId::node_point(index), win_pt + delta);
        self.manip_update();
        Ok(())
    }

    /// Release a node drag: re-decompose, reposition all node handles and
    /// finish the action.
    pub fn node_release(&mut self) -> EditResult<()> {
        let result = self.update_node_handles();
        self.manip_done();
        result
    }

    // --- Dispatch ---

    /// Route a primary-button pointer event.
    ///
    /// `target` is what the press landed on. Drags and releases go to the
    /// controller chosen at press time, whatever is under the pointer.
    pub fn handle_pointer(&mut self, target: PointerTarget, event: PointerEvent) -> EditResult<()> {
        match event {
            PointerEvent::Press { position, .. } => self.pointer_press(target, position),
            PointerEvent::Drag {
                position,
                modifiers,
            } => self.pointer_drag(position, modifiers),
            PointerEvent::Release { .. } => self.pointer_release(),
        }
    }

    fn pointer_press(&mut self, target: PointerTarget, pos: Point) -> EditResult<()> {
        self.last_pos = pos;
        match target {
            PointerTarget::Handle(id) => match id.kind {
                HandleKind::NodePoint => self.node_press(id.index, pos),
                HandleKind::ReshapeBBox => {
                    self.drag_sel_start(pos);
                    self.edit.drag_target = Some(target);
                }
                HandleKind::SelBBox => {
                    self.drag_sel_start(pos);
                    self.edit.drag_target = Some(PointerTarget::Selection);
                }
                _ => log::debug!("Ignoring press on handle {id}"),
            },
            PointerTarget::Element(id) => {
                if self.edit.tool.edits_nodes() {
                    return self.set_selection(&[id]);
                }
                let already = self.edit.is_selected(id);
                if !already {
                    self.set_selection(&[id])?;
                }
                self.drag_sel_start(pos);
                self.edit.drag_target = Some(PointerTarget::Selection);
                self.edit.sel_no_drag = already;
            }
            PointerTarget::Selection => {
                self.drag_sel_start(pos);
                self.edit.drag_target = Some(target);
                self.edit.sel_no_drag = true;
            }
            PointerTarget::Background => {
                self.reset_selected();
                self.edit.drag_start_pos = pos;
                self.edit.drag_cur_pos = pos;
                self.edit.drag_target = Some(target);
            }
        }
        Ok(())
    }

    fn pointer_drag(&mut self, pos: Point, modifiers: Modifiers) -> EditResult<()> {
        let delta = pos - self.last_pos;
        self.last_pos = pos;
        self.edit.sel_no_drag = false;
        match self.edit.drag_target {
            Some(PointerTarget::Selection) => self.drag_move(delta),
            Some(PointerTarget::Handle(id)) => match (id.kind, id.pos()) {
                (HandleKind::ReshapeBBox, Some(p)) => match self.edit.handle_mode {
                    HandleMode::Reshape => self.reshape_drag(p, delta),
                    HandleMode::Rotate => self.rotate_drag(p, delta),
                },
                (HandleKind::NodePoint, _) => self.node_drag(id.index, pos, modifiers.ctrl),
                _ => Ok(()),
            },
            Some(PointerTarget::Background) => {
                if !self.edit.tool.edits_nodes() {
                    self.rubber_band_drag(pos);
                }
                Ok(())
            }
            Some(PointerTarget::Element(_)) | None => Ok(()),
        }
    }

    fn pointer_release(&mut self) -> EditResult<()> {
        let target = self.edit.drag_target;
        let clicked = self.edit.sel_no_drag;
        self.edit.sel_no_drag = false;
        if let Some(PointerTarget::Handle(id)) = target {
            if id.kind == HandleKind::NodePoint {
                return self.node_release();
            }
        }
        if self.edit.in_action() {
            self.manip_done();
            return Ok(());
        }
        if clicked && target == Some(PointerTarget::Selection) {
            self.edit.handle_mode = self.edit.handle_mode.toggle();
            log::debug!("Handle mode: {:?}", self.edit.handle_mode);
        }
        self.edit.drag_reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Preferences;
    use crate::scene::{Drawing, Element, ElementId};
    use kurbo::Affine;

    const EPS: f64 = 1e-9;

    fn no_snap() -> Preferences {
        Preferences {
            snap_grid: false,
            snap_guide: false,
            snap_nodes: false,
            ..Preferences::default()
        }
    }

    fn one_rect(prefs: Preferences) -> (Canvas<Drawing>, ElementId) {
        let mut drawing = Drawing::new();
        let id = drawing.add(Element::rect("r", Rect::new(0.0, 0.0, 100.0, 50.0)));
        let mut canvas = Canvas::new(drawing, prefs);
        canvas.set_selection(&[id]).unwrap();
        (canvas, id)
    }

    fn bbox(canvas: &Canvas<Drawing>, id: ElementId) -> Rect {
        canvas.scene.window_bbox(id, canvas.view()).unwrap()
    }

    fn near(a: Rect, b: Rect) -> bool {
        (a.x0 - b.x0).abs() < EPS
            && (a.y0 - b.y0).abs() < EPS
            && (a.x1 - b.x1).abs() < EPS
            && (a.y1 - b.y1).abs() < EPS
    }

    #[test]
    fn test_reshape_edge_table() {
        let start = Rect::new(0.0, 0.0, 10.0, 10.0);
        let d = Vec2::new(2.0, 3.0);
        let cases = [
            (BBoxPos::UpL, Rect::new(2.0, 3.0, 10.0, 10.0)),
            (BBoxPos::UpC, Rect::new(0.0, 3.0, 10.0, 10.0)),
            (BBoxPos::UpR, Rect::new(0.0, 3.0, 12.0, 10.0)),
            (BBoxPos::DnL, Rect::new(2.0, 0.0, 10.0, 13.0)),
            (BBoxPos::DnC, Rect::new(0.0, 0.0, 10.0, 13.0)),
            (BBoxPos::DnR, Rect::new(0.0, 0.0, 12.0, 13.0)),
            (BBoxPos::LfM, Rect::new(2.0, 0.0, 10.0, 10.0)),
            (BBoxPos::RtM, Rect::new(0.0, 0.0, 12.0, 10.0)),
        ];
        for (pos, expected) in cases {
            let mut cur = start;
            reshape_edges(pos, &mut cur, d);
            assert_eq!(cur, expected, "{}", pos.name());
        }
    }

    #[test]
    fn test_rotate_pivots() {
        let start = Rect::new(0.0, 0.0, 100.0, 50.0);
        let center = Point::new(50.0, 25.0);
        let expected = [
            (BBoxPos::UpL, Point::new(100.0, 0.0)),
            (BBoxPos::UpC, center),
            (BBoxPos::UpR, Point::new(0.0, 0.0)),
            (BBoxPos::DnL, Point::new(100.0, 50.0)),
            (BBoxPos::DnC, center),
            (BBoxPos::DnR, Point::new(0.0, 50.0)),
            (BBoxPos::LfM, center),
            (BBoxPos::RtM, center),
        ];
        for (pos, pivot) in expected {
            let mut cur = start;
            let (_, p) = rotate_geometry(pos, start, &mut cur, Vec2::ZERO);
            assert_eq!(p, pivot, "{}", pos.name());
        }
    }

    #[test]
    fn test_drag_move_from_init_geom() {
        let (mut canvas, id) = one_rect(no_snap());
        canvas.drag_sel_start(Point::new(50.0, 25.0));
        for _ in 0..10 {
            canvas.drag_move(Vec2::new(1.5, -0.5)).unwrap();
        }
        assert!(near(bbox(&canvas, id), Rect::new(15.0, -5.0, 115.0, 45.0)));
        assert_eq!(canvas.edit.action_name(), "Move");
        assert_eq!(canvas.scene.undo_log().count(), 1);
        let up_l = canvas.handles.get(HandleId::reshape(BBoxPos::UpL)).unwrap();
        assert!((up_l.position - Point::new(15.0, -5.0)).hypot() < EPS);
    }

    #[test]
    fn test_drag_move_snaps_to_guide() {
        let mut drawing = Drawing::new();
        let id = drawing.add(Element::rect("r", Rect::new(0.0, 0.0, 100.0, 50.0)));
        drawing.add(Element::rect("other", Rect::new(150.0, 300.0, 200.0, 350.0)));
        let prefs = Preferences {
            snap_grid: false,
            snap_tol: 1,
            ..Preferences::default()
        };
        let mut canvas = Canvas::new(drawing, prefs);
        canvas.set_selection(&[id]).unwrap();
        canvas.drag_sel_start(Point::ZERO);
        // Right edge lands 5px short of the other box's right edge (tolerance 12px).
        canvas.drag_move(Vec2::new(95.0, 100.0)).unwrap();
        assert!(near(bbox(&canvas, id), Rect::new(100.0, 100.0, 200.0, 150.0)));
        let matched = canvas.last_align_match().unwrap();
        assert_eq!(matched.candidate.value, 200.0);
        assert_eq!(canvas.handles.active_count(HandleKind::AlignMatch), 1);

        canvas.manip_done();
        assert_eq!(canvas.handles.active_count(HandleKind::AlignMatch), 0);
        assert!(canvas.last_align_match().is_none());
    }

    #[test]
    fn test_reshape_clamps_to_min_size() {
        let (mut canvas, id) = one_rect(no_snap());
        canvas.drag_sel_start(Point::new(100.0, 50.0));
        canvas.reshape_drag(BBoxPos::LfM, Vec2::new(150.0, 0.0)).unwrap();
        let cur = canvas.edit.drag_sel_cur_bbox;
        assert!(cur.x0 <= cur.x1 - 1.0);
        assert!(near(bbox(&canvas, id), Rect::new(99.0, 0.0, 100.0, 50.0)));
    }

    #[test]
    fn test_rotate_snaps_to_increment() {
        let (mut canvas, id) = one_rect(no_snap());
        canvas.drag_sel_start(Point::new(100.0, 50.0));
        let dy = 100.0 * 20.0_f64.to_radians().tan();
        canvas.rotate_drag(BBoxPos::DnR, Vec2::new(0.0, dy)).unwrap();
        let expected = Affine::translate((0.0, 50.0))
            * Affine::rotate(15.0_f64.to_radians())
            * Affine::translate((0.0, -50.0));
        let actual = canvas.scene.read_geom(id).unwrap();
        for (a, e) in actual.as_coeffs().iter().zip(expected.as_coeffs()) {
            assert!((a - e).abs() < EPS);
        }
        assert_eq!(canvas.edit.action_name(), "Rotate");
    }

    #[test]
    fn test_click_on_selection_toggles_rotate_mode() {
        let (mut canvas, _) = one_rect(no_snap());
        let press = PointerEvent::Press {
            position: Point::new(10.0, 10.0),
            modifiers: Modifiers::NONE,
        };
        let release = PointerEvent::Release {
            position: Point::new(10.0, 10.0),
            modifiers: Modifiers::NONE,
        };
        canvas.handle_pointer(PointerTarget::Selection, press).unwrap();
        canvas.handle_pointer(PointerTarget::Selection, release).unwrap();
        assert_eq!(canvas.edit.handle_mode, HandleMode::Rotate);
        assert!(!canvas.edit.in_action());
        assert!(!canvas.scene.can_undo());
    }

    #[test]
    fn test_node_handles_include_control_points() {
        use crate::path::{PathCmd, PathData};
        use crate::tools::ToolKind;

        let curve = PathData::new()
            .with(PathCmd::M, &[10.0, 10.0])
            .with(PathCmd::c, &[0.0, 10.0, 10.0, 10.0, 10.0, 0.0])
            .with(PathCmd::l, &[5.0, 0.0]);
        let mut drawing = Drawing::new();
        let id = drawing.add(Element::path("curve", curve));
        let mut canvas = Canvas::new(drawing, no_snap());
        canvas.set_tool(ToolKind::Node).unwrap();
        canvas.set_selection(&[id]).unwrap();

        assert_eq!(canvas.handles.active_count(HandleKind::NodePoint), 3);
        assert_eq!(canvas.handles.active_count(HandleKind::NodeCtrl), 2);
        let ctrl = canvas.handles.get(HandleId::node_ctrl(1)).unwrap();
        assert!((ctrl.position - Point::new(20.0, 20.0)).hypot() < EPS);

        let press = PointerEvent::Press {
            position: Point::new(500.0, 500.0),
            modifiers: Modifiers::NONE,
        };
        canvas.handle_pointer(PointerTarget::Background, press).unwrap();
        assert_eq!(canvas.handles.active_count(HandleKind::NodeCtrl), 0);
    }

    #[test]
    fn test_node_drag_requires_active_path() {
        let (mut canvas, _) = one_rect(no_snap());
        assert_eq!(
            canvas.node_drag(0, Point::ZERO, false),
            Err(EditError::NoActivePath)
        );
    }
}
