//! Canvas: a scene together with its view, snapping, handles and edit state.
//!
//! The manipulation controllers live in [`crate::manip`] as further methods
//! on [`Canvas`].

use crate::camera::Camera;
use crate::edit::EditState;
use crate::error::{EditError, EditResult};
use crate::geom::{Axis, BBoxPos, DeltaTransform, rect_contains};
use crate::handles::{HandleId, HandleKind, HandleRegistry};
use crate::prefs::Preferences;
use crate::refresh::{RefreshScheduler, Repaint};
use crate::scene::{ElementId, Scene};
use crate::snap::{AlignMatch, BBoxSnap, SnapEngine};
use crate::tools::ToolKind;
use kurbo::{Affine, Point, Rect, Size};

/// Action name used by rubber-band selection.
pub const BOX_SELECT_ACTION: &str = "BoxSelect";

/// An editable view of one scene.
pub struct Canvas<S: Scene> {
    pub scene: S,
    pub camera: Camera,
    pub handles: HandleRegistry,
    pub edit: EditState<S::Geom>,
    snap: SnapEngine,
    refresh: Option<RefreshScheduler>,
    /// Guide snap shown by the last bbox snap.
    last_match: Option<AlignMatch>,
    /// Raw pointer position of the previous event in a drag.
    pub(crate) last_pos: Point,
}

impl<S: Scene> Canvas<S> {
    /// Create a canvas. Preferences are validated by [`Canvas::set_prefs`];
    /// here they are taken as given.
    pub fn new(scene: S, prefs: Preferences) -> Self {
        Self {
            scene,
            camera: Camera::new(),
            handles: HandleRegistry::default(),
            edit: EditState::new(),
            snap: SnapEngine::new(prefs),
            refresh: None,
            last_match: None,
            last_pos: Point::ZERO,
        }
    }

    /// Use a device pixel scale other than 1 for handle sizes.
    pub fn with_dpi_scale(mut self, dpi_scale: f64) -> Self {
        self.handles = HandleRegistry::new(dpi_scale);
        self
    }

    /// Redraw `target` in the background while manipulating.
    pub fn with_refresh(mut self, target: impl Repaint) -> Self {
        self.refresh = Some(RefreshScheduler::new(target));
        self
    }

    pub fn refresh(&self) -> Option<&RefreshScheduler> {
        self.refresh.as_ref()
    }

    pub fn prefs(&self) -> &Preferences {
        self.snap.prefs()
    }

    pub fn set_prefs(&mut self, prefs: Preferences) -> EditResult<()> {
        prefs.validate()?;
        self.snap.set_prefs(prefs);
        Ok(())
    }

    pub fn snap_engine(&self) -> &SnapEngine {
        &self.snap
    }

    /// Drawing to window transform.
    pub fn view(&self) -> Affine {
        self.camera.view()
    }

    /// Change the view and move the handles with it.
    pub fn set_camera(&mut self, camera: Camera) -> EditResult<()> {
        self.camera = camera;
        self.update_handles()
    }

    pub fn tool(&self) -> ToolKind {
        self.edit.tool
    }

    /// Switch tools, swapping bbox handles for node handles as needed.
    pub fn set_tool(&mut self, tool: ToolKind) -> EditResult<()> {
        if self.edit.tool == tool {
            return Ok(());
        }
        log::debug!("Tool changed: {} -> {}", self.edit.tool.name(), tool.name());
        self.edit.tool = tool;
        if !tool.edits_nodes() {
            self.remove_node_handles();
        }
        self.update_handles()
    }

    /// The alignment match currently shown, if any.
    pub fn last_align_match(&self) -> Option<AlignMatch> {
        self.last_match
    }

    // --- Action lifecycle ---

    /// Start a manipulation. The first call of a gesture starts the action
    /// and saves one undo checkpoint before anything is mutated; repeated
    /// calls are ignored.
    pub fn manip_start(&mut self, action: &str, data: &str) -> bool {
        if !self.edit.begin_action(action, data) {
            return false;
        }
        log::debug!("Saving undo checkpoint: {action}: {data}");
        self.scene.save_undo(action, data);
        self.edit.unlock_action();
        true
    }

    /// Finish a manipulation: complete a box select, clear drag state and the
    /// action, and bring the handles up to date.
    pub fn manip_done(&mut self) {
        if self.edit.action_name() == BOX_SELECT_ACTION {
            let band = Rect::from_points(self.edit.drag_start_pos, self.edit.drag_cur_pos);
            self.handles.deactivate_all(HandleKind::RubberBand);
            let found = self.select_within_bbox(band);
            log::debug!("Box select found {} elements", found.len());
            if !found.is_empty() {
                self.edit.reset_selected();
                for id in found {
                    if let Err(e) = self.select(id) {
                        log::warn!("Box select skipped element: {e}");
                    }
                }
                let cur = self.edit.drag_cur_pos;
                self.drag_sel_start(cur);
            }
        }
        self.show_align_match(None);
        self.edit.done_action();
        if !self.edit.tool.edits_nodes() {
            self.update_sel_handles();
        }
        self.manip_update();
    }

    /// Ask for a redraw without waiting for it.
    pub fn manip_update(&self) {
        if let Some(refresh) = &self.refresh {
            refresh.request();
        }
    }

    // --- Selection ---

    /// Add an element to the selection with a snapshot of its geometry.
    pub fn select(&mut self, id: ElementId) -> EditResult<()> {
        let geom = self
            .scene
            .read_geom(id)
            .ok_or(EditError::UnknownElement(id))?;
        self.edit.select(id, geom);
        Ok(())
    }

    pub fn unselect(&mut self, id: ElementId) {
        if self.edit.unselect(id) {
            self.update_sel_handles();
        }
    }

    /// Replace the selection and refresh the handles.
    pub fn set_selection(&mut self, ids: &[ElementId]) -> EditResult<()> {
        self.edit.reset_selected();
        for &id in ids {
            self.select(id)?;
        }
        self.update_handles()
    }

    pub fn reset_selected(&mut self) {
        self.edit.reset_selected();
        self.remove_node_handles();
        self.update_sel_handles();
    }

    /// Names of the selected elements, space separated, for undo labels.
    pub fn selected_names(&self) -> String {
        self.edit
            .selected_ids()
            .iter()
            .filter_map(|&id| self.scene.element_name(id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Window bbox enclosing the whole selection.
    pub fn selection_bbox(&self) -> Option<Rect> {
        let view = self.view();
        self.edit
            .selected_ids()
            .iter()
            .filter_map(|&id| self.scene.window_bbox(id, view))
            .reduce(|a, b| a.union(b))
    }

    /// Elements whose window bbox lies entirely inside `bbox`.
    pub fn select_within_bbox(&self, bbox: Rect) -> Vec<ElementId> {
        let view = self.view();
        self.scene
            .element_ids()
            .into_iter()
            .filter(|&id| {
                self.scene
                    .window_bbox(id, view)
                    .is_some_and(|b| rect_contains(bbox, b))
            })
            .collect()
    }

    /// Re-read the geometry snapshot of every selected element.
    pub fn refresh_init_geom(&mut self) {
        let ids = self.edit.selected_ids().to_vec();
        for id in ids {
            match self.scene.read_geom(id) {
                Some(geom) => {
                    self.edit.set_init_geom(id, geom);
                }
                None => log::warn!("Selected element {id} no longer in scene"),
            }
        }
    }

    /// Anchor a selection drag at `pos`, snapshotting geometry and bbox.
    pub fn drag_sel_start(&mut self, pos: Point) {
        let bbox = self
            .selection_bbox()
            .unwrap_or_else(|| Rect::from_points(pos, pos));
        self.edit.drag_sel_start(pos, bbox);
        self.refresh_init_geom();
        self.last_pos = pos;
    }

    /// Set every selected element to its snapshot with `delta` applied.
    pub fn apply_to_selected(&mut self, delta: &DeltaTransform) -> EditResult<()> {
        let view = self.view();
        for (id, state) in self.edit.selected_elements() {
            self.scene
                .apply_delta_transform(id, &state.init_geom, delta, view)?;
        }
        Ok(())
    }

    // --- Snapping ---

    /// Collect the window bbox anchors of every unselected element.
    pub fn gather_alignment_candidates(&mut self) {
        let view = self.view();
        self.edit.align.clear();
        for id in self.scene.element_ids() {
            if self.edit.is_selected(id) {
                continue;
            }
            if let Some(bbox) = self.scene.window_bbox(id, view) {
                self.edit.align.add_bbox(bbox);
            }
        }
        log::trace!("Gathered alignment candidates");
    }

    /// Snap the current drag bbox into the effective bbox and show the guide
    /// that matched, if any.
    pub fn snap_cur_bbox(&mut self, move_whole: bool) -> BBoxSnap {
        let grid = self.snap.grid(&self.camera);
        let snapped = self.snap.snap_bbox(
            self.edit.drag_sel_cur_bbox,
            self.edit.drag_sel_start_bbox,
            &self.edit.align,
            move_whole,
            grid,
        );
        self.edit.drag_sel_eff_bbox = snapped.effective;
        self.show_align_match(snapped.matched);
        snapped
    }

    /// Show a guide line for an alignment match, or hide all guides.
    pub fn show_align_match(&mut self, matched: Option<AlignMatch>) {
        self.handles.deactivate_all(HandleKind::AlignMatch);
        self.last_match = matched;
        let Some(m) = matched else {
            return;
        };
        let (start, length) = m.guide(self.edit.drag_sel_eff_bbox);
        let target = match m.anchor.axis() {
            Axis::X => Size::new(0.0, length),
            Axis::Y => Size::new(length, 0.0),
        };
        let id = HandleId::align_match(m.anchor);
        self.handles.request(id, target);
        self.handles.set_position(id, start);
    }

    // --- Handles ---

    /// Show the handles that belong to the current tool.
    pub fn update_handles(&mut self) -> EditResult<()> {
        if self.edit.tool.edits_nodes() {
            self.handles.deactivate_all(HandleKind::ReshapeBBox);
            self.handles.deactivate_all(HandleKind::SelBBox);
            self.update_node_handles()
        } else {
            self.update_sel_handles();
            Ok(())
        }
    }

    /// Rebuild the selection handles from the selection's bbox.
    pub fn update_sel_handles(&mut self) {
        self.handles.deactivate_all(HandleKind::SelBBox);
        let bbox = match self.selection_bbox() {
            Some(bbox) if self.edit.tool.shows_bbox_handles() => bbox,
            _ => {
                self.handles.deactivate_all(HandleKind::ReshapeBBox);
                return;
            }
        };
        self.set_sel_handles(bbox);

        if self.edit.selected_count() > 1 {
            let view = self.view();
            for (i, &id) in self.edit.selected_ids().iter().enumerate() {
                let Some(item) = self.scene.window_bbox(id, view) else {
                    continue;
                };
                for pos in BBoxPos::ALL.into_iter().filter(|p| p.is_corner()) {
                    let hid = HandleId::sel_bbox(i, pos);
                    self.handles.request(hid, item.size());
                    self.handles.set_position(hid, pos.point(item));
                }
            }
        }
    }

    /// Place the eight reshape handles around `bbox`.
    pub fn set_sel_handles(&mut self, bbox: Rect) {
        for pos in BBoxPos::ALL {
            let id = HandleId::reshape(pos);
            self.handles.request(id, bbox.size());
            self.handles.set_position(id, pos.point(bbox));
        }
    }

    /// Place the four rubber band edges along `band`.
    pub fn set_rubber_band(&mut self, band: Rect) {
        let edges = [
            (BBoxPos::UpC, Point::new(band.x0, band.y0), Size::new(band.width(), 0.0)),
            (BBoxPos::DnC, Point::new(band.x0, band.y1), Size::new(band.width(), 0.0)),
            (BBoxPos::LfM, Point::new(band.x0, band.y0), Size::new(0.0, band.height())),
            (BBoxPos::RtM, Point::new(band.x1, band.y0), Size::new(0.0, band.height())),
        ];
        for (pos, origin, target) in edges {
            let id = HandleId::rubber_band(pos);
            self.handles.request(id, target);
            self.handles.set_position(id, origin);
        }
    }
}

impl<S: Scene + std::fmt::Debug> std::fmt::Debug for Canvas<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("scene", &self.scene)
            .field("camera", &self.camera)
            .field("tool", &self.edit.tool)
            .field("action", &self.edit.action_name())
            .field("selected", &self.edit.selected_count())
            .finish()
    }
}
