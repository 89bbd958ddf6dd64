//! Overlay handles (sprites) for direct manipulation.
//!
//! Handles are identified by a typed [`HandleId`] and owned by the
//! [`HandleRegistry`]. They are created on first request, repositioned by the
//! controllers, and deactivated rather than destroyed when not needed.

use crate::geom::{AlignAnchor, BBoxPos};
use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Base handle size in pixels at a device scale of 1.
const HANDLE_BASE_SIZE: f64 = 18.0;
/// Smallest handle size in pixels.
const HANDLE_MIN_SIZE: f64 = 4.0;
/// Base guide line thickness in pixels at a device scale of 1.
const LINE_BASE_SIZE: f64 = 8.0;
/// Smallest guide line thickness in pixels.
const LINE_MIN_SIZE: f64 = 3.0;
/// Scale applied to selection bbox handles relative to reshape handles.
const SEL_BBOX_SCALE: f64 = 0.8;

/// The kind of handle, which determines what manipulation it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Resize/rotate handles around the whole selection.
    ReshapeBBox,
    /// Per-element bbox markers when several elements are selected.
    SelBBox,
    /// A path node.
    NodePoint,
    /// A path control point.
    NodeCtrl,
    /// One edge of the box-select rubber band.
    RubberBand,
    /// Guide line showing an alignment snap.
    AlignMatch,
}

impl HandleKind {
    pub const ALL: [HandleKind; 6] = [
        HandleKind::ReshapeBBox,
        HandleKind::SelBBox,
        HandleKind::NodePoint,
        HandleKind::NodeCtrl,
        HandleKind::RubberBand,
        HandleKind::AlignMatch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HandleKind::ReshapeBBox => "reshape-bbox",
            HandleKind::SelBBox => "sel-bbox",
            HandleKind::NodePoint => "node-point",
            HandleKind::NodeCtrl => "node-ctrl",
            HandleKind::RubberBand => "rubber-band",
            HandleKind::AlignMatch => "align-match",
        }
    }

    /// Whether the index is part of the handle's identity.
    fn indexed(self) -> bool {
        !matches!(self, HandleKind::ReshapeBBox | HandleKind::RubberBand)
    }
}

/// Sub-identity of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleSub {
    None,
    Pos(BBoxPos),
    Anchor(AlignAnchor),
}

/// Identity of a handle: `(kind, sub, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId {
    pub kind: HandleKind,
    pub sub: HandleSub,
    pub index: usize,
}

impl HandleId {
    pub fn reshape(pos: BBoxPos) -> Self {
        Self {
            kind: HandleKind::ReshapeBBox,
            sub: HandleSub::Pos(pos),
            index: 0,
        }
    }

    pub fn sel_bbox(index: usize, pos: BBoxPos) -> Self {
        Self {
            kind: HandleKind::SelBBox,
            sub: HandleSub::Pos(pos),
            index,
        }
    }

    pub fn node_point(index: usize) -> Self {
        Self {
            kind: HandleKind::NodePoint,
            sub: HandleSub::None,
            index,
        }
    }

    pub fn node_ctrl(index: usize) -> Self {
        Self {
            kind: HandleKind::NodeCtrl,
            sub: HandleSub::None,
            index,
        }
    }

    /// Rubber band edges use the four edge positions.
    pub fn rubber_band(pos: BBoxPos) -> Self {
        Self {
            kind: HandleKind::RubberBand,
            sub: HandleSub::Pos(pos),
            index: 0,
        }
    }

    pub fn align_match(anchor: AlignAnchor) -> Self {
        Self {
            kind: HandleKind::AlignMatch,
            sub: HandleSub::Anchor(anchor),
            index: anchor.ordinal(),
        }
    }

    pub fn pos(self) -> Option<BBoxPos> {
        match self.sub {
            HandleSub::Pos(pos) => Some(pos),
            _ => None,
        }
    }

    pub fn anchor(self) -> Option<AlignAnchor> {
        match self.sub {
            HandleSub::Anchor(anchor) => Some(anchor),
            _ => None,
        }
    }
}

/// Stable name: `kind[-index][-pos]`, e.g. `sel-bbox-2-dn-r`.
impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        if self.kind.indexed() {
            write!(f, "-{}", self.index)?;
        }
        if let HandleSub::Pos(pos) = self.sub {
            write!(f, "-{}", pos.name())?;
        }
        Ok(())
    }
}

/// Visual shape of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandleShape {
    /// Two-tone square (bbox corners and edges, path nodes).
    #[default]
    Square,
    /// Two-tone diamond (path control points).
    Diamond,
    /// Dashed line (rubber band edges, alignment guides).
    DashedLine,
}

/// Rendered appearance of a handle.
#[derive(Debug, Clone, Copy)]
pub struct Appearance {
    pub shape: HandleShape,
    /// Marker size in window pixels.
    pub size: Size,
    /// Border width in pixels.
    pub border: f64,
    pub outer: Color,
    pub inner: Color,
}

/// Builds the appearance for a handle from its identity, the requested
/// target size and the device scale.
pub type AppearanceFn = fn(HandleId, Size, f64) -> Appearance;

/// Offset from the logical point to the marker origin.
pub type OffsetFn = fn(HandleId, &Appearance) -> Vec2;

/// Per-kind drawing and positioning rules.
#[derive(Debug, Clone, Copy)]
pub struct HandleStrategy {
    pub appearance: AppearanceFn,
    pub offset: OffsetFn,
}

impl HandleStrategy {
    /// Default rules for a kind.
    pub fn for_kind(kind: HandleKind) -> Self {
        match kind {
            HandleKind::ReshapeBBox | HandleKind::SelBBox | HandleKind::NodePoint => Self {
                appearance: square_appearance,
                offset: centered_offset,
            },
            HandleKind::NodeCtrl => Self {
                appearance: diamond_appearance,
                offset: centered_offset,
            },
            HandleKind::RubberBand => Self {
                appearance: line_appearance,
                offset: rubber_band_offset,
            },
            HandleKind::AlignMatch => Self {
                appearance: line_appearance,
                offset: align_match_offset,
            },
        }
    }
}

/// Square handle side for a display scale, floored at [`HANDLE_MIN_SIZE`].
pub fn handle_size(scale: f64, dpi_scale: f64) -> f64 {
    (scale * dpi_scale * HANDLE_BASE_SIZE).ceil().max(HANDLE_MIN_SIZE)
}

/// Guide line thickness, floored at [`LINE_MIN_SIZE`].
pub fn line_thickness(dpi_scale: f64) -> f64 {
    (dpi_scale * LINE_BASE_SIZE).ceil().max(LINE_MIN_SIZE)
}

fn two_tone(shape: HandleShape, side: f64) -> Appearance {
    Appearance {
        shape,
        size: Size::new(side, side),
        border: (side / 6.0).floor().max(2.0),
        outer: Color::from_rgba8(255, 255, 255, 255),
        inner: Color::from_rgba8(0, 0, 0, 255),
    }
}

fn square_appearance(id: HandleId, _target: Size, dpi_scale: f64) -> Appearance {
    let scale = if id.kind == HandleKind::SelBBox {
        SEL_BBOX_SCALE
    } else {
        1.0
    };
    two_tone(HandleShape::Square, handle_size(scale, dpi_scale))
}

fn diamond_appearance(_id: HandleId, _target: Size, dpi_scale: f64) -> Appearance {
    two_tone(HandleShape::Diamond, handle_size(1.0, dpi_scale))
}

/// Lines run along the longer side of the target and are one thickness wide.
fn line_appearance(id: HandleId, target: Size, dpi_scale: f64) -> Appearance {
    let thick = line_thickness(dpi_scale);
    let size = if target.width > target.height {
        Size::new(target.width, thick)
    } else {
        Size::new(thick, target.height)
    };
    let (outer, inner) = match id.kind {
        HandleKind::AlignMatch => (
            Color::from_rgba8(0, 200, 200, 255),
            Color::from_rgba8(0, 200, 200, 255),
        ),
        _ => (
            Color::from_rgba8(255, 255, 255, 255),
            Color::from_rgba8(0, 0, 0, 255),
        ),
    };
    Appearance {
        shape: HandleShape::DashedLine,
        size,
        border: (thick / 6.0).floor().max(1.0),
        outer,
        inner,
    }
}

fn centered_offset(_id: HandleId, appearance: &Appearance) -> Vec2 {
    Vec2::new(-0.5 * appearance.size.width, -0.5 * appearance.size.height)
}

/// Top and left edges sit just outside the band.
fn rubber_band_offset(id: HandleId, appearance: &Appearance) -> Vec2 {
    match id.pos() {
        Some(BBoxPos::UpC) => Vec2::new(0.0, -appearance.size.height),
        Some(BBoxPos::LfM) => Vec2::new(-appearance.size.width, 0.0),
        _ => Vec2::ZERO,
    }
}

fn align_match_offset(id: HandleId, appearance: &Appearance) -> Vec2 {
    let w = appearance.size.width;
    let h = appearance.size.height;
    match id.anchor() {
        Some(AlignAnchor::Left) => Vec2::new(-w, 0.0),
        Some(AlignAnchor::Center) => Vec2::new(-0.5 * w, 0.0),
        Some(AlignAnchor::Top) => Vec2::new(0.0, -h),
        Some(AlignAnchor::Middle) => Vec2::new(0.0, -0.5 * h),
        _ => Vec2::ZERO,
    }
}

/// A manipulation handle.
#[derive(Debug, Clone)]
pub struct Handle {
    pub id: HandleId,
    pub appearance: Appearance,
    /// Target size the appearance was built for.
    target: Size,
    /// Logical point the handle marks, in window coordinates.
    pub position: Point,
    /// Top-left corner of the rendered marker, in window coordinates.
    pub origin: Point,
    pub active: bool,
}

impl Handle {
    /// Window-space rectangle covered by the marker.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.appearance.size)
    }

    pub fn name(&self) -> String {
        self.id.to_string()
    }
}

/// Owns every handle, keyed by identity.
#[derive(Debug, Clone)]
pub struct HandleRegistry {
    handles: HashMap<HandleId, Handle>,
    strategies: HashMap<HandleKind, HandleStrategy>,
    dpi_scale: f64,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl HandleRegistry {
    /// Create a registry for a device pixel scale (1.0 at 96 dpi).
    pub fn new(dpi_scale: f64) -> Self {
        let strategies = HandleKind::ALL
            .iter()
            .map(|&kind| (kind, HandleStrategy::for_kind(kind)))
            .collect();
        Self {
            handles: HashMap::new(),
            strategies,
            dpi_scale,
        }
    }

    pub fn dpi_scale(&self) -> f64 {
        self.dpi_scale
    }

    /// Replace the drawing/positioning rules of a kind. Existing handles of
    /// that kind pick up the new appearance on their next request.
    pub fn set_strategy(&mut self, kind: HandleKind, strategy: HandleStrategy) {
        self.strategies.insert(kind, strategy);
        for handle in self.handles.values_mut().filter(|h| h.id.kind == kind) {
            handle.appearance = (strategy.appearance)(handle.id, handle.target, self.dpi_scale);
        }
    }

    fn strategy(&self, kind: HandleKind) -> HandleStrategy {
        self.strategies
            .get(&kind)
            .copied()
            .unwrap_or_else(|| HandleStrategy::for_kind(kind))
    }

    /// Look up a handle, creating it on first use, and mark it active.
    pub fn request(&mut self, id: HandleId, target: Size) -> &mut Handle {
        let strategy = self.strategy(id.kind);
        let dpi_scale = self.dpi_scale;
        let handle = self.handles.entry(id).or_insert_with(|| {
            log::trace!("Creating handle {id}");
            Handle {
                id,
                appearance: (strategy.appearance)(id, target, dpi_scale),
                target,
                position: Point::ZERO,
                origin: Point::ZERO,
                active: false,
            }
        });
        if handle.target != target {
            handle.target = target;
            handle.appearance = (strategy.appearance)(id, target, dpi_scale);
        }
        handle.active = true;
        handle
    }

    /// Place a handle so its marker is anchored on `point` per its kind's
    /// offset rule. Returns false for unknown handles.
    pub fn set_position(&mut self, id: HandleId, point: Point) -> bool {
        let strategy = self.strategy(id.kind);
        match self.handles.get_mut(&id) {
            Some(handle) => {
                handle.position = point;
                handle.origin = point + (strategy.offset)(id, &handle.appearance);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: HandleId) -> Option<&Handle> {
        self.handles.get(&id)
    }

    pub fn is_active(&self, id: HandleId) -> bool {
        self.handles.get(&id).is_some_and(|h| h.active)
    }

    pub fn deactivate(&mut self, id: HandleId) {
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.active = false;
        }
    }

    /// Hide every handle of a kind without destroying it.
    pub fn deactivate_all(&mut self, kind: HandleKind) {
        for handle in self.handles.values_mut().filter(|h| h.id.kind == kind) {
            handle.active = false;
        }
    }

    /// Deactivate handles of `kind` whose index is `from` or above.
    pub fn deactivate_from(&mut self, kind: HandleKind, from: usize) {
        for handle in self
            .handles
            .values_mut()
            .filter(|h| h.id.kind == kind && h.id.index >= from)
        {
            handle.active = false;
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &Handle> {
        self.handles.values().filter(|h| h.active)
    }

    pub fn active_count(&self, kind: HandleKind) -> usize {
        self.active().filter(|h| h.id.kind == kind).count()
    }

    /// Number of handles ever created, active or not.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The active, pointer-interactive handle under a window point. Guide
    /// lines are display-only and never hit.
    pub fn hit_test(&self, point: Point) -> Option<HandleId> {
        self.active()
            .filter(|h| h.appearance.shape != HandleShape::DashedLine)
            .filter(|h| h.rect().contains(point))
            .map(|h| h.id)
            // Node handles win over bbox handles they overlap.
            .max_by_key(|id| (id.kind == HandleKind::NodePoint, id.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_names() {
        assert_eq!(HandleId::reshape(BBoxPos::UpL).to_string(), "reshape-bbox-up-l");
        assert_eq!(HandleId::sel_bbox(2, BBoxPos::DnR).to_string(), "sel-bbox-2-dn-r");
        assert_eq!(HandleId::node_point(3).to_string(), "node-point-3");
        assert_eq!(HandleId::node_ctrl(0).to_string(), "node-ctrl-0");
        assert_eq!(HandleId::rubber_band(BBoxPos::LfM).to_string(), "rubber-band-lf-m");
        assert_eq!(
            HandleId::align_match(AlignAnchor::Center).to_string(),
            "align-match-1"
        );
    }

    #[test]
    fn test_handle_names_unique() {
        let mut ids = Vec::new();
        for pos in BBoxPos::ALL {
            ids.push(HandleId::reshape(pos));
            ids.push(HandleId::sel_bbox(0, pos));
            ids.push(HandleId::sel_bbox(1, pos));
        }
        for anchor in AlignAnchor::ALL {
            ids.push(HandleId::align_match(anchor));
        }
        for i in 0..4 {
            ids.push(HandleId::node_point(i));
            ids.push(HandleId::node_ctrl(i));
        }
        let names: std::collections::HashSet<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(names.len(), ids.len());
    }

    #[test]
    fn test_handle_sizes() {
        assert_eq!(handle_size(1.0, 1.0), 18.0);
        assert_eq!(handle_size(0.8, 1.0), 15.0);
        assert_eq!(handle_size(1.0, 0.1), 4.0);
        assert_eq!(line_thickness(1.0), 8.0);
        assert_eq!(line_thickness(0.1), 3.0);

        let mut reg = HandleRegistry::default();
        let h = reg.request(HandleId::reshape(BBoxPos::UpL), Size::ZERO);
        assert_eq!(h.appearance.size, Size::new(18.0, 18.0));
        assert_eq!(h.appearance.border, 3.0);
        let h = reg.request(HandleId::sel_bbox(0, BBoxPos::UpL), Size::ZERO);
        assert_eq!(h.appearance.size, Size::new(15.0, 15.0));
        assert_eq!(h.appearance.border, 2.0);
    }

    #[test]
    fn test_request_reuses_deactivated_handle() {
        let mut reg = HandleRegistry::default();
        let id = HandleId::node_point(0);
        reg.request(id, Size::ZERO);
        reg.set_position(id, Point::new(50.0, 50.0));
        reg.deactivate_all(HandleKind::NodePoint);
        assert!(!reg.is_active(id));
        assert_eq!(reg.active().count(), 0);

        let h = reg.request(id, Size::ZERO);
        assert!(h.active);
        // Same instance: position survived deactivation.
        assert_eq!(h.position, Point::new(50.0, 50.0));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_bbox_handle_centered_on_point() {
        let mut reg = HandleRegistry::default();
        let id = HandleId::reshape(BBoxPos::DnR);
        reg.request(id, Size::ZERO);
        assert!(reg.set_position(id, Point::new(100.0, 50.0)));
        let h = reg.get(id).unwrap();
        assert_eq!(h.origin, Point::new(91.0, 41.0));
        assert_eq!(h.rect().center(), Point::new(100.0, 50.0));
    }

    #[test]
    fn test_rubber_band_offsets() {
        let mut reg = HandleRegistry::default();
        let top = HandleId::rubber_band(BBoxPos::UpC);
        let left = HandleId::rubber_band(BBoxPos::LfM);
        let bottom = HandleId::rubber_band(BBoxPos::DnC);
        reg.request(top, Size::new(100.0, 0.0));
        reg.request(left, Size::new(0.0, 60.0));
        reg.request(bottom, Size::new(100.0, 0.0));
        reg.set_position(top, Point::new(10.0, 10.0));
        reg.set_position(left, Point::new(10.0, 10.0));
        reg.set_position(bottom, Point::new(10.0, 70.0));
        assert_eq!(reg.get(top).unwrap().origin, Point::new(10.0, 2.0));
        assert_eq!(reg.get(left).unwrap().origin, Point::new(2.0, 10.0));
        assert_eq!(reg.get(bottom).unwrap().origin, Point::new(10.0, 70.0));
        assert_eq!(reg.get(top).unwrap().appearance.size, Size::new(100.0, 8.0));
        assert_eq!(reg.get(left).unwrap().appearance.size, Size::new(8.0, 60.0));
    }

    #[test]
    fn test_align_match_offsets() {
        let mut reg = HandleRegistry::default();
        let center = HandleId::align_match(AlignAnchor::Center);
        let middle = HandleId::align_match(AlignAnchor::Middle);
        let right = HandleId::align_match(AlignAnchor::Right);
        reg.request(center, Size::new(0.0, 40.0));
        reg.request(middle, Size::new(40.0, 0.0));
        reg.request(right, Size::new(0.0, 40.0));
        reg.set_position(center, Point::new(50.0, 0.0));
        reg.set_position(middle, Point::new(0.0, 50.0));
        reg.set_position(right, Point::new(50.0, 0.0));
        assert_eq!(reg.get(center).unwrap().origin, Point::new(46.0, 0.0));
        assert_eq!(reg.get(middle).unwrap().origin, Point::new(0.0, 46.0));
        assert_eq!(reg.get(right).unwrap().origin, Point::new(50.0, 0.0));
        let rgba = reg.get(center).unwrap().appearance.outer.to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b), (0, 200, 200));
    }

    #[test]
    fn test_request_rebuilds_on_new_target() {
        let mut reg = HandleRegistry::default();
        let id = HandleId::rubber_band(BBoxPos::UpC);
        reg.request(id, Size::new(50.0, 0.0));
        let h = reg.request(id, Size::new(80.0, 0.0));
        assert_eq!(h.appearance.size.width, 80.0);
    }

    #[test]
    fn test_set_strategy() {
        fn big(_id: HandleId, _t: Size, _dpi: f64) -> Appearance {
            let mut a = two_tone(HandleShape::Square, 40.0);
            a.border = 1.0;
            a
        }
        let mut reg = HandleRegistry::default();
        let id = HandleId::node_point(0);
        reg.request(id, Size::ZERO);
        reg.set_strategy(
            HandleKind::NodePoint,
            HandleStrategy {
                appearance: big,
                offset: centered_offset,
            },
        );
        reg.set_position(id, Point::new(100.0, 100.0));
        assert_eq!(reg.get(id).unwrap().origin, Point::new(80.0, 80.0));
    }

    #[test]
    fn test_set_position_unknown() {
        let mut reg = HandleRegistry::default();
        assert!(!reg.set_position(HandleId::node_point(9), Point::ZERO));
    }

    #[test]
    fn test_hit_test() {
        let mut reg = HandleRegistry::default();
        let corner = HandleId::reshape(BBoxPos::UpL);
        reg.request(corner, Size::ZERO);
        reg.set_position(corner, Point::new(0.0, 0.0));
        let guide = HandleId::align_match(AlignAnchor::Left);
        reg.request(guide, Size::new(0.0, 100.0));
        reg.set_position(guide, Point::new(5.0, 0.0));

        assert_eq!(reg.hit_test(Point::new(3.0, 3.0)), Some(corner));
        assert_eq!(reg.hit_test(Point::new(30.0, 30.0)), None);

        let node = HandleId::node_point(2);
        reg.request(node, Size::ZERO);
        reg.set_position(node, Point::new(2.0, 2.0));
        assert_eq!(reg.hit_test(Point::new(3.0, 3.0)), Some(node));

        reg.deactivate(node);
        assert_eq!(reg.hit_test(Point::new(3.0, 3.0)), Some(corner));
    }
}
