//! Snapping of bounding boxes and path nodes to alignment guides and the grid.
//!
//! All values are window (device) pixels. Tolerances scale with the grid
//! increment, so snapping feels the same at every zoom level.

use crate::camera::Camera;
use crate::geom::{AlignAnchor, Axis, clamp_min_size};
use crate::prefs::Preferences;
use kurbo::{Point, Rect, Vec2};

/// Angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;

/// Snap `value` to `candidate` when strictly closer than `tol * tol_basis`.
pub fn snap_to_point(value: f64, candidate: f64, tol_basis: f64, tol: f64) -> (f64, bool) {
    if (value - candidate).abs() < tol * tol_basis {
        (candidate, true)
    } else {
        (value, false)
    }
}

/// Snap `value` to the nearest `offset + k * increment` when strictly closer
/// than `tol * increment`.
pub fn snap_to_increment(value: f64, offset: f64, increment: f64, tol: f64) -> (f64, bool) {
    if increment <= 0.0 {
        return (value, false);
    }
    let nearest = ((value - offset) / increment).round() * increment + offset;
    if (value - nearest).abs() < tol * increment {
        (nearest, true)
    } else {
        (value, false)
    }
}

/// Snap an angle to the nearest increment.
/// Returns the snapped angle in degrees (0-360).
pub fn snap_angle(angle_degrees: f64, increment: f64) -> f64 {
    let snapped = (angle_degrees / increment).round() * increment;
    if snapped < 0.0 {
        snapped + 360.0
    } else if snapped >= 360.0 {
        snapped - 360.0
    } else {
        snapped
    }
}

/// Keep only the dominant axis of a drag from `start`. Returns the
/// constrained point and whether the horizontal axis was kept.
pub fn constrain_point(start: Point, point: Point) -> (Point, bool) {
    let d = point - start;
    if d.x.abs() >= d.y.abs() {
        (Point::new(point.x, start.y), true)
    } else {
        (Point::new(start.x, point.y), false)
    }
}

/// Grid spacing and origin in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub increment: f64,
    pub origin: Vec2,
}

impl Grid {
    fn origin_on(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.origin.x,
            Axis::Y => self.origin.y,
        }
    }
}

/// One alignment candidate: a coordinate and the box it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub value: f64,
    pub source: Rect,
}

/// Snap targets gathered once at the start of a manipulation.
#[derive(Debug, Clone, Default)]
pub struct AlignCandidates {
    anchors: [Vec<Candidate>; 6],
    nodes: Vec<Point>,
}

impl AlignCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every anchor value of a box.
    pub fn add_bbox(&mut self, bbox: Rect) {
        for anchor in AlignAnchor::ALL {
            self.anchors[anchor.ordinal()].push(Candidate {
                value: anchor.value(bbox),
                source: bbox,
            });
        }
    }

    pub fn add_node(&mut self, point: Point) {
        self.nodes.push(point);
    }

    pub fn get(&self, anchor: AlignAnchor) -> &[Candidate] {
        &self.anchors[anchor.ordinal()]
    }

    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.iter().all(Vec::is_empty) && self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.anchors.iter_mut().for_each(Vec::clear);
        self.nodes.clear();
    }

    /// Candidate values along one axis: anchors on that axis plus node
    /// coordinates.
    fn values_on(&self, axis: Axis) -> impl Iterator<Item = f64> + '_ {
        let anchors = AlignAnchor::ALL
            .into_iter()
            .filter(move |a| a.axis() == axis)
            .flat_map(|a| self.get(a).iter().map(|c| c.value));
        let nodes = self.nodes.iter().map(move |p| match axis {
            Axis::X => p.x,
            Axis::Y => p.y,
        });
        anchors.chain(nodes)
    }
}

/// An alignment snap that took place, for showing a guide line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignMatch {
    pub anchor: AlignAnchor,
    pub candidate: Candidate,
}

impl AlignMatch {
    /// Guide line from the snapped box to the box it aligned with, as
    /// `(start, length)` where the line runs along the other axis.
    pub fn guide(&self, effective: Rect) -> (Point, f64) {
        let span = effective.union(self.candidate.source);
        let v = self.candidate.value;
        match self.anchor.axis() {
            Axis::X => (Point::new(v, span.y0), span.height()),
            Axis::Y => (Point::new(span.x0, v), span.width()),
        }
    }
}

/// Result of snapping a dragged bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBoxSnap {
    /// The bbox to apply transforms from.
    pub effective: Rect,
    pub matched: Option<AlignMatch>,
    pub grid_snapped: bool,
}

/// Result of snapping a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    pub point: Point,
    pub snapped_x: bool,
    pub snapped_y: bool,
}

impl SnapResult {
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snapping driven by explicit preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapEngine {
    prefs: Preferences,
}

impl SnapEngine {
    pub fn new(prefs: Preferences) -> Self {
        Self { prefs }
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn set_prefs(&mut self, prefs: Preferences) {
        self.prefs = prefs;
    }

    /// Grid increment in window pixels for the given view.
    pub fn grid_dots(&self, camera: &Camera) -> f64 {
        camera.grid_dots(&self.prefs.size)
    }

    pub fn grid(&self, camera: &Camera) -> Grid {
        Grid {
            increment: self.grid_dots(camera),
            origin: camera.grid_origin(),
        }
    }

    /// Snap the dragged box `cur`.
    ///
    /// Guide snapping picks the single closest candidate across all anchors
    /// and moves the box (`move_whole`) or only the matching edge. When no
    /// guide snap happened, grid snapping moves the min corner (move) or the
    /// edges that differ from `start` (resize). Resizes are clamped to the
    /// minimum size afterwards.
    pub fn snap_bbox(
        &self,
        cur: Rect,
        start: Rect,
        candidates: &AlignCandidates,
        move_whole: bool,
        grid: Grid,
    ) -> BBoxSnap {
        let tol = self.prefs.snap_tolerance();
        let mut effective = cur;
        let mut matched = None;

        if self.prefs.snap_guide {
            let mut closest: Option<(f64, AlignAnchor, Candidate)> = None;
            for anchor in AlignAnchor::ALL {
                if !move_whole && !edge_moved(anchor, cur, start) {
                    continue;
                }
                let value = anchor.value(cur);
                for c in candidates.get(anchor) {
                    let dist = (c.value - value).abs();
                    if closest.is_none_or(|(best, _, _)| dist < best) {
                        closest = Some((dist, anchor, *c));
                    }
                }
            }
            if let Some((_, anchor, candidate)) = closest {
                let value = anchor.value(cur);
                let (snapped, did) = snap_to_point(value, candidate.value, grid.increment, tol);
                if did {
                    log::trace!("Snapped {} to guide at {}", anchor.name(), candidate.value);
                    effective = anchor.shift(effective, snapped - value, move_whole);
                    matched = Some(AlignMatch { anchor, candidate });
                }
            }
        }

        let mut grid_snapped = false;
        if matched.is_none() && self.prefs.snap_grid {
            if move_whole {
                let (x, sx) = snap_to_increment(cur.x0, grid.origin.x, grid.increment, tol);
                let (y, sy) = snap_to_increment(cur.y0, grid.origin.y, grid.increment, tol);
                effective = effective + Vec2::new(x - cur.x0, y - cur.y0);
                grid_snapped = sx || sy;
            } else {
                for anchor in [
                    AlignAnchor::Left,
                    AlignAnchor::Right,
                    AlignAnchor::Top,
                    AlignAnchor::Bottom,
                ] {
                    if !edge_moved(anchor, cur, start) {
                        continue;
                    }
                    let value = anchor.value(cur);
                    let off = grid.origin_on(anchor.axis());
                    let (snapped, did) = snap_to_increment(value, off, grid.increment, tol);
                    if did {
                        effective = anchor.shift(effective, snapped - value, false);
                        grid_snapped = true;
                    }
                }
            }
        }

        if !move_whole {
            effective = clamp_min_size(effective);
        }
        BBoxSnap {
            effective,
            matched,
            grid_snapped,
        }
    }

    /// Snap a dragged node position to candidate coordinates, falling back
    /// to the grid per axis.
    pub fn snap_node_point(&self, point: Point, candidates: &AlignCandidates, grid: Grid) -> SnapResult {
        let tol = self.prefs.snap_tolerance();
        let snap_axis = |axis: Axis, value: f64| -> (f64, bool) {
            let nearest = candidates
                .values_on(axis)
                .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()));
            if let Some(c) = nearest {
                let (v, did) = snap_to_point(value, c, grid.increment, tol);
                if did {
                    return (v, true);
                }
            }
            if self.prefs.snap_grid {
                return snap_to_increment(value, grid.origin_on(axis), grid.increment, tol);
            }
            (value, false)
        };
        let (x, snapped_x) = snap_axis(Axis::X, point.x);
        let (y, snapped_y) = snap_axis(Axis::Y, point.y);
        SnapResult {
            point: Point::new(x, y),
            snapped_x,
            snapped_y,
        }
    }
}

/// Whether the edge an anchor names differs between `cur` and `start`.
/// Center anchors never count as a moved edge.
fn edge_moved(anchor: AlignAnchor, cur: Rect, start: Rect) -> bool {
    match anchor {
        AlignAnchor::Left => cur.x0 != start.x0,
        AlignAnchor::Right => cur.x1 != start.x1,
        AlignAnchor::Top => cur.y0 != start.y0,
        AlignAnchor::Bottom => cur.y1 != start.y1,
        AlignAnchor::Center | AlignAnchor::Middle => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(guide: bool, grid: bool) -> SnapEngine {
        SnapEngine::new(Preferences {
            snap_guide: guide,
            snap_grid: grid,
            snap_tol: 1,
            ..Preferences::default()
        })
    }

    fn grid(increment: f64) -> Grid {
        Grid {
            increment,
            origin: Vec2::ZERO,
        }
    }

    #[test]
    fn test_snap_to_point_strict_boundary() {
        assert_eq!(snap_to_point(10.0, 12.0, 1.0, 3.0), (12.0, true));
        assert_eq!(snap_to_point(10.0, 13.0, 1.0, 3.0), (10.0, false));
        assert_eq!(snap_to_point(10.0, 7.0, 1.0, 3.0), (10.0, false));
        assert_eq!(snap_to_point(10.0, 7.5, 1.0, 3.0), (7.5, true));
        assert_eq!(snap_to_point(10.0, 30.0, 4.0, 5.0), (10.0, false));
    }

    #[test]
    fn test_snap_to_increment() {
        assert_eq!(snap_to_increment(23.0, 0.0, 10.0, 1.0), (20.0, true));
        assert_eq!(snap_to_increment(26.0, 2.0, 10.0, 1.0), (22.0, true));
        assert_eq!(snap_to_increment(24.0, 0.0, 10.0, 0.3), (24.0, false));
        assert_eq!(snap_to_increment(24.0, 0.0, 0.0, 1.0), (24.0, false));
    }

    #[test]
    fn test_snap_angle() {
        assert_eq!(snap_angle(7.0, ANGLE_SNAP_INCREMENT), 0.0);
        assert_eq!(snap_angle(8.0, ANGLE_SNAP_INCREMENT), 15.0);
        assert_eq!(snap_angle(-8.0, ANGLE_SNAP_INCREMENT), 345.0);
        assert_eq!(snap_angle(358.0, ANGLE_SNAP_INCREMENT), 0.0);
    }

    #[test]
    fn test_constrain_point() {
        let start = Point::new(10.0, 10.0);
        assert_eq!(constrain_point(start, Point::new(30.0, 15.0)), (Point::new(30.0, 10.0), true));
        assert_eq!(constrain_point(start, Point::new(12.0, -20.0)), (Point::new(10.0, -20.0), false));
    }

    #[test]
    fn test_candidates() {
        let mut c = AlignCandidates::new();
        assert!(c.is_empty());
        c.add_bbox(Rect::new(0.0, 10.0, 100.0, 50.0));
        assert_eq!(c.get(AlignAnchor::Center)[0].value, 50.0);
        assert_eq!(c.get(AlignAnchor::Middle)[0].value, 30.0);
        assert_eq!(c.get(AlignAnchor::Bottom)[0].value, 50.0);
        c.add_node(Point::new(7.0, 8.0));
        let xs: Vec<f64> = c.values_on(Axis::X).collect();
        assert_eq!(xs, vec![0.0, 50.0, 100.0, 7.0]);
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn test_snap_bbox_global_nearest() {
        let mut c = AlignCandidates::new();
        // Left edge 3 px away, top edge 1 px away: the top wins alone.
        c.add_bbox(Rect::new(203.0, 101.0, 250.0, 150.0));
        let cur = Rect::new(200.0, 100.0, 220.0, 120.0);
        let snap = engine(true, false).snap_bbox(cur, cur, &c, true, grid(10.0));
        assert_eq!(snap.effective, Rect::new(200.0, 101.0, 220.0, 121.0));
        let m = snap.matched.unwrap();
        assert_eq!(m.anchor, AlignAnchor::Top);
        assert_eq!(m.candidate.value, 101.0);
        assert!(!snap.grid_snapped);
    }

    #[test]
    fn test_snap_bbox_out_of_tolerance() {
        let mut c = AlignCandidates::new();
        c.add_bbox(Rect::new(500.0, 500.0, 600.0, 600.0));
        let cur = Rect::new(0.0, 0.0, 20.0, 20.0);
        let snap = engine(true, false).snap_bbox(cur, cur, &c, true, grid(10.0));
        assert_eq!(snap.effective, cur);
        assert!(snap.matched.is_none());
    }

    #[test]
    fn test_guide_snap_beats_grid() {
        let mut c = AlignCandidates::new();
        c.add_bbox(Rect::new(33.0, 300.0, 40.0, 310.0));
        let cur = Rect::new(31.0, 0.0, 51.0, 20.0);
        let snap = engine(true, true).snap_bbox(cur, cur, &c, true, grid(10.0));
        assert_eq!(snap.effective.x0, 33.0);
        assert_eq!(snap.effective.y0, 0.0);
        assert!(!snap.grid_snapped);
    }

    #[test]
    fn test_grid_snap_move_min_corner() {
        let cur = Rect::new(31.0, 44.0, 51.0, 74.0);
        let snap = engine(false, true).snap_bbox(cur, cur, &AlignCandidates::new(), true, grid(10.0));
        assert_eq!(snap.effective, Rect::new(30.0, 40.0, 50.0, 70.0));
        assert!(snap.grid_snapped);
    }

    #[test]
    fn test_grid_snap_resize_moved_edges_only() {
        let start = Rect::new(3.0, 3.0, 53.0, 53.0);
        let cur = Rect::new(3.0, 3.0, 68.0, 77.0);
        let snap = engine(false, true).snap_bbox(cur, start, &AlignCandidates::new(), false, grid(10.0));
        assert_eq!(snap.effective, Rect::new(3.0, 3.0, 70.0, 80.0));
    }

    #[test]
    fn test_resize_guide_snaps_only_moved_edge() {
        let mut c = AlignCandidates::new();
        c.add_bbox(Rect::new(1.0, 200.0, 112.0, 260.0));
        let start = Rect::new(0.0, 0.0, 100.0, 50.0);
        let cur = Rect::new(0.0, 0.0, 110.0, 60.0);
        // Left (1 px away) did not move, so the right edge (2 px) snaps.
        let snap = engine(true, false).snap_bbox(cur, start, &c, false, grid(10.0));
        assert_eq!(snap.effective, Rect::new(0.0, 0.0, 112.0, 60.0));
        assert_eq!(snap.matched.unwrap().anchor, AlignAnchor::Right);
    }

    #[test]
    fn test_no_snapping_passes_through() {
        let mut c = AlignCandidates::new();
        c.add_bbox(Rect::new(1.0, 1.0, 2.0, 2.0));
        let cur = Rect::new(0.5, 0.5, 10.5, 10.5);
        let snap = engine(false, false).snap_bbox(cur, cur, &c, true, grid(10.0));
        assert_eq!(snap.effective, cur);
    }

    #[test]
    fn test_align_match_guide() {
        let m = AlignMatch {
            anchor: AlignAnchor::Left,
            candidate: Candidate {
                value: 10.0,
                source: Rect::new(10.0, 100.0, 20.0, 120.0),
            },
        };
        let (start, len) = m.guide(Rect::new(10.0, 0.0, 30.0, 20.0));
        assert_eq!(start, Point::new(10.0, 0.0));
        assert_eq!(len, 120.0);
    }

    #[test]
    fn test_snap_node_point() {
        let mut c = AlignCandidates::new();
        c.add_node(Point::new(52.0, 500.0));
        let snap = engine(true, true).snap_node_point(Point::new(50.0, 33.0), &c, grid(10.0));
        assert_eq!(snap.point, Point::new(52.0, 30.0));
        assert!(snap.snapped_x && snap.snapped_y);

        let snap = engine(true, false).snap_node_point(Point::new(50.0, 33.0), &c, grid(10.0));
        assert_eq!(snap.point, Point::new(52.0, 33.0));
        assert!(!snap.snapped_y);
        assert!(snap.is_snapped());
    }
}
