//! Geometry helpers for manipulation: pivot-relative delta transforms,
//! bounding box anchors and handle positions.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest width or height a resized bounding box may have, in window pixels.
pub const MIN_BBOX_SIZE: f64 = 1.0;

/// Translation, scale and rotation about a pivot point.
///
/// Maps a point `x` to `pivot + R(rotation) * S(scale) * (x - pivot) + translation`.
/// Controllers always build one of these from the drag start, so it is applied
/// to pre-manipulation geometry rather than composed onto live geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaTransform {
    pub translation: Vec2,
    pub scale: Vec2,
    /// Rotation in radians.
    pub rotation: f64,
    pub pivot: Point,
}

impl Default for DeltaTransform {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            pivot: Point::ZERO,
        }
    }
}

impl DeltaTransform {
    pub fn new(translation: Vec2, scale: Vec2, rotation: f64, pivot: Point) -> Self {
        Self {
            translation,
            scale,
            rotation,
            pivot,
        }
    }

    /// Pure translation.
    pub fn translate(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    /// Pure rotation about `pivot`.
    pub fn rotate_about(rotation: f64, pivot: Point) -> Self {
        Self {
            rotation,
            pivot,
            ..Self::default()
        }
    }

    /// The equivalent affine matrix.
    pub fn affine(&self) -> Affine {
        delta_transform(self.translation, self.scale, self.rotation, self.pivot)
    }

    /// Apply to a single point.
    pub fn apply(&self, point: Point) -> Point {
        self.affine() * point
    }

    /// True when the transform leaves every point where it is.
    pub fn is_identity(&self) -> bool {
        self.translation.hypot2() < 1e-18
            && (self.scale.x - 1.0).abs() < 1e-12
            && (self.scale.y - 1.0).abs() < 1e-12
            && self.rotation.abs() < 1e-12
    }
}

/// Build the affine map `x -> p + R(r)·S(s)·(x − p) + t`.
pub fn delta_transform(translation: Vec2, scale: Vec2, rotation: f64, pivot: Point) -> Affine {
    Affine::translate(pivot.to_vec2() + translation)
        * Affine::rotate(rotation)
        * Affine::scale_non_uniform(scale.x, scale.y)
        * Affine::translate(-pivot.to_vec2())
}

/// Re-express a window-space affine in another coordinate space.
///
/// `to_window` maps the target space into window space. The result applies
/// `window_delta` as seen from the window, expressed in the target space.
pub fn conjugate(window_delta: Affine, to_window: Affine) -> Affine {
    to_window.inverse() * window_delta * to_window
}

/// Keep `min` at least [`MIN_BBOX_SIZE`] below `max` on each axis.
/// The max corner wins; the min corner is pulled back.
pub fn clamp_min_size(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.min(rect.x1 - MIN_BBOX_SIZE),
        rect.y0.min(rect.y1 - MIN_BBOX_SIZE),
        rect.x1,
        rect.y1,
    )
}

/// Width and height of a rect as a vector.
pub fn rect_size(rect: Rect) -> Vec2 {
    Vec2::new(rect.x1 - rect.x0, rect.y1 - rect.y0)
}

/// Whether `inner` lies entirely inside `outer`, edges included.
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Move a rect without resizing it.
pub fn translate_rect(rect: Rect, delta: Vec2) -> Rect {
    rect + delta
}

/// Which axis an anchor or value lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// The six logical alignment anchors of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlignAnchor {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

impl AlignAnchor {
    pub const ALL: [AlignAnchor; 6] = [
        AlignAnchor::Left,
        AlignAnchor::Center,
        AlignAnchor::Right,
        AlignAnchor::Top,
        AlignAnchor::Middle,
        AlignAnchor::Bottom,
    ];

    /// Position of this anchor in the array returned by [`AlignAnchor::ALL`].
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn axis(self) -> Axis {
        match self {
            AlignAnchor::Left | AlignAnchor::Center | AlignAnchor::Right => Axis::X,
            AlignAnchor::Top | AlignAnchor::Middle | AlignAnchor::Bottom => Axis::Y,
        }
    }

    /// Coordinate of this anchor on the given box.
    pub fn value(self, rect: Rect) -> f64 {
        match self {
            AlignAnchor::Left => rect.x0,
            AlignAnchor::Center => 0.5 * (rect.x0 + rect.x1),
            AlignAnchor::Right => rect.x1,
            AlignAnchor::Top => rect.y0,
            AlignAnchor::Middle => 0.5 * (rect.y0 + rect.y1),
            AlignAnchor::Bottom => rect.y1,
        }
    }

    /// Shift the box so this anchor moves by `delta`.
    ///
    /// With `move_whole` the box is translated along the anchor's axis.
    /// Otherwise only the edge the anchor names moves; center and middle
    /// anchors still move both edges of their axis.
    pub fn shift(self, rect: Rect, delta: f64, move_whole: bool) -> Rect {
        let mut r = rect;
        match (self, move_whole) {
            (_, true) => match self.axis() {
                Axis::X => {
                    r.x0 += delta;
                    r.x1 += delta;
                }
                Axis::Y => {
                    r.y0 += delta;
                    r.y1 += delta;
                }
            },
            (AlignAnchor::Left, false) => r.x0 += delta,
            (AlignAnchor::Right, false) => r.x1 += delta,
            (AlignAnchor::Top, false) => r.y0 += delta,
            (AlignAnchor::Bottom, false) => r.y1 += delta,
            (AlignAnchor::Center, false) => {
                r.x0 += delta;
                r.x1 += delta;
            }
            (AlignAnchor::Middle, false) => {
                r.y0 += delta;
                r.y1 += delta;
            }
        }
        r
    }

    pub fn name(self) -> &'static str {
        match self {
            AlignAnchor::Left => "left",
            AlignAnchor::Center => "center",
            AlignAnchor::Right => "right",
            AlignAnchor::Top => "top",
            AlignAnchor::Middle => "middle",
            AlignAnchor::Bottom => "bottom",
        }
    }
}

/// The eight compass positions of bounding box handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BBoxPos {
    UpL,
    UpC,
    UpR,
    DnL,
    DnC,
    DnR,
    LfM,
    RtM,
}

impl BBoxPos {
    pub const ALL: [BBoxPos; 8] = [
        BBoxPos::UpL,
        BBoxPos::UpC,
        BBoxPos::UpR,
        BBoxPos::DnL,
        BBoxPos::DnC,
        BBoxPos::DnR,
        BBoxPos::LfM,
        BBoxPos::RtM,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BBoxPos::UpL => "up-l",
            BBoxPos::UpC => "up-c",
            BBoxPos::UpR => "up-r",
            BBoxPos::DnL => "dn-l",
            BBoxPos::DnC => "dn-c",
            BBoxPos::DnR => "dn-r",
            BBoxPos::LfM => "lf-m",
            BBoxPos::RtM => "rt-m",
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(self, BBoxPos::UpL | BBoxPos::UpR | BBoxPos::DnL | BBoxPos::DnR)
    }

    /// Where this handle sits on the given box.
    pub fn point(self, rect: Rect) -> Point {
        let cx = 0.5 * (rect.x0 + rect.x1);
        let cy = 0.5 * (rect.y0 + rect.y1);
        match self {
            BBoxPos::UpL => Point::new(rect.x0, rect.y0),
            BBoxPos::UpC => Point::new(cx, rect.y0),
            BBoxPos::UpR => Point::new(rect.x1, rect.y0),
            BBoxPos::DnL => Point::new(rect.x0, rect.y1),
            BBoxPos::DnC => Point::new(cx, rect.y1),
            BBoxPos::DnR => Point::new(rect.x1, rect.y1),
            BBoxPos::LfM => Point::new(rect.x0, cy),
            BBoxPos::RtM => Point::new(rect.x1, cy),
        }
    }
}
