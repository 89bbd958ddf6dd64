//! Path data and the path node model used by the node editing tool.
//!
//! A path is stored the way SVG encodes it: a list of commands, each owning a
//! run of numbers in one flat operand array. Relative commands store offsets
//! from the previous point, so editing one point has knock-on effects that
//! [`set_one_point`] compensates for.

use crate::error::{EditError, EditResult};
use crate::geom::conjugate;
use kurbo::{Affine, BezPath, Point, SvgArc, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path command kinds. Lower-case variants are relative.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathCmd {
    M,
    m,
    L,
    l,
    H,
    h,
    V,
    v,
    C,
    c,
    S,
    s,
    Q,
    q,
    T,
    t,
    A,
    a,
    Z,
    z,
}

impl PathCmd {
    pub fn is_relative(self) -> bool {
        matches!(
            self,
            PathCmd::m
                | PathCmd::l
                | PathCmd::h
                | PathCmd::v
                | PathCmd::c
                | PathCmd::s
                | PathCmd::q
                | PathCmd::t
                | PathCmd::a
                | PathCmd::z
        )
    }

    pub fn is_move(self) -> bool {
        matches!(self, PathCmd::M | PathCmd::m)
    }

    pub fn is_close(self) -> bool {
        matches!(self, PathCmd::Z | PathCmd::z)
    }

    /// The absolute form of this command.
    pub fn to_absolute(self) -> PathCmd {
        match self {
            PathCmd::m => PathCmd::M,
            PathCmd::l => PathCmd::L,
            PathCmd::h => PathCmd::H,
            PathCmd::v => PathCmd::V,
            PathCmd::c => PathCmd::C,
            PathCmd::s => PathCmd::S,
            PathCmd::q => PathCmd::Q,
            PathCmd::t => PathCmd::T,
            PathCmd::a => PathCmd::A,
            PathCmd::z => PathCmd::Z,
            other => other,
        }
    }

    /// Numbers consumed by one repetition of the command.
    pub fn operand_count(self) -> usize {
        match self.to_absolute() {
            PathCmd::M | PathCmd::L | PathCmd::T => 2,
            PathCmd::H | PathCmd::V => 1,
            PathCmd::C => 6,
            PathCmd::S | PathCmd::Q => 4,
            PathCmd::A => 7,
            _ => 0,
        }
    }

    /// Offset of the end point inside one repetition.
    fn point_offset(self) -> usize {
        match self.to_absolute() {
            PathCmd::C => 4,
            PathCmd::S | PathCmd::Q => 2,
            PathCmd::A => 5,
            _ => 0,
        }
    }

    /// Offsets of explicit control point pairs inside one repetition.
    fn ctrl_offsets(self) -> &'static [usize] {
        match self.to_absolute() {
            PathCmd::C => &[0, 2],
            PathCmd::S | PathCmd::Q => &[0],
            _ => &[],
        }
    }

    pub fn letter(self) -> char {
        match self {
            PathCmd::M => 'M',
            PathCmd::m => 'm',
            PathCmd::L => 'L',
            PathCmd::l => 'l',
            PathCmd::H => 'H',
            PathCmd::h => 'h',
            PathCmd::V => 'V',
            PathCmd::v => 'v',
            PathCmd::C => 'C',
            PathCmd::c => 'c',
            PathCmd::S => 'S',
            PathCmd::s => 's',
            PathCmd::Q => 'Q',
            PathCmd::q => 'q',
            PathCmd::T => 'T',
            PathCmd::t => 't',
            PathCmd::A => 'A',
            PathCmd::a => 'a',
            PathCmd::Z => 'Z',
            PathCmd::z => 'z',
        }
    }
}

/// One command and the run of operands it owns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathCommand {
    pub cmd: PathCmd,
    /// Index of the first operand in [`PathData::operands`].
    pub start: usize,
    /// Number of operands, a multiple of [`PathCmd::operand_count`].
    pub len: usize,
}

/// Path geometry as an ordered command stream over a flat operand array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    pub commands: Vec<PathCommand>,
    pub operands: Vec<f64>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command with its operands. Extra operands beyond a whole
    /// number of repetitions are dropped.
    pub fn push(&mut self, cmd: PathCmd, operands: &[f64]) -> &mut Self {
        let n = cmd.operand_count();
        let len = if n == 0 { 0 } else { operands.len() / n * n };
        self.commands.push(PathCommand {
            cmd,
            start: self.operands.len(),
            len,
        });
        self.operands.extend_from_slice(&operands[..len]);
        self
    }

    /// Builder form of [`PathData::push`].
    pub fn with(mut self, cmd: PathCmd, operands: &[f64]) -> Self {
        self.push(cmd, operands);
        self
    }

    pub fn move_to(self, p: Point) -> Self {
        self.with(PathCmd::M, &[p.x, p.y])
    }

    pub fn rel_move_to(self, v: Vec2) -> Self {
        self.with(PathCmd::m, &[v.x, v.y])
    }

    pub fn line_to(self, p: Point) -> Self {
        self.with(PathCmd::L, &[p.x, p.y])
    }

    pub fn rel_line_to(self, v: Vec2) -> Self {
        self.with(PathCmd::l, &[v.x, v.y])
    }

    pub fn curve_to(self, c1: Point, c2: Point, p: Point) -> Self {
        self.with(PathCmd::C, &[c1.x, c1.y, c2.x, c2.y, p.x, p.y])
    }

    pub fn rel_curve_to(self, c1: Vec2, c2: Vec2, v: Vec2) -> Self {
        self.with(PathCmd::c, &[c1.x, c1.y, c2.x, c2.y, v.x, v.y])
    }

    pub fn close(self) -> Self {
        self.with(PathCmd::Z, &[])
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn operand(&self, index: usize) -> Option<f64> {
        self.operands.get(index).copied()
    }

    pub fn set_operand(&mut self, index: usize, value: f64) -> EditResult<()> {
        let len = self.operands.len();
        let slot = self
            .operands
            .get_mut(index)
            .ok_or(EditError::OperandOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Walk every addressable point in traversal order.
    fn visit_points(&self, mut f: impl FnMut(PointVisit)) {
        let mut cur = Point::ZERO;
        let mut subpath_start = Point::ZERO;
        let mut prev_cmd: Option<PathCmd> = None;
        for (cmd_index, command) in self.commands.iter().enumerate() {
            let cmd = command.cmd;
            if cmd.is_close() {
                cur = subpath_start;
                prev_cmd = Some(cmd);
                continue;
            }
            let n = cmd.operand_count();
            let rel = cmd.is_relative();
            for rep in 0..command.len / n {
                let base = command.start + rep * n;
                let op = |i: usize| self.operands.get(base + i).copied().unwrap_or_default();
                let origin = if rel { cur.to_vec2() } else { Vec2::ZERO };

                let ctrls = cmd
                    .ctrl_offsets()
                    .iter()
                    .map(|&off| (base + off, Point::new(op(off), op(off + 1)) + origin))
                    .collect::<Vec<_>>();

                let index = base + cmd.point_offset();
                let abs = match cmd {
                    PathCmd::H => Point::new(op(0), cur.y),
                    PathCmd::h => Point::new(cur.x + op(0), cur.y),
                    PathCmd::V => Point::new(cur.x, op(0)),
                    PathCmd::v => Point::new(cur.x, cur.y + op(0)),
                    _ => {
                        let off = cmd.point_offset();
                        Point::new(op(off), op(off + 1)) + origin
                    }
                };

                f(PointVisit {
                    cmd,
                    prev_cmd,
                    cmd_index,
                    index,
                    pt_index: rep,
                    prev_abs: cur,
                    abs,
                    ctrls,
                });

                if cmd.is_move() && rep == 0 {
                    subpath_start = abs;
                }
                cur = abs;
                prev_cmd = Some(cmd);
            }
        }
    }

    /// Absolute kurbo path, for bounds and rendering.
    pub fn to_bez_path(&self) -> BezPath {
        let mut visits = Vec::new();
        self.visit_points(|pv| visits.push(pv));
        let mut visits = visits.into_iter().peekable();

        let mut bez = BezPath::new();
        let mut open = false;
        let mut last_cubic_ctrl: Option<Point> = None;
        let mut last_quad_ctrl: Option<Point> = None;
        for (cmd_index, command) in self.commands.iter().enumerate() {
            if command.cmd.is_close() {
                if open {
                    bez.close_path();
                }
                open = false;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
                continue;
            }
            while let Some(pv) = visits.next_if(|pv| pv.cmd_index == cmd_index) {
                let from = pv.prev_abs;
                let kind = pv.cmd.to_absolute();
                if kind == PathCmd::M && pv.pt_index == 0 {
                    bez.move_to(pv.abs);
                    open = true;
                    last_cubic_ctrl = None;
                    last_quad_ctrl = None;
                    continue;
                }
                if !open {
                    bez.move_to(from);
                    open = true;
                }
                match kind {
                    PathCmd::C | PathCmd::S => {
                        let (c1, c2) = if kind == PathCmd::C {
                            (pv.ctrls[0].1, pv.ctrls[1].1)
                        } else {
                            let reflected = last_cubic_ctrl.map_or(from, |c| from + (from - c));
                            (reflected, pv.ctrls[0].1)
                        };
                        bez.curve_to(c1, c2, pv.abs);
                        last_cubic_ctrl = Some(c2);
                        last_quad_ctrl = None;
                    }
                    PathCmd::Q | PathCmd::T => {
                        let c = if kind == PathCmd::Q {
                            pv.ctrls[0].1
                        } else {
                            last_quad_ctrl.map_or(from, |c| from + (from - c))
                        };
                        bez.quad_to(c, pv.abs);
                        last_quad_ctrl = Some(c);
                        last_cubic_ctrl = None;
                    }
                    PathCmd::A => {
                        let base = pv.index - 5;
                        let op = |i: usize| self.operand(base + i).unwrap_or_default();
                        let arc = SvgArc {
                            from,
                            to: pv.abs,
                            radii: Vec2::new(op(0), op(1)),
                            x_rotation: op(2).to_radians(),
                            large_arc: op(3) != 0.0,
                            sweep: op(4) != 0.0,
                        };
                        match kurbo::Arc::from_svg_arc(&arc) {
                            Some(arc) => arc.to_cubic_beziers(0.1, |p1, p2, p| {
                                bez.curve_to(p1, p2, p);
                            }),
                            None => bez.line_to(pv.abs),
                        }
                        last_cubic_ctrl = None;
                        last_quad_ctrl = None;
                    }
                    _ => {
                        bez.line_to(pv.abs);
                        last_cubic_ctrl = None;
                        last_quad_ctrl = None;
                    }
                }
            }
        }
        bez
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", command.cmd.letter())?;
            for v in &self.operands[command.start..command.start + command.len] {
                write!(f, " {v}")?;
            }
        }
        Ok(())
    }
}

/// Raw point information produced while walking a path.
struct PointVisit {
    cmd: PathCmd,
    prev_cmd: Option<PathCmd>,
    cmd_index: usize,
    index: usize,
    pt_index: usize,
    prev_abs: Point,
    abs: Point,
    /// Operand index and absolute local position of each explicit control point.
    ctrls: Vec<(usize, Point)>,
}

/// One addressable point of a path being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    /// Command that owns this point.
    pub cmd: PathCmd,
    /// Command processed just before this point, close commands included.
    pub prev_cmd: Option<PathCmd>,
    /// Position of the owning command in [`PathData::commands`].
    pub cmd_index: usize,
    /// Operand index of the point's X (the only coordinate for H and V).
    pub index: usize,
    /// Logical point index within the command (repetitions count up).
    pub pt_index: usize,
    /// Absolute local coordinate of the previous current point.
    pub prev_abs: Point,
    /// Absolute local coordinate of this point.
    pub abs: Point,
    /// This point in window coordinates.
    pub win_pt: Point,
    /// Explicit control points of the segment ending here, absolute local.
    pub ctrls: Vec<Point>,
    /// The same control points in window coordinates.
    pub win_ctrls: Vec<Point>,
    /// Operand indices of the control points' X values.
    pub ctrl_indices: Vec<usize>,
}

impl PathNode {
    /// Whether the stored operands are offsets from [`PathNode::prev_abs`].
    /// The first point of a path is always absolute.
    pub fn stores_relative(&self) -> bool {
        self.index != 0 && self.cmd.is_relative()
    }
}

/// Decompose a path into its node list and the indices of the commands that
/// start each run of nodes.
///
/// `to_window` maps the path's local coordinates into window coordinates (the
/// path's full transform stack followed by the view transform).
pub fn decompose(path: &PathData, to_window: Affine) -> (Vec<PathNode>, Vec<usize>) {
    let mut nodes = Vec::new();
    let mut cmd_starts = Vec::new();
    path.visit_points(|pv| {
        if pv.pt_index == 0 {
            cmd_starts.push(pv.cmd_index);
        }
        nodes.push(PathNode {
            cmd: pv.cmd,
            prev_cmd: pv.prev_cmd,
            cmd_index: pv.cmd_index,
            index: pv.index,
            pt_index: pv.pt_index,
            prev_abs: pv.prev_abs,
            abs: pv.abs,
            win_pt: to_window * pv.abs,
            ctrls: pv.ctrls.iter().map(|(_, p)| *p).collect(),
            win_ctrls: pv.ctrls.iter().map(|(_, p)| to_window * *p).collect(),
            ctrl_indices: pv.ctrls.iter().map(|(i, _)| *i).collect(),
        });
    });
    (nodes, cmd_starts)
}

/// Store a new absolute (local) position for `node`.
///
/// Absolute commands and the first point store the value directly; relative
/// commands store the offset from the node's previous point. Horizontal and
/// vertical commands store only their one coordinate. The command kind never
/// changes.
pub fn set_point(path: &mut PathData, node: &PathNode, point: Point) -> EditResult<()> {
    write_point(path, node, point, node.prev_abs).map(|_| ())
}

/// Write `point` for `node` as if its previous point were `prev`, returning
/// the absolute position the node resolves to afterwards.
fn write_point(path: &mut PathData, node: &PathNode, point: Point, prev: Point) -> EditResult<Point> {
    let base = if node.stores_relative() {
        prev.to_vec2()
    } else {
        Vec2::ZERO
    };
    let local = point - base;
    match node.cmd.to_absolute() {
        PathCmd::H => {
            path.set_operand(node.index, local.x)?;
            Ok(Point::new(point.x, prev.y))
        }
        PathCmd::V => {
            path.set_operand(node.index, local.y)?;
            Ok(Point::new(prev.x, point.y))
        }
        _ => {
            let len = path.operands.len();
            if node.index + 1 >= len {
                return Err(EditError::OperandOutOfRange {
                    index: node.index + 1,
                    len,
                });
            }
            path.set_operand(node.index, local.x)?;
            path.set_operand(node.index + 1, local.y)?;
            Ok(point)
        }
    }
}

/// Rewrite a relative `node` (and its control points) against a new `base`
/// so that it keeps its resolved position.
fn rebase(path: &mut PathData, node: &PathNode, base: Point) -> EditResult<Point> {
    for (&ci, ctrl) in node.ctrl_indices.iter().zip(&node.ctrls) {
        path.set_operand(ci, ctrl.x - base.x)?;
        path.set_operand(ci + 1, ctrl.y - base.y)?;
    }
    write_point(path, node, node.abs, base)
}

/// Move node `index` by the window-space `delta`, leaving every other point
/// where it is drawn.
///
/// Relative points that follow the moved one would shift with it, so each is
/// rewritten against the new previous point to keep its resolved position.
/// The walk stops at the first absolute command, move command, or point that
/// follows a close. A relative move at the stop is still rebased onto the
/// moved point. So is a relative point after a close when the moved node
/// started that subpath. Absolute points keep their operands.
///
/// Everything is computed from `nodes`, so during a drag the caller can keep
/// the decomposition taken at press time and pass the total delta each time.
pub fn set_one_point(
    path: &mut PathData,
    nodes: &[PathNode],
    index: usize,
    delta: Vec2,
    to_window: Affine,
) -> EditResult<()> {
    let node = nodes.get(index).ok_or(EditError::NodeOutOfRange {
        index,
        len: nodes.len(),
    })?;
    let local = conjugate(Affine::translate(delta), to_window);
    let target = local * node.abs;

    let moved = write_point(path, node, target, node.prev_abs)?;
    let starts_subpath = index == 0 || (node.cmd.is_move() && node.pt_index == 0);

    let mut prev = moved;
    let mut compensating = true;
    for next in &nodes[index + 1..] {
        if next.prev_cmd.is_some_and(PathCmd::is_close) {
            // Resolves from the subpath start.
            if starts_subpath && next.stores_relative() {
                rebase(path, next, moved)?;
            }
            break;
        }
        if next.cmd.is_move() && next.pt_index == 0 {
            if compensating && next.stores_relative() {
                rebase(path, next, prev)?;
            }
            break;
        }
        if !compensating {
            continue;
        }
        if !next.stores_relative() {
            // Only the close of a moved subpath start can still depend on it.
            if !starts_subpath {
                break;
            }
            compensating = false;
            continue;
        }
        // H and V cannot absorb a shift on their other axis, so the point
        // they resolve to becomes the base for the next one.
        prev = rebase(path, next, prev)?;
    }
    Ok(())
}
