//! The scene collaborator: elements with geometry and transforms.
//!
//! The manipulation engine only talks to a scene through [`Scene`]. [`Drawing`]
//! is a flat in-memory scene with snapshot undo, enough for embedders without
//! a scene graph of their own and for tests.

use crate::error::{EditError, EditResult};
use crate::geom::{DeltaTransform, conjugate};
use crate::path::PathData;
use kurbo::{Affine, Rect, Shape as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for scene elements.
pub type ElementId = Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// What the manipulation engine needs from a scene.
///
/// `view` arguments are the camera transform from drawing space to window
/// space. Window bounding boxes and transform deltas are expressed in window
/// space.
pub trait Scene {
    /// Pre-manipulation geometry snapshot of one element.
    type Geom: Clone;

    /// All element ids, back to front.
    fn element_ids(&self) -> Vec<ElementId>;

    fn element_name(&self, id: ElementId) -> Option<String>;

    /// Axis-aligned bounds of the element in window space.
    fn window_bbox(&self, id: ElementId, view: Affine) -> Option<Rect>;

    fn read_geom(&self, id: ElementId) -> Option<Self::Geom>;

    fn write_geom(&mut self, id: ElementId, geom: &Self::Geom) -> EditResult<()>;

    /// Set the element's geometry to `init` with the window-space `delta`
    /// applied on top.
    fn apply_delta_transform(
        &mut self,
        id: ElementId,
        init: &Self::Geom,
        delta: &DeltaTransform,
        view: Affine,
    ) -> EditResult<()>;

    fn path(&self, id: ElementId) -> Option<&PathData>;

    fn path_mut(&mut self, id: ElementId) -> Option<&mut PathData>;

    /// Transform from the path's local coordinates to window space.
    fn path_to_window(&self, id: ElementId, view: Affine) -> Option<Affine>;

    /// Record the pre-action state under an undo entry labelled `(action, data)`.
    fn save_undo(&mut self, action: &str, data: &str);
}

/// Geometry payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Rect(Rect),
    Path(PathData),
}

/// A drawable element of a [`Drawing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub kind: ElementKind,
    /// Local-to-drawing transform.
    pub transform: Affine,
}

impl Element {
    pub fn rect(name: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: ElementKind::Rect(rect),
            transform: Affine::IDENTITY,
        }
    }

    pub fn path(name: impl Into<String>, path: PathData) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: ElementKind::Path(path),
            transform: Affine::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Bounds in the element's own coordinates.
    pub fn local_bounds(&self) -> Rect {
        match &self.kind {
            ElementKind::Rect(rect) => *rect,
            ElementKind::Path(path) => path.to_bez_path().bounding_box(),
        }
    }
}

/// A labelled pre-action snapshot.
#[derive(Debug, Clone)]
struct UndoEntry {
    action: String,
    data: String,
    elements: HashMap<ElementId, Element>,
    order: Vec<ElementId>,
}

/// Flat in-memory scene with snapshot undo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Drawing {
    elements: HashMap<ElementId, Element>,
    /// Back to front.
    order: Vec<ElementId>,
    #[serde(skip)]
    undo_stack: Vec<UndoEntry>,
    #[serde(skip)]
    redo_stack: Vec<UndoEntry>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element on top and return its id.
    pub fn add(&mut self, element: Element) -> ElementId {
        let id = element.id;
        self.order.push(id);
        self.elements.insert(id, element);
        id
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.order.retain(|&e| e != id);
        self.elements.remove(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Elements back to front.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Undo the last action, returning its label.
    pub fn undo(&mut self) -> Option<(String, String)> {
        let entry = self.undo_stack.pop()?;
        let label = (entry.action.clone(), entry.data.clone());
        let current = self.entry(&entry.action, &entry.data);
        self.redo_stack.push(current);
        self.elements = entry.elements;
        self.order = entry.order;
        Some(label)
    }

    /// Redo the last undone action, returning its label.
    pub fn redo(&mut self) -> Option<(String, String)> {
        let entry = self.redo_stack.pop()?;
        let label = (entry.action.clone(), entry.data.clone());
        let current = self.entry(&entry.action, &entry.data);
        self.undo_stack.push(current);
        self.elements = entry.elements;
        self.order = entry.order;
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Labels of the undo entries, oldest first.
    pub fn undo_log(&self) -> impl Iterator<Item = (&str, &str)> {
        self.undo_stack
            .iter()
            .map(|e| (e.action.as_str(), e.data.as_str()))
    }

    fn entry(&self, action: &str, data: &str) -> UndoEntry {
        UndoEntry {
            action: action.to_string(),
            data: data.to_string(),
            elements: self.elements.clone(),
            order: self.order.clone(),
        }
    }

    /// Serialize the drawing to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a drawing from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Scene for Drawing {
    type Geom = Affine;

    fn element_ids(&self) -> Vec<ElementId> {
        self.order.clone()
    }

    fn element_name(&self, id: ElementId) -> Option<String> {
        self.elements.get(&id).map(|e| e.name.clone())
    }

    fn window_bbox(&self, id: ElementId, view: Affine) -> Option<Rect> {
        let element = self.elements.get(&id)?;
        Some((view * element.transform).transform_rect_bbox(element.local_bounds()))
    }

    fn read_geom(&self, id: ElementId) -> Option<Affine> {
        self.elements.get(&id).map(|e| e.transform)
    }

    fn write_geom(&mut self, id: ElementId, geom: &Affine) -> EditResult<()> {
        let element = self
            .elements
            .get_mut(&id)
            .ok_or(EditError::UnknownElement(id))?;
        element.transform = *geom;
        Ok(())
    }

    fn apply_delta_transform(
        &mut self,
        id: ElementId,
        init: &Affine,
        delta: &DeltaTransform,
        view: Affine,
    ) -> EditResult<()> {
        let local = conjugate(delta.affine(), view);
        self.write_geom(id, &(local * *init))
    }

    fn path(&self, id: ElementId) -> Option<&PathData> {
        match &self.elements.get(&id)?.kind {
            ElementKind::Path(path) => Some(path),
            ElementKind::Rect(_) => None,
        }
    }

    fn path_mut(&mut self, id: ElementId) -> Option<&mut PathData> {
        match &mut self.elements.get_mut(&id)?.kind {
            ElementKind::Path(path) => Some(path),
            ElementKind::Rect(_) => None,
        }
    }

    fn path_to_window(&self, id: ElementId, view: Affine) -> Option<Affine> {
        let element = self.elements.get(&id)?;
        matches!(element.kind, ElementKind::Path(_)).then(|| view * element.transform)
    }

    fn save_undo(&mut self, action: &str, data: &str) {
        let entry = self.entry(action, data);
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }
}
