//! Pointer events that drive the manipulation controllers.

use crate::handles::HandleId;
use crate::scene::ElementId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
        meta: false,
    };

    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// A primary-button pointer event in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Press { position: Point, modifiers: Modifiers },
    Drag { position: Point, modifiers: Modifiers },
    Release { position: Point, modifiers: Modifiers },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Press { position, .. }
            | PointerEvent::Drag { position, .. }
            | PointerEvent::Release { position, .. } => position,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match *self {
            PointerEvent::Press { modifiers, .. }
            | PointerEvent::Drag { modifiers, .. }
            | PointerEvent::Release { modifiers, .. } => modifiers,
        }
    }
}

/// What a pointer event was delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerTarget {
    /// An overlay handle.
    Handle(HandleId),
    /// The body of the current selection.
    Selection,
    /// An element, selected or not.
    Element(ElementId),
    /// Empty canvas.
    Background,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let ev = PointerEvent::Drag {
            position: Point::new(3.0, 4.0),
            modifiers: Modifiers::CTRL,
        };
        assert_eq!(ev.position(), Point::new(3.0, 4.0));
        assert!(ev.modifiers().ctrl);
        assert!(ev.modifiers().any());
        assert!(!Modifiers::NONE.any());
    }
}
