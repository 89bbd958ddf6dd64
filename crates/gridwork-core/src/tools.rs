//! Editor tools relevant to manipulation.

use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    /// Select, move, resize and rotate elements.
    #[default]
    Select,
    /// Select elements inside a dragged rubber band.
    SelBox,
    /// Edit the nodes of the selected path.
    Node,
}

impl ToolKind {
    /// Whether the selection shows resize/rotate handles with this tool.
    pub fn shows_bbox_handles(self) -> bool {
        matches!(self, ToolKind::Select | ToolKind::SelBox)
    }

    pub fn edits_nodes(self) -> bool {
        self == ToolKind::Node
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::SelBox => "SelBox",
            ToolKind::Node => "Node",
        }
    }
}
