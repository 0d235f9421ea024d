//! Outputs of the reconciliation engine: commands for the host to apply to
//! the real browser surface. The engine never touches the DOM itself.

use super::state::ItemHandle;
use super::status::ViewerStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Navigate the frame. The engine emits this only when the target
    /// differs from the frame's current resolved source.
    SetFrameSource { url: String },
    /// History-replacing hash update; never pushes a new entry.
    ReplaceHash { hash: String },
    SetStatus { status: ViewerStatus },
    ClearStatus,
    Highlight { item: ItemHandle },
    Unhighlight { item: ItemHandle },
    SetTitle { title: String },
    /// "Open in new tab" link target.
    SetExternalLink { href: String },
}

impl Effect {
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::SetFrameSource { .. } => "set_frame_source",
            Effect::ReplaceHash { .. } => "replace_hash",
            Effect::SetStatus { .. } => "set_status",
            Effect::ClearStatus => "clear_status",
            Effect::Highlight { .. } => "highlight",
            Effect::Unhighlight { .. } => "unhighlight",
            Effect::SetTitle { .. } => "set_title",
            Effect::SetExternalLink { .. } => "set_external_link",
        }
    }
}
