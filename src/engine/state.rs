//! Portal state: the single mutable record shared by the activation engine
//! and the reconciliation loop. One instance per page session, owned by the
//! engine and passed explicitly — never a module-level singleton.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::normalize_root_path;

/// Opaque handle to a rendered sidebar item; the host maps it back to
/// whatever it renders with.
pub type ItemHandle = u64;

/// How an embedded page expresses sub-routes: extra path segments or a
/// `#/`-prefixed fragment. Learned per path; `Path` when unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    #[default]
    Path,
    Hash,
}

impl RouteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Path => "path",
            RouteMode::Hash => "hash",
        }
    }

    /// Manifest value parser: anything other than `"hash"` is `Path`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("hash") => RouteMode::Hash,
            _ => RouteMode::Path,
        }
    }
}

#[derive(Debug, Default)]
pub struct PortalState {
    /// Currently selected logical path; empty = nothing selected.
    pub active_path: String,
    /// Breadcrumb for the active item.
    pub active_title: String,
    pub active_route_suffix: String,
    pub route_mode_by_path: HashMap<String, RouteMode>,
    /// Guard against re-issuing the same suffix retry, `"{path}|{suffix}"`.
    pub route_retry_key: String,
    /// Set when the frame source was just programmatically changed and the
    /// frame has not yet confirmed it. Empty otherwise.
    pub pending_frame_path: String,
    pub pending_frame_set_at: u64,
    pub items_by_path: HashMap<String, ItemHandle>,
    /// Prefix under which all logical paths are served, `/` or `/<repo>/`.
    pub root_path: String,
}

impl PortalState {
    pub fn new(root_path: &str) -> Self {
        Self {
            root_path: normalize_root_path(root_path),
            ..Default::default()
        }
    }

    pub fn clear_pending(&mut self) {
        self.pending_frame_path.clear();
        self.pending_frame_set_at = 0;
    }

    /// True while a programmatic navigation for the active path is awaiting
    /// confirmation; suppresses drift detection against it.
    pub fn has_pending_for_active(&self) -> bool {
        !self.pending_frame_path.is_empty() && self.pending_frame_path == self.active_path
    }

    pub fn route_mode_for(&self, path: &str) -> RouteMode {
        self.route_mode_by_path.get(path).copied().unwrap_or_default()
    }
}
