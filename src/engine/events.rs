//! Inputs to the reconciliation engine.
//!
//! Every observation arrives with a [`FrameSnapshot`] of the browser world
//! at that instant, so the reducer itself stays pure and deterministic:
//! feeding the same snapshot twice produces the same effects.

use url::Url;

use super::state::RouteMode;

/// Result of attempting to read the embedded frame's own location.
///
/// Reading is a capability check, not exception-based control flow: a frame
/// that navigated cross-origin is a normal, expected branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLocation {
    Readable { pathname: String, hash: String },
    CrossOrigin,
    Detached,
}

/// The browser world as observed at one instant.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// The frame's current navigable source, resolved to an absolute URL.
    /// `None` when no source has been set.
    pub frame_src: Option<Url>,
    pub location: FrameLocation,
    /// Outer page hash, `"#..."` or empty.
    pub outer_hash: String,
    /// Document URL; relative frame sources resolve against it.
    pub base_url: Url,
    /// Wall-clock milliseconds, for pending-marker bookkeeping.
    pub now_ms: u64,
}

/// The one external input type folded through the reconciliation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The frame finished loading a document.
    FrameLoaded,
    /// The frame failed to load (network error, embedding refused).
    FrameFailed,
    /// The outer page hash changed.
    HashChanged,
    /// Recurring drift-check tick; catches in-frame history navigations
    /// that never fire the outer load event.
    Tick,
}

impl Observation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Observation::FrameLoaded => "frame_loaded",
            Observation::FrameFailed => "frame_failed",
            Observation::HashChanged => "hash_changed",
            Observation::Tick => "tick",
        }
    }
}

/// A request to make a path the active selection.
#[derive(Debug, Clone)]
pub struct ActivationRequest<'a> {
    pub path: &'a str,
    pub title: &'a str,
    pub route_suffix: &'a str,
    /// Forces a routing convention instead of the learned one; used by the
    /// catalog (declared mode) and the suffix retry (forced `Hash`).
    pub route_mode_override: Option<RouteMode>,
}

impl<'a> ActivationRequest<'a> {
    pub fn new(path: &'a str, title: &'a str) -> Self {
        Self {
            path,
            title,
            route_suffix: "",
            route_mode_override: None,
        }
    }

    pub fn with_suffix(mut self, suffix: &'a str) -> Self {
        self.route_suffix = suffix;
        self
    }

    pub fn with_mode(mut self, mode: RouteMode) -> Self {
        self.route_mode_override = Some(mode);
        self
    }
}
