//! Route-synchronization engine: (state, observation, snapshot) -> effects.
//!
//! Three sources of navigational truth drift independently: the outer page
//! hash, the embedded frame's own location, and the in-memory active
//! selection. The engine folds every input through one reconciliation
//! routine and decides which side wins, without ever looping: a pending
//! navigation marker suppresses drift detection against a just-issued
//! programmatic navigation, and all hash updates are history-replacing.

use url::Url;

use crate::catalog::{build_title_from_path, filter_member_tree, first_project, MemberNode};
use crate::routing::{
    build_frame_source, build_preview_url, encode_hash_path, from_safe_path,
    normalize_route_suffix, relative_path_from_pathname, resolve_hash_selection, HashSelection,
};

use super::effects::Effect;
use super::events::{ActivationRequest, FrameLocation, FrameSnapshot, Observation};
use super::state::{ItemHandle, PortalState, RouteMode};
use super::status::ViewerStatus;

/// Pending frame navigations older than this are treated as abandoned.
pub const PENDING_TIMEOUT_MS: u64 = 15_000;

/// What the frame's location means relative to the active path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteInfo {
    suffix: String,
    mode: RouteMode,
    matched: bool,
}

/// Rolling view of the outer hash and frame source as effects are emitted
/// within one observation, so a sync followed by an activation in the same
/// batch compares against what the host will have applied, not the stale
/// snapshot.
struct ReduceCtx {
    outer_hash: String,
    frame_src: Option<Url>,
}

impl ReduceCtx {
    fn new(snapshot: &FrameSnapshot) -> Self {
        Self {
            outer_hash: snapshot.outer_hash.clone(),
            frame_src: snapshot.frame_src.clone(),
        }
    }
}

pub struct PortalEngine {
    pub state: PortalState,
    pub member_tree: Vec<MemberNode>,
    pub pending_timeout_ms: u64,
    next_handle: ItemHandle,
}

impl PortalEngine {
    pub fn new(root_path: &str) -> Self {
        Self {
            state: PortalState::new(root_path),
            member_tree: Vec::new(),
            pending_timeout_ms: PENDING_TIMEOUT_MS,
            next_handle: 0,
        }
    }

    pub fn set_member_tree(&mut self, tree: Vec<MemberNode>) {
        self.member_tree = tree;
    }

    /// Registers sidebar items for a (possibly filtered) tree: one handle
    /// per project entry, shared by its hidden pages; one per extra file.
    /// Seeds the per-path route modes declared by the catalog.
    pub fn install_items(&mut self, tree: &[MemberNode]) {
        self.state.items_by_path.clear();
        self.state.route_mode_by_path.clear();

        for member in tree {
            for project in &member.projects {
                let entry_handle = self.next_handle();
                self.state
                    .items_by_path
                    .insert(project.entry.clone(), entry_handle);
                self.state
                    .route_mode_by_path
                    .insert(project.entry.clone(), project.route_mode);

                for hidden in &project.hidden_files {
                    if hidden != &project.entry {
                        self.state.items_by_path.insert(hidden.clone(), entry_handle);
                        self.state
                            .route_mode_by_path
                            .insert(hidden.clone(), project.route_mode);
                    }
                }

                for file in &project.files {
                    if file == &project.entry || project.hidden_files.contains(file) {
                        continue;
                    }
                    let handle = self.next_handle();
                    self.state.items_by_path.insert(file.clone(), handle);
                    self.state
                        .route_mode_by_path
                        .insert(file.clone(), project.route_mode);
                }
            }
        }
    }

    fn next_handle(&mut self) -> ItemHandle {
        self.next_handle += 1;
        self.next_handle
    }

    /// Re-renders from the stored tree: filters by keyword, reinstalls
    /// items, then re-activates the current selection if it survived the
    /// filter, or falls back to the first visible project when asked to.
    pub fn render_by_current_state(
        &mut self,
        keyword: &str,
        auto_activate_first: bool,
        snapshot: &FrameSnapshot,
    ) -> Vec<Effect> {
        let filtered: Vec<MemberNode> = filter_member_tree(&self.member_tree, keyword)
            .into_iter()
            .cloned()
            .collect();
        self.install_items(&filtered);

        let mut effects = Vec::new();
        if filtered.is_empty() {
            return effects;
        }

        if !self.state.active_path.is_empty()
            && self.state.items_by_path.contains_key(&self.state.active_path)
        {
            let path = self.state.active_path.clone();
            let title = if self.state.active_title.is_empty() {
                breadcrumb(&path)
            } else {
                self.state.active_title.clone()
            };
            let suffix = self.state.active_route_suffix.clone();
            let mut ctx = ReduceCtx::new(snapshot);
            let request = ActivationRequest::new(&path, &title).with_suffix(&suffix);
            self.activate_inner(&request, snapshot, &mut ctx, &mut effects);
            return effects;
        }

        if !auto_activate_first {
            return effects;
        }

        if let Some((member, project)) = first_project(&filtered) {
            let title = format!("{} / {}", member.label(), project.label());
            let entry = project.entry.clone();
            let mode = project.route_mode;
            let mut ctx = ReduceCtx::new(snapshot);
            let request = ActivationRequest::new(&entry, &title).with_mode(mode);
            self.activate_inner(&request, snapshot, &mut ctx, &mut effects);
        }
        effects
    }

    /// Opens the selection encoded in the snapshot's outer hash, if it
    /// resolves to a known item. Returns whether anything was opened.
    pub fn try_open_from_hash(&mut self, snapshot: &FrameSnapshot) -> (bool, Vec<Effect>) {
        let Some(selection) = self.current_hash_selection(snapshot) else {
            return (false, Vec::new());
        };
        let title = build_title_from_path(&self.member_tree, &selection.path);
        let mut effects = Vec::new();
        let mut ctx = ReduceCtx::new(snapshot);
        let request =
            ActivationRequest::new(&selection.path, &title).with_suffix(&selection.route_suffix);
        self.activate_inner(&request, snapshot, &mut ctx, &mut effects);
        (true, effects)
    }

    pub fn current_hash_selection(&self, snapshot: &FrameSnapshot) -> Option<HashSelection> {
        resolve_hash_selection(&snapshot.outer_hash, self.state.items_by_path.keys())
    }

    /// Makes a path the active selection. Silently does nothing when the
    /// path is not a registered item; callers pre-validate against known
    /// items via the hash resolver.
    pub fn activate(&mut self, request: &ActivationRequest, snapshot: &FrameSnapshot) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut ctx = ReduceCtx::new(snapshot);
        self.activate_inner(request, snapshot, &mut ctx, &mut effects);
        effects
    }

    /// Folds one external input through the reconciliation routine.
    pub fn observe(&mut self, observation: Observation, snapshot: &FrameSnapshot) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut ctx = ReduceCtx::new(snapshot);
        match observation {
            Observation::FrameLoaded => self.on_frame_load(snapshot, &mut ctx, &mut effects),
            Observation::FrameFailed => self.on_frame_error(&mut effects),
            Observation::HashChanged => self.on_hash_change(snapshot, &mut ctx, &mut effects),
            Observation::Tick => self.sync_from_frame(snapshot, &mut ctx, &mut effects),
        }
        effects
    }

    fn activate_inner(
        &mut self,
        request: &ActivationRequest,
        snapshot: &FrameSnapshot,
        ctx: &mut ReduceCtx,
        effects: &mut Vec<Effect>,
    ) {
        let Some(&item) = self.state.items_by_path.get(request.path) else {
            return;
        };

        if !self.state.active_path.is_empty() && self.state.active_path != request.path {
            if let Some(&previous) = self.state.items_by_path.get(&self.state.active_path) {
                effects.push(Effect::Unhighlight { item: previous });
            }
        }
        effects.push(Effect::Highlight { item });

        self.state.active_path = request.path.to_string();
        self.state.active_title = request.title.to_string();
        self.state.active_route_suffix = normalize_route_suffix(request.route_suffix);

        let mode = request
            .route_mode_override
            .or_else(|| self.state.route_mode_by_path.get(request.path).copied())
            .unwrap_or_default();
        self.state
            .route_mode_by_path
            .insert(request.path.to_string(), mode);

        let src = build_frame_source(
            request.path,
            &self.state.root_path,
            &self.state.active_route_suffix,
            mode,
        );
        let target = snapshot.base_url.join(&src).ok();
        let needs_navigation = match (&ctx.frame_src, &target) {
            (Some(current), Some(resolved)) => current != resolved,
            _ => true,
        };
        if needs_navigation {
            self.state.pending_frame_path = request.path.to_string();
            self.state.pending_frame_set_at = snapshot.now_ms;
            ctx.frame_src = target;
            effects.push(Effect::SetFrameSource { url: src });
            effects.push(Effect::SetStatus {
                status: ViewerStatus::LoadingPreview,
            });
        }

        effects.push(Effect::SetTitle {
            title: request.title.to_string(),
        });
        effects.push(Effect::SetExternalLink {
            href: self.external_link(request.path),
        });

        let target_hash = encode_hash_path(request.path, &self.state.active_route_suffix);
        if ctx.outer_hash != target_hash {
            ctx.outer_hash = target_hash.clone();
            effects.push(Effect::ReplaceHash { hash: target_hash });
        }
    }

    /// Core drift check, run on every observation and on the timer tick.
    fn sync_from_frame(
        &mut self,
        snapshot: &FrameSnapshot,
        ctx: &mut ReduceCtx,
        effects: &mut Vec<Effect>,
    ) {
        if self.state.active_path.is_empty() {
            effects.push(Effect::ClearStatus);
            return;
        }

        if !self.state.pending_frame_path.is_empty()
            && snapshot.now_ms.saturating_sub(self.state.pending_frame_set_at)
                > self.pending_timeout_ms
        {
            // Abandoned: a stuck loading state must not suppress drift
            // detection forever.
            self.state.clear_pending();
        }

        let pending = self.state.has_pending_for_active();

        let location = match &snapshot.location {
            FrameLocation::Readable { pathname, hash } => Some((pathname.as_str(), hash.as_str())),
            FrameLocation::CrossOrigin => {
                if !pending {
                    effects.push(Effect::SetStatus {
                        status: ViewerStatus::CrossOriginDrift,
                    });
                }
                return;
            }
            FrameLocation::Detached => None,
        };

        if let Some((pathname, _)) = location {
            let frame_relative = relative_path_from_pathname(pathname, &self.state.root_path);
            if !frame_relative.is_empty()
                && frame_relative != self.state.active_path
                && self.state.items_by_path.contains_key(&frame_relative)
            {
                if pending {
                    // The frame has not caught up with the navigation we just
                    // issued; do not chase its stale location.
                    return;
                }
                // The user (or the embedded page) navigated to a sibling
                // known page; follow it.
                let title = breadcrumb(&frame_relative);
                let path = frame_relative;
                let request = ActivationRequest::new(&path, &title);
                self.activate_inner(&request, snapshot, ctx, effects);
                return;
            }
        }

        let route = self.read_route_info(location, snapshot);
        if !route.matched {
            if !pending {
                effects.push(Effect::SetStatus {
                    status: ViewerStatus::RouteMismatch,
                });
            }
            return;
        }

        self.state
            .route_mode_by_path
            .insert(self.state.active_path.clone(), route.mode);
        self.state.active_route_suffix = route.suffix;
        if self.state.pending_frame_path == self.state.active_path {
            self.state.clear_pending();
        }

        let active = self.state.active_path.clone();
        effects.push(Effect::SetExternalLink {
            href: self.external_link(&active),
        });
        let target_hash = encode_hash_path(&active, &self.state.active_route_suffix);
        if ctx.outer_hash != target_hash {
            ctx.outer_hash = target_hash.clone();
            effects.push(Effect::ReplaceHash { hash: target_hash });
        }
        effects.push(Effect::ClearStatus);
    }

    /// Classifies the frame's location against the expected preview URL for
    /// the active path.
    fn read_route_info(
        &self,
        location: Option<(&str, &str)>,
        snapshot: &FrameSnapshot,
    ) -> RouteInfo {
        let fallback_mode = self.state.route_mode_for(&self.state.active_path);
        let Some((pathname, frame_hash)) = location else {
            return RouteInfo {
                suffix: String::new(),
                mode: fallback_mode,
                matched: false,
            };
        };

        let preview_url = build_preview_url(&self.state.active_path, &self.state.root_path);
        let Some(expected) = snapshot.base_url.join(&preview_url).ok() else {
            return RouteInfo {
                suffix: self.state.active_route_suffix.clone(),
                mode: fallback_mode,
                matched: false,
            };
        };
        let expected_pathname = expected.path();

        if pathname == expected_pathname {
            if !frame_hash.starts_with("#/") {
                return RouteInfo {
                    suffix: String::new(),
                    mode: fallback_mode,
                    matched: true,
                };
            }
            return RouteInfo {
                suffix: normalize_route_suffix(&from_safe_path(&frame_hash[2..])),
                mode: RouteMode::Hash,
                matched: true,
            };
        }

        if let Some(encoded_suffix) = pathname.strip_prefix(&format!("{}/", expected_pathname)) {
            return RouteInfo {
                suffix: normalize_route_suffix(&from_safe_path(encoded_suffix)),
                mode: RouteMode::Path,
                matched: true,
            };
        }

        RouteInfo {
            suffix: self.state.active_route_suffix.clone(),
            mode: fallback_mode,
            matched: false,
        }
    }

    /// Frame load: run the drift check, then retry a requested sub-route the
    /// fresh document discarded — once per distinct (path, suffix).
    fn on_frame_load(
        &mut self,
        snapshot: &FrameSnapshot,
        ctx: &mut ReduceCtx,
        effects: &mut Vec<Effect>,
    ) {
        let selection = self.current_hash_selection(snapshot);
        self.sync_from_frame(snapshot, ctx, effects);

        let Some(selection) = selection else {
            self.state.route_retry_key.clear();
            return;
        };
        if selection.path != self.state.active_path {
            self.state.route_retry_key.clear();
            return;
        }

        let requested = normalize_route_suffix(&selection.route_suffix);
        if requested.is_empty() || requested == self.state.active_route_suffix {
            self.state.route_retry_key.clear();
            return;
        }

        let retry_key = format!("{}|{}", selection.path, requested);
        if self.state.route_retry_key == retry_key {
            return;
        }
        self.state.route_retry_key = retry_key;

        let title = build_title_from_path(&self.member_tree, &selection.path);
        let request = ActivationRequest::new(&selection.path, &title)
            .with_suffix(&requested)
            .with_mode(RouteMode::Hash);
        self.activate_inner(&request, snapshot, ctx, effects);
    }

    fn on_hash_change(
        &mut self,
        snapshot: &FrameSnapshot,
        ctx: &mut ReduceCtx,
        effects: &mut Vec<Effect>,
    ) {
        let Some(selection) = self.current_hash_selection(snapshot) else {
            return;
        };

        let suffix = normalize_route_suffix(&selection.route_suffix);
        if selection.path == self.state.active_path && suffix == self.state.active_route_suffix {
            return;
        }

        let title = build_title_from_path(&self.member_tree, &selection.path);
        let request = ActivationRequest::new(&selection.path, &title).with_suffix(&suffix);
        self.activate_inner(&request, snapshot, ctx, effects);
    }

    fn on_frame_error(&mut self, effects: &mut Vec<Effect>) {
        if self.state.active_path.is_empty() {
            return;
        }
        self.state.clear_pending();
        effects.push(Effect::SetStatus {
            status: ViewerStatus::PreviewLoadFailed,
        });
    }

    /// "Open in new tab" target for a path, using its learned route mode
    /// and the currently active suffix.
    fn external_link(&self, path: &str) -> String {
        build_frame_source(
            path,
            &self.state.root_path,
            &self.state.active_route_suffix,
            self.state.route_mode_for(path),
        )
    }
}

/// Fallback breadcrumb for paths the catalog has no node for.
fn breadcrumb(path: &str) -> String {
    path.split('/').collect::<Vec<_>>().join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_member_project_tree;
    use crate::engine::status::ViewerStatus;

    fn engine_with(paths: &[&str]) -> PortalEngine {
        let mut engine = PortalEngine::new("/portal/");
        let tree = build_member_project_tree(
            &paths.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        );
        engine.set_member_tree(tree.clone());
        engine.install_items(&tree);
        engine
    }

    fn snapshot(frame_src: Option<&str>, location: FrameLocation, hash: &str, now: u64) -> FrameSnapshot {
        FrameSnapshot {
            frame_src: frame_src.map(|s| Url::parse(s).unwrap()),
            location,
            outer_hash: hash.to_string(),
            base_url: Url::parse("https://alice.github.io/portal/").unwrap(),
            now_ms: now,
        }
    }

    fn has_frame_source(effects: &[Effect]) -> bool {
        effects.iter().any(|e| matches!(e, Effect::SetFrameSource { .. }))
    }

    fn replaced_hash(effects: &[Effect]) -> Option<&str> {
        effects.iter().rev().find_map(|e| match e {
            Effect::ReplaceHash { hash } => Some(hash.as_str()),
            _ => None,
        })
    }

    #[test]
    fn test_activate_sets_frame_source_and_hash() {
        let mut engine = engine_with(&["bob/dashboard/index.html", "bob/dashboard/reports.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        let effects = engine.activate(&request, &snap);

        assert!(effects.contains(&Effect::SetFrameSource {
            url: "/portal/bob/dashboard/index.html".to_string()
        }));
        assert_eq!(replaced_hash(&effects), Some("#/bob/dashboard/index.html"));
        assert_eq!(engine.state.pending_frame_path, "bob/dashboard/index.html");
        assert!(effects.contains(&Effect::SetStatus {
            status: ViewerStatus::LoadingPreview
        }));
    }

    #[test]
    fn test_activate_unknown_path_is_noop() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("nobody/home/index.html", "nobody");
        let effects = engine.activate(&request, &snap);
        assert!(effects.is_empty());
        assert!(engine.state.active_path.is_empty());
    }

    #[test]
    fn test_activate_same_target_twice_is_idempotent() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        let effects = engine.activate(&request, &snap);
        assert!(has_frame_source(&effects));

        // Second activation with the frame already at the target.
        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Detached,
            "#/bob/dashboard/index.html",
            2_000,
        );
        let effects = engine.activate(&request, &snap);
        assert!(!has_frame_source(&effects));
        assert_eq!(replaced_hash(&effects), None);
    }

    #[test]
    fn test_activate_switches_highlight() {
        let mut engine = engine_with(&["alice/landing/index.html", "bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let first = ActivationRequest::new("alice/landing/index.html", "alice / landing");
        engine.activate(&first, &snap);
        let first_handle = engine.state.items_by_path["alice/landing/index.html"];

        let second = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        let effects = engine.activate(&second, &snap);
        assert!(effects.contains(&Effect::Unhighlight { item: first_handle }));
        assert_eq!(engine.state.active_path, "bob/dashboard/index.html");
    }

    #[test]
    fn test_sync_confirms_pending_and_clears_status() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        engine.activate(&request, &snap);

        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Readable {
                pathname: "/portal/bob/dashboard/index.html".to_string(),
                hash: String::new(),
            },
            "#/bob/dashboard/index.html",
            1_400,
        );
        let effects = engine.observe(Observation::Tick, &snap);
        assert!(engine.state.pending_frame_path.is_empty());
        assert!(effects.contains(&Effect::ClearStatus));
        assert_eq!(replaced_hash(&effects), None);
    }

    #[test]
    fn test_sync_discovers_path_style_suffix() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        engine.state.active_path = "bob/dashboard/index.html".to_string();
        engine.state.active_title = "bob / dashboard".to_string();

        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Readable {
                pathname: "/portal/bob/dashboard/index.html/metrics".to_string(),
                hash: String::new(),
            },
            "#/bob/dashboard/index.html",
            2_000,
        );
        let effects = engine.observe(Observation::Tick, &snap);
        assert_eq!(engine.state.active_route_suffix, "metrics");
        assert_eq!(
            engine.state.route_mode_for("bob/dashboard/index.html"),
            RouteMode::Path
        );
        assert_eq!(
            replaced_hash(&effects),
            Some("#/bob/dashboard/index.html/metrics")
        );
    }

    #[test]
    fn test_sync_discovers_hash_style_suffix() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        engine.state.active_path = "bob/dashboard/index.html".to_string();

        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Readable {
                pathname: "/portal/bob/dashboard/index.html".to_string(),
                hash: "#/articles/detail".to_string(),
            },
            "#/bob/dashboard/index.html",
            2_000,
        );
        let effects = engine.observe(Observation::Tick, &snap);
        assert_eq!(engine.state.active_route_suffix, "articles/detail");
        assert_eq!(
            engine.state.route_mode_for("bob/dashboard/index.html"),
            RouteMode::Hash
        );
        assert_eq!(
            replaced_hash(&effects),
            Some("#/bob/dashboard/index.html/articles/detail")
        );
    }

    #[test]
    fn test_sync_follows_sibling_navigation() {
        let mut engine = engine_with(&["alice/landing/index.html", "bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        engine.activate(&request, &snap);
        engine.state.clear_pending();

        let snap = snapshot(
            Some("https://alice.github.io/portal/alice/landing/index.html"),
            FrameLocation::Readable {
                pathname: "/portal/alice/landing/index.html".to_string(),
                hash: String::new(),
            },
            "#/bob/dashboard/index.html",
            2_000,
        );
        let effects = engine.observe(Observation::Tick, &snap);
        assert_eq!(engine.state.active_path, "alice/landing/index.html");
        assert_eq!(engine.state.active_title, "alice / landing / index.html");
        assert_eq!(replaced_hash(&effects), Some("#/alice/landing/index.html"));
        // Frame is already there; no reload.
        assert!(!has_frame_source(&effects));
    }

    #[test]
    fn test_sync_suppresses_sibling_while_pending() {
        let mut engine = engine_with(&["alice/landing/index.html", "bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        engine.activate(&request, &snap);

        // Pending navigation in flight; the frame still shows the old page.
        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Readable {
                pathname: "/portal/alice/landing/index.html".to_string(),
                hash: String::new(),
            },
            "#/bob/dashboard/index.html",
            1_200,
        );
        let effects = engine.observe(Observation::Tick, &snap);
        assert_eq!(engine.state.active_path, "bob/dashboard/index.html");
        assert!(effects.is_empty());
    }

    #[test]
    fn test_sync_cross_origin_warns_when_not_pending() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        engine.state.active_path = "bob/dashboard/index.html".to_string();

        let snap = snapshot(None, FrameLocation::CrossOrigin, "#/bob/dashboard/index.html", 2_000);
        let effects = engine.observe(Observation::Tick, &snap);
        assert!(effects.contains(&Effect::SetStatus {
            status: ViewerStatus::CrossOriginDrift
        }));
        // Active selection untouched.
        assert_eq!(engine.state.active_path, "bob/dashboard/index.html");
    }

    #[test]
    fn test_sync_cross_origin_silent_while_pending() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        engine.activate(&request, &snap);

        let snap = snapshot(None, FrameLocation::CrossOrigin, "#/bob/dashboard/index.html", 1_200);
        let effects = engine.observe(Observation::Tick, &snap);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_sync_mismatch_warns_when_not_pending() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        engine.state.active_path = "bob/dashboard/index.html".to_string();

        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Readable {
                pathname: "/elsewhere/redirected.html".to_string(),
                hash: String::new(),
            },
            "#/bob/dashboard/index.html",
            2_000,
        );
        let effects = engine.observe(Observation::Tick, &snap);
        assert!(effects.contains(&Effect::SetStatus {
            status: ViewerStatus::RouteMismatch
        }));
    }

    #[test]
    fn test_pending_expires_after_timeout() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        engine.activate(&request, &snap);
        assert!(!engine.state.pending_frame_path.is_empty());

        // 15s + epsilon later, frame still unreadable: marker is abandoned
        // and the mismatch warning is no longer suppressed.
        let snap = snapshot(None, FrameLocation::Detached, "#/bob/dashboard/index.html", 16_100);
        let effects = engine.observe(Observation::Tick, &snap);
        assert!(engine.state.pending_frame_path.is_empty());
        assert!(effects.contains(&Effect::SetStatus {
            status: ViewerStatus::RouteMismatch
        }));
    }

    #[test]
    fn test_frame_error_clears_pending_and_reports() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        engine.activate(&request, &snap);

        let snap = snapshot(None, FrameLocation::Detached, "#/bob/dashboard/index.html", 1_500);
        let effects = engine.observe(Observation::FrameFailed, &snap);
        assert!(engine.state.pending_frame_path.is_empty());
        assert!(effects.contains(&Effect::SetStatus {
            status: ViewerStatus::PreviewLoadFailed
        }));
    }

    #[test]
    fn test_frame_error_without_active_is_silent() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let effects = engine.observe(Observation::FrameFailed, &snap);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_hash_change_activates_known_selection() {
        let mut engine = engine_with(&["alice/landing/index.html", "bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "#/alice/landing/index.html", 1_000);
        let effects = engine.observe(Observation::HashChanged, &snap);
        assert_eq!(engine.state.active_path, "alice/landing/index.html");
        assert!(has_frame_source(&effects));
    }

    #[test]
    fn test_hash_change_ignores_unknown_and_noop_selections() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "#/nobody/home/index.html", 1_000);
        assert!(engine.observe(Observation::HashChanged, &snap).is_empty());

        let snap = snapshot(None, FrameLocation::Detached, "#garbage", 1_000);
        assert!(engine.observe(Observation::HashChanged, &snap).is_empty());

        engine.state.active_path = "bob/dashboard/index.html".to_string();
        engine.state.active_route_suffix = "reports".to_string();
        let snap = snapshot(
            None,
            FrameLocation::Detached,
            "#/bob/dashboard/index.html/reports",
            1_000,
        );
        assert!(engine.observe(Observation::HashChanged, &snap).is_empty());
    }

    #[test]
    fn test_frame_load_retries_requested_suffix_once() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let deep_hash = "#/bob/dashboard/index.html/reports";

        // Deep link opened: activation requested the suffix path-style.
        let snap = snapshot(None, FrameLocation::Detached, deep_hash, 1_000);
        let (opened, _) = engine.try_open_from_hash(&snap);
        assert!(opened);
        assert_eq!(engine.state.active_route_suffix, "reports");

        // The embedded app reset to its default route on load: frame sits at
        // the bare entry page, so the sync reports an empty suffix and the
        // load handler retries hash-style.
        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html/reports"),
            FrameLocation::Readable {
                pathname: "/portal/bob/dashboard/index.html".to_string(),
                hash: String::new(),
            },
            deep_hash,
            2_000,
        );
        let effects = engine.observe(Observation::FrameLoaded, &snap);
        assert_eq!(
            engine.state.route_retry_key,
            "bob/dashboard/index.html|reports"
        );
        assert!(effects.contains(&Effect::SetFrameSource {
            url: "/portal/bob/dashboard/index.html#/reports".to_string()
        }));
        assert_eq!(
            engine.state.route_mode_for("bob/dashboard/index.html"),
            RouteMode::Hash
        );
        // Net hash across the batch stays the deep link.
        assert_eq!(engine.state.active_route_suffix, "reports");

        // Same outcome again: the retry key blocks a second attempt.
        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html#/reports"),
            FrameLocation::Readable {
                pathname: "/portal/bob/dashboard/index.html".to_string(),
                hash: String::new(),
            },
            deep_hash,
            3_000,
        );
        let effects = engine.observe(Observation::FrameLoaded, &snap);
        assert!(!has_frame_source(&effects));
    }

    #[test]
    fn test_frame_load_with_honored_suffix_clears_retry_key() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        engine.state.active_path = "bob/dashboard/index.html".to_string();
        engine.state.route_retry_key = "stale|key".to_string();

        let snap = snapshot(
            Some("https://alice.github.io/portal/bob/dashboard/index.html"),
            FrameLocation::Readable {
                pathname: "/portal/bob/dashboard/index.html".to_string(),
                hash: "#/reports".to_string(),
            },
            "#/bob/dashboard/index.html/reports",
            2_000,
        );
        engine.observe(Observation::FrameLoaded, &snap);
        assert!(engine.state.route_retry_key.is_empty());
        assert_eq!(engine.state.active_route_suffix, "reports");
    }

    #[test]
    fn test_sync_with_nothing_active_clears_status() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        let snap = snapshot(None, FrameLocation::Detached, "", 1_000);
        let effects = engine.observe(Observation::Tick, &snap);
        assert_eq!(effects, vec![Effect::ClearStatus]);
    }

    #[test]
    fn test_outer_hash_matches_suffix_after_matched_sync() {
        let mut engine = engine_with(&["bob/dashboard/index.html"]);
        engine.state.active_path = "bob/dashboard/index.html".to_string();

        for (pathname, hash, suffix) in [
            ("/portal/bob/dashboard/index.html/a/b", "", "a/b"),
            ("/portal/bob/dashboard/index.html", "#/c", "c"),
            ("/portal/bob/dashboard/index.html", "", ""),
        ] {
            let snap = snapshot(
                Some("https://alice.github.io/portal/bob/dashboard/index.html"),
                FrameLocation::Readable {
                    pathname: pathname.to_string(),
                    hash: hash.to_string(),
                },
                "",
                2_000,
            );
            engine.observe(Observation::Tick, &snap);
            assert_eq!(engine.state.active_route_suffix, suffix);
        }
    }
}
