//! Session loop: wires a browser host to the engine.
//!
//! The host owns the real surfaces (frame element, address bar, sidebar,
//! status line). The session turns host events into observations, folds
//! them through the engine, and hands the resulting effects back. A
//! recurring tick runs the same drift check between events, because
//! in-frame history navigations do not reliably produce a load event.

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::PortalConfig;
use crate::engine::{Effect, FrameSnapshot, Observation, PortalEngine};
use crate::logging::{log, obj, v_str, Domain, Level};

/// Browser boundary consumed by the session: a snapshot of the world going
/// in, effects to apply coming out.
pub trait PortalHost {
    fn snapshot(&self) -> FrameSnapshot;
    fn apply(&mut self, effect: &Effect);
    /// Static empty-state shown when discovery fails.
    fn show_empty(&mut self, message: &str);
}

pub struct PortalSession<H: PortalHost> {
    pub engine: PortalEngine,
    pub host: H,
    sync_interval_ms: u64,
}

impl<H: PortalHost> PortalSession<H> {
    pub fn new(config: &PortalConfig, mut engine: PortalEngine, host: H) -> Self {
        engine.pending_timeout_ms = config.pending_timeout_ms;
        Self {
            engine,
            host,
            sync_interval_ms: config.sync_interval_ms,
        }
    }

    /// Folds one observation through the engine and applies its effects.
    pub fn dispatch(&mut self, observation: Observation) {
        let snapshot = self.host.snapshot();
        let effects = self.engine.observe(observation, &snapshot);
        self.apply_all(observation, &effects);
    }

    /// Applies effects produced outside the observation path (activation
    /// from a sidebar click, initial open).
    pub fn apply_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            self.host.apply(effect);
        }
    }

    fn apply_all(&mut self, observation: Observation, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::SetFrameSource { url } => log(
                    Level::Info,
                    Domain::Frame,
                    "navigate",
                    obj(&[
                        ("observation", v_str(observation.as_str())),
                        ("url", v_str(url)),
                    ]),
                ),
                Effect::ReplaceHash { hash } => log(
                    Level::Debug,
                    Domain::Route,
                    "replace_hash",
                    obj(&[
                        ("observation", v_str(observation.as_str())),
                        ("hash", v_str(hash)),
                    ]),
                ),
                Effect::SetStatus { status } => log(
                    Level::Debug,
                    Domain::Status,
                    "status",
                    obj(&[
                        ("status", v_str(status.as_str())),
                        ("tone", v_str(status.tone().as_str())),
                    ]),
                ),
                _ => {}
            }
            self.host.apply(effect);
        }
    }

    /// Recurring drift check. Ticks are idempotent: a missed or extra tick
    /// costs latency, never correctness.
    pub async fn run(&mut self) {
        let mut ticker = interval(Duration::from_millis(self.sync_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.dispatch(Observation::Tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_member_project_tree;
    use crate::engine::{ActivationRequest, FrameLocation, ViewerStatus};
    use url::Url;

    /// In-memory host: applies effects to a model of the browser surface,
    /// so dispatched observations see their own earlier effects.
    struct FakeHost {
        frame_src: Option<Url>,
        location: FrameLocation,
        outer_hash: String,
        base_url: Url,
        now_ms: u64,
        status: Option<ViewerStatus>,
        title: String,
        highlighted: Vec<u64>,
    }

    impl FakeHost {
        fn new() -> Self {
            Self {
                frame_src: None,
                location: FrameLocation::Detached,
                outer_hash: String::new(),
                base_url: Url::parse("https://alice.github.io/portal/").unwrap(),
                now_ms: 1_000,
                status: None,
                title: String::new(),
                highlighted: Vec::new(),
            }
        }

        /// Simulates the frame finishing navigation to its current source.
        fn settle_frame(&mut self) {
            if let Some(src) = &self.frame_src {
                self.location = FrameLocation::Readable {
                    pathname: src.path().to_string(),
                    hash: src.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
                };
            }
        }
    }

    impl PortalHost for FakeHost {
        fn snapshot(&self) -> FrameSnapshot {
            FrameSnapshot {
                frame_src: self.frame_src.clone(),
                location: self.location.clone(),
                outer_hash: self.outer_hash.clone(),
                base_url: self.base_url.clone(),
                now_ms: self.now_ms,
            }
        }

        fn apply(&mut self, effect: &Effect) {
            match effect {
                Effect::SetFrameSource { url } => {
                    self.frame_src = self.base_url.join(url).ok();
                }
                Effect::ReplaceHash { hash } => self.outer_hash = hash.clone(),
                Effect::SetStatus { status } => self.status = Some(*status),
                Effect::ClearStatus => self.status = None,
                Effect::Highlight { item } => self.highlighted.push(*item),
                Effect::Unhighlight { item } => self.highlighted.retain(|h| h != item),
                Effect::SetTitle { title } => self.title = title.clone(),
                Effect::SetExternalLink { .. } => {}
            }
        }

        fn show_empty(&mut self, _message: &str) {}
    }

    fn session_with(paths: &[&str]) -> PortalSession<FakeHost> {
        let mut engine = PortalEngine::new("/portal/");
        let tree = build_member_project_tree(
            &paths.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        );
        engine.set_member_tree(tree.clone());
        engine.install_items(&tree);
        PortalSession::new(&PortalConfig::default(), engine, FakeHost::new())
    }

    #[test]
    fn test_activation_then_tick_settles() {
        let mut session = session_with(&["bob/dashboard/index.html"]);

        let snapshot = session.host.snapshot();
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        let effects = session.engine.activate(&request, &snapshot);
        session.apply_effects(&effects);

        assert_eq!(session.host.status, Some(ViewerStatus::LoadingPreview));
        assert_eq!(session.host.outer_hash, "#/bob/dashboard/index.html");

        session.host.settle_frame();
        session.host.now_ms += 400;
        session.dispatch(Observation::Tick);

        assert_eq!(session.host.status, None);
        assert!(session.engine.state.pending_frame_path.is_empty());
        assert_eq!(session.host.title, "bob / dashboard");
    }

    #[test]
    fn test_in_frame_drift_updates_address_bar() {
        let mut session = session_with(&["bob/dashboard/index.html"]);

        let snapshot = session.host.snapshot();
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        let effects = session.engine.activate(&request, &snapshot);
        session.apply_effects(&effects);
        session.host.settle_frame();
        session.host.now_ms += 400;
        session.dispatch(Observation::Tick);

        // The embedded page pushes a sub-route through its own history API;
        // no load event fires, only the tick notices.
        session.host.location = FrameLocation::Readable {
            pathname: "/portal/bob/dashboard/index.html/metrics".to_string(),
            hash: String::new(),
        };
        session.host.now_ms += 400;
        session.dispatch(Observation::Tick);

        assert_eq!(
            session.host.outer_hash,
            "#/bob/dashboard/index.html/metrics"
        );
        assert_eq!(session.engine.state.active_route_suffix, "metrics");
    }

    #[test]
    fn test_repeated_ticks_are_idempotent() {
        let mut session = session_with(&["bob/dashboard/index.html"]);

        let snapshot = session.host.snapshot();
        let request = ActivationRequest::new("bob/dashboard/index.html", "bob / dashboard");
        let effects = session.engine.activate(&request, &snapshot);
        session.apply_effects(&effects);
        session.host.settle_frame();

        for _ in 0..5 {
            session.host.now_ms += 350;
            session.dispatch(Observation::Tick);
        }
        let frame_src = session.host.frame_src.clone();
        let hash = session.host.outer_hash.clone();

        session.host.now_ms += 350;
        session.dispatch(Observation::Tick);
        assert_eq!(session.host.frame_src, frame_src);
        assert_eq!(session.host.outer_hash, hash);
    }
}
