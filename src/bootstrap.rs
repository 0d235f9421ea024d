//! Startup flow: discover the page catalog, then open the deep link from
//! the current hash or fall back to the first visible project.
//!
//! Discovery failures are terminal for initialization and surface as a
//! static empty-state message; they are never retried beyond the HTTP
//! retry policy inside each fetch.

use url::Url;

use crate::catalog::build_member_project_tree;
use crate::catalog::MemberNode;
use crate::config::PortalConfig;
use crate::discovery::{infer_repo_from_location, infer_root_path, PortalDataSource};
use crate::engine::{Effect, FrameSnapshot, PortalEngine};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

const MSG_NO_REPO: &str = "Cannot identify a GitHub repository from this location.\n\n\
Either set owner/repo in the portal configuration, or serve this page from a github.io domain.";

const MSG_NO_PATHS: &str = "No previewable projects were found, or the catalog could not be read.\n\n\
Check that:\n\
1. the repository contains member/project/*.html pages\n\
2. projects.manifest.json exists and is well-formed\n\
3. the repository is public or the API is reachable";

const MSG_NO_TREE: &str = "Found HTML files, but none matched the member/project layout.\n\n\
Use at least two directory levels: member/project/page.html";

/// Result of initialization: either a catalog to render or a static
/// empty-state message.
#[derive(Debug, Clone, PartialEq)]
pub enum InitOutcome {
    Empty { message: String },
    Ready {
        root_path: String,
        member_tree: Vec<MemberNode>,
    },
}

pub async fn initialize_portal(
    config: &PortalConfig,
    location: &Url,
    source: &dyn PortalDataSource,
) -> InitOutcome {
    let Some(repo_info) = infer_repo_from_location(config, location) else {
        return InitOutcome::Empty {
            message: MSG_NO_REPO.to_string(),
        };
    };

    let root_path = infer_root_path(config, &repo_info.owner, &repo_info.repo, location);

    let mut html_paths = Vec::new();
    let mut member_tree = Vec::new();
    let mut load_error: Option<anyhow::Error> = None;

    match source.manifest().await {
        Ok(data) => {
            html_paths = data.html_paths;
            member_tree = data.member_tree;
        }
        Err(err) => {
            log(
                Level::Warn,
                Domain::Discovery,
                "manifest_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            load_error = Some(err);
        }
    }

    if html_paths.is_empty() {
        let fallback = async {
            let branch = source.branch(&repo_info.owner, &repo_info.repo).await?;
            source
                .html_paths(&repo_info.owner, &repo_info.repo, &branch)
                .await
        };
        match fallback.await {
            Ok(paths) => html_paths = paths,
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Discovery,
                    "github_fallback_failed",
                    obj(&[("error", v_str(&err.to_string()))]),
                );
                if load_error.is_none() {
                    load_error = Some(err);
                }
            }
        }
    }

    if html_paths.is_empty() {
        let details = load_error
            .map(|err| format!("\n\nError details: {}", err))
            .unwrap_or_default();
        return InitOutcome::Empty {
            message: format!("{}{}", MSG_NO_PATHS, details),
        };
    }

    if member_tree.is_empty() {
        member_tree = build_member_project_tree(&html_paths);
    }

    if member_tree.is_empty() {
        return InitOutcome::Empty {
            message: MSG_NO_TREE.to_string(),
        };
    }

    log(
        Level::Info,
        Domain::Discovery,
        "catalog_ready",
        obj(&[
            ("root_path", v_str(&root_path)),
            ("html_paths", v_num(html_paths.len() as f64)),
            ("members", v_num(member_tree.len() as f64)),
        ]),
    );

    InitOutcome::Ready {
        root_path,
        member_tree,
    }
}

/// Installs the catalog into a fresh engine and opens the initial
/// selection: the deep link in the current hash when it resolves, else the
/// first visible project.
pub fn open_initial(engine: &mut PortalEngine, snapshot: &FrameSnapshot) -> Vec<Effect> {
    let mut effects = engine.render_by_current_state("", false, snapshot);

    let (opened, mut open_effects) = engine.try_open_from_hash(snapshot);
    effects.append(&mut open_effects);
    if !opened {
        effects.extend(engine.render_by_current_state("", true, snapshot));
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ManifestPortalData;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct FakeSource {
        manifest: Result<ManifestPortalData>,
        branch: Result<String>,
        html_paths: Result<Vec<String>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                manifest: Err(anyhow!("manifest unavailable")),
                branch: Ok("main".to_string()),
                html_paths: Err(anyhow!("tree unavailable")),
            }
        }
    }

    #[async_trait]
    impl PortalDataSource for FakeSource {
        async fn manifest(&self) -> Result<ManifestPortalData> {
            match &self.manifest {
                Ok(data) => Ok(data.clone()),
                Err(err) => Err(anyhow!("{}", err)),
            }
        }

        async fn branch(&self, _owner: &str, _repo: &str) -> Result<String> {
            match &self.branch {
                Ok(branch) => Ok(branch.clone()),
                Err(err) => Err(anyhow!("{}", err)),
            }
        }

        async fn html_paths(&self, _owner: &str, _repo: &str, _branch: &str) -> Result<Vec<String>> {
            match &self.html_paths {
                Ok(paths) => Ok(paths.clone()),
                Err(err) => Err(anyhow!("{}", err)),
            }
        }
    }

    fn location() -> Url {
        Url::parse("https://alice.github.io/portal/").unwrap()
    }

    #[tokio::test]
    async fn test_unidentifiable_repo_is_empty_state() {
        let config = PortalConfig::default();
        let source = FakeSource::new();
        let outcome = initialize_portal(
            &config,
            &Url::parse("https://example.com/").unwrap(),
            &source,
        )
        .await;
        assert!(matches!(outcome, InitOutcome::Empty { .. }));
    }

    #[tokio::test]
    async fn test_manifest_supplies_catalog() {
        let config = PortalConfig::default();
        let mut source = FakeSource::new();
        source.manifest = Ok(ManifestPortalData {
            html_paths: vec!["alice/demo/index.html".to_string()],
            member_tree: Vec::new(),
        });

        let outcome = initialize_portal(&config, &location(), &source).await;
        match outcome {
            InitOutcome::Ready {
                root_path,
                member_tree,
            } => {
                assert_eq!(root_path, "/portal/");
                assert_eq!(member_tree.len(), 1);
                assert_eq!(member_tree[0].name, "alice");
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_github_fallback_on_empty_manifest() {
        let config = PortalConfig::default();
        let mut source = FakeSource::new();
        source.manifest = Ok(ManifestPortalData::default());
        source.html_paths = Ok(vec!["bob/dashboard/index.html".to_string()]);

        let outcome = initialize_portal(&config, &location(), &source).await;
        match outcome {
            InitOutcome::Ready { member_tree, .. } => {
                assert_eq!(member_tree[0].name, "bob");
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_channels_failing_reports_details() {
        let config = PortalConfig::default();
        let source = FakeSource::new();
        let outcome = initialize_portal(&config, &location(), &source).await;
        match outcome {
            InitOutcome::Empty { message } => {
                assert!(message.contains("Error details"));
                assert!(message.contains("manifest unavailable"));
            }
            other => panic!("expected Empty, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shallow_paths_only_reports_layout_guidance() {
        let config = PortalConfig::default();
        let mut source = FakeSource::new();
        // Depth filtering happens in the services; a degenerate source that
        // hands back shallow paths must still not produce a tree.
        source.manifest = Ok(ManifestPortalData {
            html_paths: vec!["index.html".to_string()],
            member_tree: Vec::new(),
        });

        let outcome = initialize_portal(&config, &location(), &source).await;
        match outcome {
            InitOutcome::Empty { message } => {
                assert!(message.contains("member/project/page.html"));
            }
            other => panic!("expected Empty, got {:?}", other),
        }
    }
}
