//! Repository discovery: inferring owner/repo/root from the page location
//! and the GitHub tree-API fallback used when the manifest yields nothing.

use anyhow::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::PortalConfig;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::routing::{encode_component, normalize_root_path};

use super::retry::{retry_async, HttpStatusError, RetryConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
}

/// Explicit config wins; otherwise a `*.github.io` hostname yields the
/// owner, and the first path segment names a project-site repo.
pub fn infer_repo_from_location(config: &PortalConfig, location: &Url) -> Option<RepoInfo> {
    if let (Some(owner), Some(repo)) = (&config.owner, &config.repo) {
        return Some(RepoInfo {
            owner: owner.clone(),
            repo: repo.clone(),
        });
    }

    let host = location.host_str().unwrap_or("");
    if !host.ends_with(".github.io") {
        return None;
    }

    let owner = host.split('.').next().unwrap_or("").to_string();
    let user_site_repo = format!("{}.github.io", owner);
    let path_parts: Vec<&str> = location.path().split('/').filter(|s| !s.is_empty()).collect();
    let repo = if path_parts.is_empty() {
        user_site_repo
    } else {
        path_parts[0].to_string()
    };
    Some(RepoInfo { owner, repo })
}

/// `/` for user sites, `/<repo>/` for project sites, explicit config wins.
pub fn infer_root_path(config: &PortalConfig, owner: &str, repo: &str, location: &Url) -> String {
    if let Some(root_path) = &config.root_path {
        return normalize_root_path(root_path);
    }

    let host = location.host_str().unwrap_or("");
    if !host.ends_with(".github.io") {
        return "/".to_string();
    }

    let user_site_repo = format!("{}.github.io", owner).to_lowercase();
    if repo.to_lowercase() == user_site_repo {
        return "/".to_string();
    }

    format!("/{}/", repo)
}

pub fn is_html_file(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// One JSON GET used by every discovery request, wrapped in the retry
/// policy. Non-success statuses surface as [`HttpStatusError`] so the retry
/// loop can tell a 503 from a 404.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    retry: &RetryConfig,
    url: &str,
) -> Result<T> {
    let value: serde_json::Value = retry_async(retry, "fetch_json", || async {
        let response = client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::Error::new(HttpStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            }));
        }
        Ok(response.json::<serde_json::Value>().await?)
    })
    .await?;

    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    default_branch: Option<String>,
}

/// Configured branch, else the repository's default branch, else `main`.
pub async fn get_branch(
    client: &Client,
    config: &PortalConfig,
    owner: &str,
    repo: &str,
) -> Result<String> {
    if let Some(branch) = &config.branch {
        return Ok(branch.clone());
    }

    let url = format!("{}/repos/{}/{}", config.github_api_base, owner, repo);
    let metadata: RepoMetadata = fetch_json(client, &config.retry(), &url).await?;
    Ok(metadata.default_branch.unwrap_or_else(|| "main".to_string()))
}

#[derive(Debug, Default, Deserialize)]
struct GitTreeResponse {
    #[serde(default)]
    tree: Vec<GitTreeNode>,
}

#[derive(Debug, Default, Deserialize)]
struct GitTreeNode {
    #[serde(rename = "type")]
    kind: Option<String>,
    path: Option<String>,
}

/// Recursive repository tree, filtered to HTML blobs at least three
/// segments deep.
pub async fn get_html_paths_from_github(
    client: &Client,
    config: &PortalConfig,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Result<Vec<String>> {
    let encoded_branch = encode_component(branch);
    let url = format!(
        "{}/repos/{}/{}/git/trees/{}?recursive=1",
        config.github_api_base, owner, repo, encoded_branch
    );
    let tree_data: GitTreeResponse = fetch_json(client, &config.retry(), &url).await?;

    let paths: Vec<String> = tree_data
        .tree
        .into_iter()
        .filter(|node| node.kind.as_deref() == Some("blob"))
        .filter_map(|node| node.path)
        .filter(|path| is_html_file(path))
        .filter(|path| path.split('/').count() >= 3)
        .collect();

    log(
        Level::Info,
        Domain::Discovery,
        "github_tree",
        obj(&[
            ("owner", v_str(owner)),
            ("repo", v_str(repo)),
            ("branch", v_str(branch)),
            ("html_paths", v_num(paths.len() as f64)),
        ]),
    );

    Ok(paths)
}
