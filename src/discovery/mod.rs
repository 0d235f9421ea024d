//! Discovery of the portal's page catalog: the manifest first, the GitHub
//! tree API as a fallback when the manifest yields nothing.

pub mod github;
pub mod manifest;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::PortalConfig;

pub use github::{
    get_branch, get_html_paths_from_github, infer_repo_from_location, infer_root_path,
    is_html_file, RepoInfo,
};
pub use manifest::{get_manifest_portal_data, parse_manifest, ManifestPortalData};
pub use retry::RetryConfig;

/// The two discovery channels, behind one seam so the bootstrap flow can be
/// driven by fakes in tests.
#[async_trait]
pub trait PortalDataSource: Send + Sync {
    async fn manifest(&self) -> Result<ManifestPortalData>;
    async fn branch(&self, owner: &str, repo: &str) -> Result<String>;
    async fn html_paths(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<String>>;
}

pub struct HttpDiscovery {
    client: Client,
    config: PortalConfig,
}

impl HttpDiscovery {
    pub fn new(config: PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PortalDataSource for HttpDiscovery {
    async fn manifest(&self) -> Result<ManifestPortalData> {
        get_manifest_portal_data(&self.client, &self.config).await
    }

    async fn branch(&self, owner: &str, repo: &str) -> Result<String> {
        get_branch(&self.client, &self.config, owner, repo).await
    }

    async fn html_paths(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<String>> {
        get_html_paths_from_github(&self.client, &self.config, owner, repo, branch).await
    }
}
