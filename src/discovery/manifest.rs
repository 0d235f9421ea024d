//! Manifest service: fetches and parses `projects.manifest.json`.
//!
//! Manifests in the wild are hand-edited, so parsing is tolerant: an entry
//! of the wrong shape is skipped, never fatal. The manifest may carry a
//! flat `htmlPaths` list, a `members` tree, or both; either alone is enough
//! to build a catalog.

use std::collections::HashSet;

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::catalog::{choose_entry, sort_project_files, MemberNode, ProjectNode};
use crate::config::PortalConfig;
use crate::engine::state::RouteMode;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

use super::github::{fetch_json, is_html_file};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestPortalData {
    pub html_paths: Vec<String>,
    pub member_tree: Vec<MemberNode>,
}

/// Keeps string entries that are HTML pages at least three segments deep.
fn to_html_path_list(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.as_str())
        .filter(|path| is_html_file(path))
        .filter(|path| path.split('/').count() >= 3)
        .map(|path| path.to_string())
        .collect()
}

/// Dedupe preserving first occurrence.
fn dedupe(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Every page reachable through the members tree: project entries plus
/// their page lists.
pub fn collect_html_paths_from_members(members: &Value) -> Vec<String> {
    let Some(members) = members.as_array() else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    for member in members {
        let Some(projects) = member.get("projects").and_then(|v| v.as_array()) else {
            continue;
        };
        for project in projects {
            if let Some(entry) = project.get("entry").and_then(|v| v.as_str()) {
                paths.push(entry.to_string());
            }
            for page in string_list(project.get("pages")) {
                paths.push(page);
            }
        }
    }
    paths
}

/// Builds catalog nodes from manifest members, honoring declared entries,
/// route modes, ordering, hidden pages and tags. A project whose pages all
/// filter out is dropped; a declared entry missing from its pages is
/// replaced by the scored choice.
pub fn member_tree_from_manifest(members: &Value) -> Vec<MemberNode> {
    let Some(members) = members.as_array() else {
        return Vec::new();
    };

    let mut member_nodes = Vec::new();
    for member in members {
        let Some(member_name) = member.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(raw_projects) = member.get("projects").and_then(|v| v.as_array()) else {
            continue;
        };

        let mut projects = Vec::new();
        for project in raw_projects {
            let Some(project_name) = project.get("name").and_then(|v| v.as_str()) else {
                continue;
            };

            let pages = project
                .get("pages")
                .and_then(|v| v.as_array())
                .map(|items| to_html_path_list(items))
                .unwrap_or_default();
            let mut files = dedupe(pages);
            sort_project_files(&mut files);
            if files.is_empty() {
                continue;
            }

            let entry = match project.get("entry").and_then(|v| v.as_str()) {
                Some(declared) if files.iter().any(|f| f == declared) => declared.to_string(),
                _ => choose_entry(&files),
            };
            if entry.is_empty() {
                continue;
            }

            let hidden_files = dedupe(
                string_list(project.get("hiddenPages"))
                    .into_iter()
                    .filter(|path| files.contains(path))
                    .filter(|path| path != &entry)
                    .collect(),
            );

            let tags = dedupe(
                string_list(project.get("tags"))
                    .into_iter()
                    .filter(|tag| !tag.trim().is_empty())
                    .collect(),
            );

            projects.push(ProjectNode {
                id: project.get("id").and_then(|v| v.as_str()).map(String::from),
                member: Some(
                    project
                        .get("member")
                        .and_then(|v| v.as_str())
                        .unwrap_or(member_name)
                        .to_string(),
                ),
                name: project_name.to_string(),
                display_name: project
                    .get("displayName")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                entry,
                files,
                hidden_files,
                route_mode: RouteMode::parse(project.get("routeMode").and_then(|v| v.as_str())),
                order: project.get("order").and_then(|v| v.as_i64()),
                tags,
                updated_at: project
                    .get("updatedAt")
                    .and_then(|v| v.as_str())
                    .map(String::from),
            });
        }

        // Explicit order first, then name.
        projects.sort_by(|a, b| match (a.order, b.order) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });

        member_nodes.push(MemberNode {
            name: member_name.to_string(),
            display_name: member
                .get("displayName")
                .and_then(|v| v.as_str())
                .map(String::from),
            projects,
        });
    }

    member_nodes
}

/// Pure half of the manifest service, exercised directly by tests.
pub fn parse_manifest(manifest: &Value) -> ManifestPortalData {
    let empty = Value::Null;
    let members = manifest.get("members").unwrap_or(&empty);

    let html_paths_raw = match manifest.get("htmlPaths").and_then(|v| v.as_array()) {
        Some(list) => to_html_path_list(list),
        None => {
            let collected: Vec<Value> = collect_html_paths_from_members(members)
                .into_iter()
                .map(Value::String)
                .collect();
            to_html_path_list(&collected)
        }
    };

    ManifestPortalData {
        html_paths: dedupe(html_paths_raw),
        member_tree: member_tree_from_manifest(members),
    }
}

pub fn manifest_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub async fn get_manifest_portal_data(
    client: &Client,
    config: &PortalConfig,
) -> Result<ManifestPortalData> {
    let manifest: Value = fetch_json(client, &config.retry(), &config.manifest_url).await?;
    let data = parse_manifest(&manifest);

    log(
        Level::Info,
        Domain::Discovery,
        "manifest_loaded",
        obj(&[
            ("url", v_str(&config.manifest_url)),
            ("html_paths", v_num(data.html_paths.len() as f64)),
            ("members", v_num(data.member_tree.len() as f64)),
            (
                "fingerprint",
                v_str(&manifest_sha256(manifest.to_string().as_bytes())),
            ),
        ]),
    );

    Ok(data)
}
