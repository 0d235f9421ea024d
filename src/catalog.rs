//! Member/project catalog: pure tree construction from flat path lists and
//! the breadcrumb/filter helpers built on top of it.
//!
//! Paths group by their first two segments (`member/project/...`); anything
//! shallower is not a servable project page and is skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::state::RouteMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub id: Option<String>,
    pub member: Option<String>,
    pub name: String,
    pub display_name: Option<String>,
    /// The page opened when the project itself is selected.
    pub entry: String,
    pub files: Vec<String>,
    pub hidden_files: Vec<String>,
    pub route_mode: RouteMode,
    pub order: Option<i64>,
    pub tags: Vec<String>,
    pub updated_at: Option<String>,
}

impl ProjectNode {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberNode {
    pub name: String,
    pub display_name: Option<String>,
    pub projects: Vec<ProjectNode>,
}

impl MemberNode {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Ranks a page for entry selection: the canonical `index.html` directly
/// under `member/project/` ranks first, deeper index pages next, everything
/// else after, shallower before deeper.
pub fn score_file(path: &str) -> usize {
    let lower = path.to_lowercase();
    let parts: Vec<&str> = lower.split('/').collect();
    let filename = parts.last().copied().unwrap_or("");
    let depth = parts.len();

    if filename == "index.html" && depth == 3 {
        return 0;
    }
    if filename == "index.html" {
        return 1 + depth;
    }
    10 + depth
}

/// Picks the entry page for a project: lowest score wins, ties broken by
/// string order.
pub fn choose_entry(files: &[String]) -> String {
    files
        .iter()
        .min_by(|a, b| score_file(a).cmp(&score_file(b)).then_with(|| a.cmp(b)))
        .cloned()
        .unwrap_or_default()
}

pub fn sort_project_files(files: &mut [String]) {
    files.sort_by(|a, b| score_file(a).cmp(&score_file(b)).then_with(|| a.cmp(b)));
}

/// Groups flat paths into the two-level member/project tree. Used when the
/// manifest carries only a path list or when discovery fell back to the
/// repository tree.
pub fn build_member_project_tree(html_paths: &[String]) -> Vec<MemberNode> {
    let mut members: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();

    for full_path in html_paths {
        let parts: Vec<&str> = full_path.split('/').collect();
        if parts.len() < 3 {
            continue;
        }
        members
            .entry(parts[0].to_string())
            .or_default()
            .entry(parts[1].to_string())
            .or_default()
            .push(full_path.clone());
    }

    let mut member_nodes = Vec::new();
    for (member_name, projects) in members {
        let mut project_nodes = Vec::new();
        for (project_name, mut files) in projects {
            sort_project_files(&mut files);
            project_nodes.push(ProjectNode {
                id: None,
                member: Some(member_name.clone()),
                name: project_name,
                display_name: None,
                entry: choose_entry(&files),
                files,
                hidden_files: Vec::new(),
                route_mode: RouteMode::Path,
                order: None,
                tags: Vec::new(),
                updated_at: None,
            });
        }
        member_nodes.push(MemberNode {
            name: member_name,
            display_name: None,
            projects: project_nodes,
        });
    }

    member_nodes
}

/// Breadcrumb for a path: `member / project` for an entry page, with the
/// in-project file path appended for secondary pages; a plain segment join
/// for paths the tree does not know.
pub fn build_title_from_path(tree: &[MemberNode], path: &str) -> String {
    for member in tree {
        for project in &member.projects {
            if project.entry == path {
                return format!("{} / {}", member.label(), project.label());
            }
            if project.files.iter().any(|f| f == path) {
                let file_label = path.split('/').skip(2).collect::<Vec<_>>().join("/");
                return format!("{} / {} / {}", member.label(), project.label(), file_label);
            }
        }
    }
    path.split('/').collect::<Vec<_>>().join(" / ")
}

/// Member-level search filter over name and display name.
pub fn filter_member_tree<'a>(tree: &'a [MemberNode], keyword: &str) -> Vec<&'a MemberNode> {
    let keyword = keyword.trim();
    tree.iter()
        .filter(|member| {
            keyword.is_empty()
                || member.label().contains(keyword)
                || member.name.contains(keyword)
        })
        .collect()
}

pub fn first_project<'a>(tree: &'a [MemberNode]) -> Option<(&'a MemberNode, &'a ProjectNode)> {
    tree.iter()
        .find(|member| !member.projects.is_empty())
        .map(|member| (member, &member.projects[0]))
}
