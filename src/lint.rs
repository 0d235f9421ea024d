//! Offline manifest linter: schema validation, semantic cross-checks, and a
//! scan for root-absolute asset references inside project pages.
//!
//! Root-absolute references break project pages as soon as the site is
//! served under a repository prefix, so a reference that resolves inside
//! its own project directory is an error (it should have been relative);
//! one that resolves nowhere locally is only flagged for review.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonschema::JSONSchema;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))
}

fn field_array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
}

fn field_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

fn field_u64(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(|v| v.as_u64())
}

fn count_display(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
}

fn is_html_path(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

fn project_label(member_name: &str, project_name: &str) -> String {
    format!("{}/{}", member_name, project_name)
}

/// Cuts a URL at the first `?` or `#`.
fn split_path_and_suffix(url: &str) -> &str {
    let cut = url
        .find('?')
        .into_iter()
        .chain(url.find('#'))
        .min()
        .unwrap_or(url.len());
    &url[..cut]
}

pub fn validate_manifest_schema(manifest: &Value, schema: &Value, errors: &mut Vec<String>) {
    let compiled = match JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(err) => {
            errors.push(format!("[schema] schema does not compile: {}", err));
            return;
        }
    };

    let validation = compiled.validate(manifest);
    if let Err(issues) = validation {
        for issue in issues {
            let instance_path = issue.instance_path.to_string();
            let shown = if instance_path.is_empty() {
                "/".to_string()
            } else {
                instance_path
            };
            errors.push(format!("[schema] {} {}", shown, issue));
        }
    }
}

pub fn validate_manifest_semantics(manifest: &Value, root: &Path, errors: &mut Vec<String>) {
    let stats = manifest.get("stats").cloned().unwrap_or(Value::Null);
    let html_path_list: Vec<&str> = field_array(manifest, "htmlPaths")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    let members = field_array(manifest, "members");
    let top_level_projects = field_array(manifest, "projects");

    let mut page_paths_from_members: Vec<String> = Vec::new();
    let mut project_ids_from_members: Vec<String> = Vec::new();
    let mut projects_from_members_by_id: Vec<(String, &Value)> = Vec::new();
    let mut computed_project_count: u64 = 0;

    for member in members {
        let member_name = field_str(member, "name").unwrap_or("");
        let projects = field_array(member, "projects");

        let declared = field_u64(member, "projectCount");
        if declared != Some(projects.len() as u64) {
            errors.push(format!(
                "[semantic] member \"{}\" projectCount={} does not match projects.length={}",
                member_name,
                count_display(declared),
                projects.len()
            ));
        }

        for project in projects {
            computed_project_count += 1;
            let project_name = field_str(project, "name").unwrap_or("");
            let label = project_label(member_name, project_name);
            let project_id = field_str(project, "id")
                .map(String::from)
                .unwrap_or_else(|| label.clone());
            project_ids_from_members.push(project_id.clone());
            projects_from_members_by_id.push((project_id, project));

            if field_str(project, "member") != Some(member_name) {
                errors.push(format!(
                    "[semantic] project \"{}\" member=\"{}\" does not match parent member=\"{}\"",
                    label,
                    field_str(project, "member").unwrap_or(""),
                    member_name
                ));
            }

            let pages: Vec<&str> = field_array(project, "pages")
                .iter()
                .filter_map(|v| v.as_str())
                .collect();

            match field_str(project, "entry") {
                Some(entry) if pages.contains(&entry) => {}
                _ => errors.push(format!(
                    "[semantic] project \"{}\" entry is not included in pages",
                    label
                )),
            }

            let declared_pages = field_u64(project, "pageCount");
            if declared_pages != Some(pages.len() as u64) {
                errors.push(format!(
                    "[semantic] project \"{}\" pageCount={} does not match pages.length={}",
                    label,
                    count_display(declared_pages),
                    pages.len()
                ));
            }

            for page in &pages {
                page_paths_from_members.push(page.to_string());
            }

            if let Some(hidden_pages) = project.get("hiddenPages").and_then(|v| v.as_array()) {
                let entry = field_str(project, "entry").unwrap_or("");
                for hidden in hidden_pages.iter().filter_map(|v| v.as_str()) {
                    if hidden == entry {
                        errors.push(format!(
                            "[semantic] project \"{}\" hiddenPages must not include entry",
                            label
                        ));
                    }
                    if !pages.contains(&hidden) {
                        errors.push(format!(
                            "[semantic] project \"{}\" hidden page not found in pages: {}",
                            label, hidden
                        ));
                    }
                }
            }
        }
    }

    let declared_members = field_u64(&stats, "memberCount");
    if declared_members != Some(members.len() as u64) {
        errors.push(format!(
            "[semantic] stats.memberCount={} does not match members.length={}",
            count_display(declared_members),
            members.len()
        ));
    }

    let declared_projects = field_u64(&stats, "projectCount");
    if declared_projects != Some(computed_project_count) {
        errors.push(format!(
            "[semantic] stats.projectCount={} does not match computed={}",
            count_display(declared_projects),
            computed_project_count
        ));
    }

    let declared_page_count = field_u64(&stats, "pageCount");
    if declared_page_count != Some(html_path_list.len() as u64) {
        errors.push(format!(
            "[semantic] stats.pageCount={} does not match htmlPaths.length={}",
            count_display(declared_page_count),
            html_path_list.len()
        ));
    }

    if top_level_projects.len() as u64 != computed_project_count {
        errors.push(format!(
            "[semantic] projects.length={} does not match computed member projects={}",
            top_level_projects.len(),
            computed_project_count
        ));
    }

    let mut seen_top_ids: Vec<String> = Vec::new();
    for top_project in top_level_projects {
        let top_id = field_str(top_project, "id").map(String::from).unwrap_or_else(|| {
            project_label(
                field_str(top_project, "member").unwrap_or(""),
                field_str(top_project, "name").unwrap_or(""),
            )
        });
        if seen_top_ids.contains(&top_id) {
            errors.push(format!(
                "[semantic] duplicate project id in projects: {}",
                top_id
            ));
            continue;
        }
        seen_top_ids.push(top_id.clone());

        let Some((_, from_member)) = projects_from_members_by_id
            .iter()
            .find(|(id, _)| id == &top_id)
        else {
            errors.push(format!(
                "[semantic] projects contains project not found in members/projects: {}",
                top_id
            ));
            continue;
        };

        if *from_member != top_project {
            errors.push(format!(
                "[semantic] projects entry differs from members/projects for id: {}",
                top_id
            ));
        }
    }

    for member_project_id in &project_ids_from_members {
        if !seen_top_ids.contains(member_project_id) {
            errors.push(format!(
                "[semantic] members/projects contains project missing in projects: {}",
                member_project_id
            ));
        }
    }

    for html_path in &html_path_list {
        if !is_html_path(html_path) {
            errors.push(format!(
                "[semantic] htmlPaths contains non-html path: {}",
                html_path
            ));
            continue;
        }

        if html_path.split('/').count() < 3 {
            errors.push(format!("[semantic] html path depth < 3: {}", html_path));
        }

        let full_path: PathBuf = root.join(html_path.split('/').collect::<PathBuf>());
        if !full_path.exists() {
            errors.push(format!(
                "[semantic] html path does not exist: {}",
                html_path
            ));
        }
    }

    for page_path in &page_paths_from_members {
        if !html_path_list.contains(&page_path.as_str()) {
            errors.push(format!(
                "[semantic] members/projects/pages contains path not present in htmlPaths: {}",
                page_path
            ));
        }
    }

    for html_path in &html_path_list {
        if !page_paths_from_members.iter().any(|p| p == html_path) {
            errors.push(format!(
                "[semantic] htmlPaths contains path not present in members/projects/pages: {}",
                html_path
            ));
        }
    }
}

struct AssetPatterns {
    html_attr: Vec<Regex>,
    srcset: Vec<Regex>,
    css_url: Vec<Regex>,
    css_import: Vec<Regex>,
}

impl AssetPatterns {
    fn new() -> Self {
        Self {
            html_attr: vec![
                Regex::new(r#"(?i)\b(?:src|href)\s*=\s*"(/[^"]+)""#).expect("html attr pattern"),
                Regex::new(r#"(?i)\b(?:src|href)\s*=\s*'(/[^']+)'"#).expect("html attr pattern"),
            ],
            srcset: vec![
                Regex::new(r#"(?i)\bsrcset\s*=\s*"([^"]+)""#).expect("srcset pattern"),
                Regex::new(r#"(?i)\bsrcset\s*=\s*'([^']+)'"#).expect("srcset pattern"),
            ],
            css_url: vec![
                Regex::new(r#"(?i)url\(\s*"(/[^)"]+)"\s*\)"#).expect("css url pattern"),
                Regex::new(r#"(?i)url\(\s*'(/[^)']+)'\s*\)"#).expect("css url pattern"),
                Regex::new(r#"(?i)url\(\s*(/[^)"'\s]+)\s*\)"#).expect("css url pattern"),
            ],
            css_import: vec![
                Regex::new(r#"(?i)@import\s+"(/[^"]+)""#).expect("css import pattern"),
                Regex::new(r#"(?i)@import\s+'(/[^']+)'"#).expect("css import pattern"),
            ],
        }
    }
}

fn collect_absolute_urls_from_html(patterns: &AssetPatterns, html: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for pattern in &patterns.html_attr {
        for capture in pattern.captures_iter(html) {
            let url = &capture[1];
            if url.starts_with("//") {
                continue;
            }
            urls.push(url.to_string());
        }
    }

    for pattern in &patterns.srcset {
        for capture in pattern.captures_iter(html) {
            for candidate in capture[1].split(',') {
                let first_token = candidate.trim().split_whitespace().next().unwrap_or("");
                if !first_token.starts_with('/') || first_token.starts_with("//") {
                    continue;
                }
                urls.push(first_token.to_string());
            }
        }
    }

    urls
}

fn collect_absolute_urls_from_css(patterns: &AssetPatterns, css: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for pattern in patterns.css_url.iter().chain(&patterns.css_import) {
        for capture in pattern.captures_iter(css) {
            let url = &capture[1];
            if url.starts_with("//") {
                continue;
            }
            urls.push(url.to_string());
        }
    }

    urls
}

fn project_roots_from_html_paths(manifest: &Value, root: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for html_path in field_array(manifest, "htmlPaths").iter().filter_map(|v| v.as_str()) {
        let parts: Vec<&str> = html_path.split('/').collect();
        if parts.len() < 3 {
            continue;
        }
        let project_root = root.join(parts[0]).join(parts[1]);
        if !roots.contains(&project_root) {
            roots.push(project_root);
        }
    }
    roots
}

pub fn validate_absolute_asset_paths(
    manifest: &Value,
    root: &Path,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let patterns = AssetPatterns::new();

    for project_root in project_roots_from_html_paths(manifest, root) {
        if !project_root.exists() {
            continue;
        }

        let mut stack = vec![project_root.clone()];
        while let Some(current) = stack.pop() {
            let Ok(entries) = fs::read_dir(&current) else {
                continue;
            };
            for entry in entries.flatten() {
                let full_path = entry.path();
                if full_path.is_dir() {
                    stack.push(full_path);
                    continue;
                }
                if !full_path.is_file() {
                    continue;
                }

                let ext = full_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase())
                    .unwrap_or_default();
                if ext != "html" && ext != "htm" && ext != "css" {
                    continue;
                }

                let Ok(content) = fs::read_to_string(&full_path) else {
                    continue;
                };
                let absolute_urls = if ext == "css" {
                    collect_absolute_urls_from_css(&patterns, &content)
                } else {
                    collect_absolute_urls_from_html(&patterns, &content)
                };

                for url in absolute_urls {
                    let path_part = split_path_and_suffix(&url);
                    let relative = path_part.trim_start_matches('/');
                    if relative.is_empty() {
                        continue;
                    }

                    let local_target =
                        project_root.join(relative.split('/').collect::<PathBuf>());
                    let relative_file = full_path
                        .strip_prefix(root)
                        .unwrap_or(&full_path)
                        .to_string_lossy()
                        .replace('\\', "/");
                    if local_target.exists() {
                        errors.push(format!(
                            "[asset] root-absolute local asset should be relative: {} -> {}",
                            relative_file, url
                        ));
                        continue;
                    }

                    warnings.push(format!(
                        "[asset] unresolved root-absolute reference (verify if intentional): {} -> {}",
                        relative_file, url
                    ));
                }
            }
        }
    }
}

/// Full lint pass: schema, semantics, assets. The manifest and schema live
/// at the portal root as `projects.manifest.json` / `projects.schema.json`.
pub fn lint_portal(root: &Path) -> Result<LintReport> {
    let manifest = read_json(&root.join("projects.manifest.json"))?;
    let schema = read_json(&root.join("projects.schema.json"))?;

    let mut report = LintReport::default();
    validate_manifest_schema(&manifest, &schema, &mut report.errors);
    validate_manifest_semantics(&manifest, root, &mut report.errors);
    validate_absolute_asset_paths(&manifest, root, &mut report.errors, &mut report.warnings);
    Ok(report)
}
