//! Manifest generation: scans a portal root for servable pages and writes a
//! fresh `projects.manifest.json` with a flat path list.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::discovery::is_html_file;
use crate::logging::ts_now;

const MIN_DEPTH: usize = 3;

/// All HTML pages under `root` at least `member/project/page.html` deep,
/// as sorted, deduplicated root-relative paths.
pub fn collect_html_paths(root: &Path) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = fs::read_dir(&current)
            .with_context(|| format!("cannot read directory {}", current.display()))?;
        for entry in entries {
            let entry = entry?;
            let full_path = entry.path();
            if full_path.is_dir() {
                stack.push(full_path);
                continue;
            }
            if !full_path.is_file() {
                continue;
            }

            let relative = full_path
                .strip_prefix(root)
                .unwrap_or(&full_path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            if !is_html_file(&relative) {
                continue;
            }
            if relative.split('/').count() < MIN_DEPTH {
                continue;
            }
            paths.push(relative);
        }
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}

pub fn write_manifest(root: &Path, html_paths: &[String]) -> Result<PathBuf> {
    let payload = json!({
        "generatedAt": ts_now(),
        "htmlPaths": html_paths,
    });
    let manifest_path = root.join("projects.manifest.json");
    let mut rendered = serde_json::to_string_pretty(&payload)?;
    rendered.push('\n');
    fs::write(&manifest_path, rendered)
        .with_context(|| format!("cannot write {}", manifest_path.display()))?;
    Ok(manifest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(root: &Path, relative: &str) {
        let path = root.join(relative.split('/').collect::<PathBuf>());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn test_collects_deep_html_only() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "bob/dashboard/index.html");
        write_file(dir.path(), "bob/dashboard/sub/page.HTM");
        write_file(dir.path(), "shallow.html");
        write_file(dir.path(), "bob/readme.md");

        let paths = collect_html_paths(dir.path()).unwrap();
        assert_eq!(
            paths,
            vec![
                "bob/dashboard/index.html".to_string(),
                "bob/dashboard/sub/page.HTM".to_string()
            ]
        );
    }

    #[test]
    fn test_written_manifest_round_trips() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "bob/dashboard/index.html");

        let paths = collect_html_paths(dir.path()).unwrap();
        let manifest_path = write_manifest(dir.path(), &paths).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
        assert_eq!(
            manifest["htmlPaths"],
            serde_json::json!(["bob/dashboard/index.html"])
        );
        assert!(manifest["generatedAt"].is_string());
    }
}
