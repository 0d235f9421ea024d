//! Regenerates `projects.manifest.json` from the pages on disk.
//!
//! Usage: `generate_manifest [portal-root]` (defaults to the current
//! directory).

use std::path::PathBuf;
use std::process;

use portalsync::manifest_gen::{collect_html_paths, write_manifest};

fn main() {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let html_paths = match collect_html_paths(&root) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("[generate-manifest] {:#}", err);
            process::exit(1);
        }
    };

    match write_manifest(&root, &html_paths) {
        Ok(path) => println!(
            "[generate-manifest] Wrote {} paths to {}",
            html_paths.len(),
            path.display()
        ),
        Err(err) => {
            eprintln!("[generate-manifest] {:#}", err);
            process::exit(1);
        }
    }
}
