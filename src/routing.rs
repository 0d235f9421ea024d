//! Path/route codec: conversions between logical repository-relative paths
//! (plus optional sub-route suffixes) and their URL-boundary encodings.
//!
//! Logical paths are never percent-encoded at rest. Encoding happens only
//! here, per segment, on the way into a hash fragment or a frame source.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::engine::state::RouteMode;

/// Characters left intact by per-segment encoding, matching the set a
/// browser keeps unescaped in URL components.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A hash fragment resolved back into a known path plus sub-route suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashSelection {
    pub path: String,
    pub route_suffix: String,
}

pub fn normalize_root_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut value = path.trim().to_string();
    if !value.starts_with('/') {
        value.insert(0, '/');
    }
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

/// Strips leading and trailing slashes; empty means "no suffix".
pub fn normalize_route_suffix(suffix: &str) -> String {
    suffix.trim_matches('/').to_string()
}

/// Percent-encode one URL component; `/` is not a passthrough here.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Percent-encode each `/`-separated segment independently.
pub fn to_safe_path(path: &str) -> String {
    path.split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`to_safe_path`]. A segment that fails to decode is kept
/// as-is rather than failing the whole path.
pub fn from_safe_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Shareable outer-page hash: `#/<path>` or `#/<path>/<suffix>`.
pub fn encode_hash_path(path: &str, route_suffix: &str) -> String {
    let base = to_safe_path(path);
    let suffix = normalize_route_suffix(route_suffix);
    if suffix.is_empty() {
        return format!("#/{}", base);
    }
    format!("#/{}/{}", base, to_safe_path(&suffix))
}

/// Decodes a `#/`-prefixed hash back into a logical path string.
pub fn decode_hash_path(hash: &str) -> Option<String> {
    let encoded = hash.strip_prefix("#/")?;
    if encoded.is_empty() {
        return None;
    }
    Some(from_safe_path(encoded))
}

/// Root path joined to the encoded logical path with exactly one separator.
pub fn build_preview_url(path: &str, root_path: &str) -> String {
    let safe_path = to_safe_path(path);
    if root_path.ends_with('/') {
        return format!("{}{}", root_path, safe_path);
    }
    format!("{}/{}", root_path, safe_path)
}

/// Frame source for a path plus optional sub-route, honoring the page's
/// routing convention.
pub fn build_frame_source(path: &str, root_path: &str, route_suffix: &str, mode: RouteMode) -> String {
    let preview_url = build_preview_url(path, root_path);
    let suffix = normalize_route_suffix(route_suffix);
    if suffix.is_empty() {
        return preview_url;
    }
    match mode {
        RouteMode::Hash => format!("{}#/{}", preview_url, to_safe_path(&suffix)),
        RouteMode::Path => format!("{}/{}", preview_url, to_safe_path(&suffix)),
    }
}

/// Resolves a hash against the set of known paths. The longest known path
/// that is an exact match, or a proper prefix followed by `/`, wins; the
/// remainder becomes the suffix. Longest-first ordering keeps a longer
/// registered path from being mis-split into a shorter path plus suffix.
pub fn resolve_hash_selection<I, S>(hash: &str, known_paths: I) -> Option<HashSelection>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let decoded = decode_hash_path(hash)?;
    let mut candidates: Vec<String> = known_paths
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    for path in candidates {
        if decoded == path {
            return Some(HashSelection {
                path,
                route_suffix: String::new(),
            });
        }
        if decoded.starts_with(&format!("{}/", path)) {
            let suffix = decoded[path.len() + 1..].to_string();
            return Some(HashSelection {
                route_suffix: normalize_route_suffix(&suffix),
                path,
            });
        }
    }

    None
}

/// Strips the root prefix from an absolute pathname and percent-decodes the
/// remainder; empty when the pathname is not under the root.
pub fn relative_path_from_pathname(pathname: &str, root_path: &str) -> String {
    let root = normalize_root_path(root_path);
    if !pathname.starts_with(&root) {
        return String::new();
    }
    from_safe_path(&pathname[root.len()..])
        .trim_start_matches('/')
        .to_string()
}
