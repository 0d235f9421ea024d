//! User-visible status surface. Statuses are mutually exclusive and
//! last-write-wins: the host shows at most one at a time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Info,
    Warning,
    Error,
}

impl StatusTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusTone::Info => "info",
            StatusTone::Warning => "warning",
            StatusTone::Error => "error",
        }
    }
}

/// Reconciliation outcomes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerStatus {
    /// A frame navigation was just issued and has not completed.
    LoadingPreview,
    /// The frame navigated somewhere the portal is not allowed to inspect.
    /// Terminal for this activation; user action required.
    CrossOriginDrift,
    /// The frame's location is neither the expected page nor a recognized
    /// sub-route of it. May self-resolve once a pending navigation lands.
    RouteMismatch,
    /// The frame fired an error: missing page or embedding refused.
    PreviewLoadFailed,
}

impl ViewerStatus {
    pub fn tone(&self) -> StatusTone {
        match self {
            ViewerStatus::LoadingPreview => StatusTone::Info,
            ViewerStatus::CrossOriginDrift | ViewerStatus::RouteMismatch => StatusTone::Warning,
            ViewerStatus::PreviewLoadFailed => StatusTone::Error,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ViewerStatus::LoadingPreview => "Loading preview...",
            ViewerStatus::CrossOriginDrift => {
                "The page navigated to a cross-origin address and the catalog can no longer sync with it. Use \"open in new tab\"."
            }
            ViewerStatus::RouteMismatch => {
                "The preview path does not match the catalog; a redirect may have occurred. Use \"open in new tab\" to investigate."
            }
            ViewerStatus::PreviewLoadFailed => {
                "The preview failed to load; the page may not exist or may refuse embedding. Use \"open in new tab\"."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerStatus::LoadingPreview => "loading_preview",
            ViewerStatus::CrossOriginDrift => "cross_origin_drift",
            ViewerStatus::RouteMismatch => "route_mismatch",
            ViewerStatus::PreviewLoadFailed => "preview_load_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tones() {
        assert_eq!(ViewerStatus::LoadingPreview.tone(), StatusTone::Info);
        assert_eq!(ViewerStatus::CrossOriginDrift.tone(), StatusTone::Warning);
        assert_eq!(ViewerStatus::RouteMismatch.tone(), StatusTone::Warning);
        assert_eq!(ViewerStatus::PreviewLoadFailed.tone(), StatusTone::Error);
    }
}
