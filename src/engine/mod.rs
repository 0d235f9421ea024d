//! Event-driven route-synchronization engine.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Browser host │────►│ Observation  │────►│   Reducer    │
//! │ (frame/hash) │     │ + snapshot   │     │  (pure fn)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Effects    │◄────│ PortalState  │
//!                      │ (src/hash/…) │     │              │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The reducer never reads the browser directly: each observation carries a
//! [`events::FrameSnapshot`] of the world at that instant, and every change
//! the engine wants goes back out as an [`effects::Effect`]. That keeps the
//! conflict policy (pending-marker suppression, longest-match resolution)
//! unit-testable without a browser.

pub mod effects;
pub mod events;
pub mod reducer;
pub mod state;
pub mod status;

pub use effects::Effect;
pub use events::{ActivationRequest, FrameLocation, FrameSnapshot, Observation};
pub use reducer::{PortalEngine, PENDING_TIMEOUT_MS};
pub use state::{ItemHandle, PortalState, RouteMode};
pub use status::{StatusTone, ViewerStatus};
