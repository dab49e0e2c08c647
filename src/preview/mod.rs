//! Preview refresh scheduling for retext-core
//!
//! This module decides when a session's preview is re-rendered: debounced
//! after edits in live mode, or immediately on demand.

mod scheduler;
mod timer;

pub use scheduler::{PreviewScheduler, RefreshState, DEFAULT_PREVIEW_DELAY};
pub use timer::{DeferredQueue, TaskToken};
