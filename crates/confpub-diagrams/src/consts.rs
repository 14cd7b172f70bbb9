//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default HTTP timeout for Kroki requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default background colour passed to `mmdc`.
pub const DEFAULT_MERMAID_BACKGROUND: &str = "white";

/// Number of hex characters of the SHA-256 digest used in cache filenames.
pub const CACHE_HASH_LEN: usize = 16;

/// How often a running `mmdc` child is polled for completion.
pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(25);
