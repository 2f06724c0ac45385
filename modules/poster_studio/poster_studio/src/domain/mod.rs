pub mod access;
pub mod demo;
pub mod design_store;
pub mod editor;
pub mod repo;
pub mod session_store;

/// Where a store's freshly loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    /// The backend call failed and a local substitute was used.
    Fallback,
}

/// Result of a write whose local effect does not depend on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Backend confirmed the write.
    Synced,
    /// Backend failed; only local state changed.
    LocalOnly,
}
