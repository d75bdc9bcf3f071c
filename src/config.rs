//! Runtime configuration for the external search services.
//!
//! Endpoints and binary locations are explicit values handed to the
//! components that need them; there is no process-global state.

use std::path::PathBuf;

/// Network endpoint of a running search daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for DaemonEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 51371,
        }
    }
}

impl DaemonEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Locations of the external search binaries. The defaults resolve through
/// PATH; point them somewhere explicit for pinned installations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Batch profile-database scanner (per-domain table output).
    pub hmmscan: PathBuf,
    /// Batch profile-vs-sequence search (per-sequence table output).
    pub hmmsearch: PathBuf,
    /// Secondary sequence-vs-sequence search used for refinement.
    pub phmmer: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            hmmscan: PathBuf::from("hmmscan"),
            hmmsearch: PathBuf::from("hmmsearch"),
            phmmer: PathBuf::from("phmmer"),
        }
    }
}
