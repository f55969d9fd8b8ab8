//! Error types for cake-build.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for cake-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Which half of the target index a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Library,
    Binary,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Library => f.write_str("libraries"),
            TargetKind::Binary => f.write_str("binaries"),
        }
    }
}

/// Errors that can occur while reading the manifest or the file-API reply.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Failed to read the manifest file.
    #[error("Failed to read manifest {}: {source}", path.display())]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML manifest.
    #[error("Failed to parse manifest {}: {source}", path.display())]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A reply file is missing or unreadable.
    #[error("Failed to read reply file {}: {source}", path.display())]
    ReadReply {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reply file is not valid JSON, or not the shape we expect.
    #[error("Malformed reply file {}: {source}", path.display())]
    MalformedReply {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No `index-*.json` in the reply directory.
    #[error("No reply index found in {}, run `cake build` first", dir.display())]
    ReplyIndexNotFound { dir: PathBuf },

    /// The reply index does not reference a codemodel.
    #[error("Reply index {} does not reference a codemodel", path.display())]
    MissingCodemodel { path: PathBuf },

    /// The codemodel lists no configurations.
    #[error("Codemodel {} has no configurations", path.display())]
    EmptyCodemodel { path: PathBuf },

    /// Target not found in the resolved index.
    #[error("'{name}' is not available, the available {kind} are: [{}]", .available.join(", "))]
    TargetNotFound {
        kind: TargetKind,
        name: String,
        available: Vec<String>,
    },

    /// Target has no artifact to run.
    #[error("Target '{name}' has no artifacts")]
    MissingArtifact { name: String },

    /// Filesystem error outside the reply directory.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// True for errors caused by a missing or malformed reply document.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            BuildError::ReadReply { .. }
                | BuildError::MalformedReply { .. }
                | BuildError::MissingCodemodel { .. }
                | BuildError::EmptyCodemodel { .. }
        )
    }

    /// True for lookups that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BuildError::TargetNotFound { .. }
                | BuildError::ReplyIndexNotFound { .. }
                | BuildError::MissingArtifact { .. }
        )
    }
}
