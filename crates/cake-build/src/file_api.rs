//! CMake file-API reply reader.
//!
//! CMake writes its build metadata under `<build>/.cmake/api/v1/reply/` when a
//! query marker exists under `<build>/.cmake/api/v1/query/`. The reply is a
//! chain of JSON documents: an `index-*.json` pointing at a codemodel, which
//! lists one JSON file per target.

use crate::error::{BuildError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File-API root, relative to the build directory.
pub const FILE_API_ROOT: &str = ".cmake/api/v1";

/// Query kind we ask the generator for.
pub const CODEMODEL_QUERY: &str = "codemodel-v2";

static INDEX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^index-[0-9a-zA-Z-]+\.json$").unwrap());

/// `<build>/.cmake/api/v1/query`
pub fn query_dir(build_dir: &Path) -> PathBuf {
    build_dir.join(FILE_API_ROOT).join("query")
}

/// `<build>/.cmake/api/v1/reply`
pub fn reply_dir(build_dir: &Path) -> PathBuf {
    build_dir.join(FILE_API_ROOT).join("reply")
}

/// Parsed `index-*.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyIndex {
    /// Replies keyed by query name.
    #[serde(default)]
    pub reply: serde_json::Map<String, serde_json::Value>,

    /// File the index was read from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl ReplyIndex {
    /// The codemodel file name, relative to the reply directory.
    pub fn codemodel_file(&self) -> Option<&str> {
        self.reply
            .get(CODEMODEL_QUERY)
            .and_then(|v| v.get("jsonFile"))
            .and_then(|v| v.as_str())
    }
}

/// Parsed `codemodel-v2-*.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codemodel {
    #[serde(default)]
    pub configurations: Vec<Configuration>,

    #[serde(skip)]
    pub path: PathBuf,
}

/// One build configuration (Debug, Release, ...) of the codemodel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub targets: Vec<TargetRef>,
}

/// Reference from the codemodel to a target reply file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRef {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "jsonFile")]
    pub json_file: String,
}

impl Codemodel {
    /// Targets of the first configuration.
    ///
    /// Multi-config generators list one configuration per build type; only
    /// the first one is consulted.
    pub fn targets(&self) -> Result<&[TargetRef]> {
        self.configurations
            .first()
            .map(|c| c.targets.as_slice())
            .ok_or_else(|| BuildError::EmptyCodemodel {
                path: self.path.clone(),
            })
    }
}

/// Ask the generator to write a codemodel reply on its next run.
///
/// Creates the query directory and an empty `codemodel-v2` marker file.
/// Calling it again leaves the existing marker untouched.
pub fn make_query_marker(build_dir: &Path) -> Result<PathBuf> {
    let dir = query_dir(build_dir);
    std::fs::create_dir_all(&dir).map_err(|source| BuildError::Io {
        path: dir.clone(),
        source,
    })?;

    let marker = dir.join(CODEMODEL_QUERY);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&marker)
        .map_err(|source| BuildError::Io {
            path: marker.clone(),
            source,
        })?;

    tracing::debug!(marker = %marker.display(), "codemodel query marker ready");
    Ok(marker)
}

/// Find the newest reply index in the reply directory.
///
/// CMake names index files so that the most recent one sorts last, so the
/// lexicographically greatest name wins (`index-2.json` beats `index-10.json`).
pub fn find_reply_index(build_dir: &Path) -> Result<PathBuf> {
    let dir = reply_dir(build_dir);
    let not_found = || BuildError::ReplyIndexNotFound { dir: dir.clone() };

    let entries = std::fs::read_dir(&dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            not_found()
        } else {
            BuildError::ReadReply {
                path: dir.clone(),
                source,
            }
        }
    })?;

    let latest = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| INDEX_PATTERN.is_match(name))
        .max()
        .ok_or_else(not_found)?;

    Ok(dir.join(latest))
}

/// Read the newest `index-*.json`.
pub fn resolve_reply_index(build_dir: &Path) -> Result<ReplyIndex> {
    let path = find_reply_index(build_dir)?;
    tracing::debug!(index = %path.display(), "resolved reply index");

    let mut index: ReplyIndex = read_json(&path)?;
    index.path = path;
    Ok(index)
}

/// Read the codemodel the reply index points at.
pub fn resolve_codemodel(build_dir: &Path, index: &ReplyIndex) -> Result<Codemodel> {
    let file = index
        .codemodel_file()
        .ok_or_else(|| BuildError::MissingCodemodel {
            path: index.path.clone(),
        })?;

    let path = reply_dir(build_dir).join(file);
    let mut codemodel: Codemodel = read_json(&path)?;
    codemodel.path = path;
    Ok(codemodel)
}

/// Read a target reply file, relative to the reply directory.
pub fn resolve_target<T: DeserializeOwned>(build_dir: &Path, json_file: &str) -> Result<T> {
    read_json(&reply_dir(build_dir).join(json_file))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| BuildError::ReadReply {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| BuildError::MalformedReply {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_reply(build: &Path, name: &str, content: &str) {
        let dir = reply_dir(build);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_query_marker_is_idempotent() {
        let tmp = TempDir::new().unwrap();

        let marker = make_query_marker(tmp.path()).unwrap();
        assert_eq!(marker, tmp.path().join(".cmake/api/v1/query/codemodel-v2"));
        assert!(marker.is_file());

        std::fs::write(&marker, "keep").unwrap();
        make_query_marker(tmp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "keep");
    }

    #[test]
    fn test_latest_index_is_lexicographic() {
        let tmp = TempDir::new().unwrap();
        write_reply(tmp.path(), "index-1.json", r#"{"reply":{}}"#);
        write_reply(tmp.path(), "index-10.json", r#"{"reply":{}}"#);
        write_reply(tmp.path(), "index-2.json", r#"{"reply":{}}"#);
        write_reply(tmp.path(), "index-3.txt", "");
        write_reply(tmp.path(), "codemodel-v2-abc.json", "{}");

        let found = find_reply_index(tmp.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "index-2.json");
    }

    #[test]
    fn test_no_reply_index() {
        let tmp = TempDir::new().unwrap();

        // No reply directory at all.
        let err = resolve_reply_index(tmp.path()).unwrap_err();
        assert!(matches!(err, BuildError::ReplyIndexNotFound { .. }));

        // Reply directory without an index.
        write_reply(tmp.path(), "codemodel-v2-abc.json", "{}");
        let err = resolve_reply_index(tmp.path()).unwrap_err();
        assert!(matches!(err, BuildError::ReplyIndexNotFound { .. }));
    }

    #[test]
    fn test_unreadable_reply_dir_keeps_os_error() {
        let tmp = TempDir::new().unwrap();
        let reply = reply_dir(tmp.path());
        std::fs::create_dir_all(reply.parent().unwrap()).unwrap();
        std::fs::write(&reply, "not a directory").unwrap();

        let err = find_reply_index(tmp.path()).unwrap_err();
        match err {
            BuildError::ReadReply { path, source } => {
                assert_eq!(path, reply);
                assert_ne!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected ReadReply, got {:?}", other),
        }
    }

    #[test]
    fn test_index_pattern() {
        assert!(INDEX_PATTERN.is_match("index-2024-01-01T00-00-00-0000.json"));
        assert!(!INDEX_PATTERN.is_match("index-.json"));
        assert!(!INDEX_PATTERN.is_match("index-1.json.bak"));
        assert!(!INDEX_PATTERN.is_match("codemodel-v2-abc.json"));
    }

    #[test]
    fn test_resolve_codemodel() {
        let tmp = TempDir::new().unwrap();
        write_reply(
            tmp.path(),
            "index-2024-01-01T00-00-00-0000.json",
            r#"{"cmake":{},"reply":{"codemodel-v2":{"kind":"codemodel","jsonFile":"codemodel-v2-1.json"}}}"#,
        );
        write_reply(
            tmp.path(),
            "codemodel-v2-1.json",
            r#"{"configurations":[{"name":"Debug","targets":[{"name":"app","jsonFile":"target-app.json"}]}]}"#,
        );

        let index = resolve_reply_index(tmp.path()).unwrap();
        assert_eq!(index.codemodel_file(), Some("codemodel-v2-1.json"));

        let codemodel = resolve_codemodel(tmp.path(), &index).unwrap();
        let targets = codemodel.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].json_file, "target-app.json");
        assert_eq!(targets[0].name.as_deref(), Some("app"));
    }

    #[test]
    fn test_missing_codemodel_reference() {
        let tmp = TempDir::new().unwrap();
        write_reply(tmp.path(), "index-a.json", r#"{"reply":{}}"#);

        let index = resolve_reply_index(tmp.path()).unwrap();
        let err = resolve_codemodel(tmp.path(), &index).unwrap_err();
        assert!(matches!(err, BuildError::MissingCodemodel { .. }));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_malformed_and_missing_files_are_parse_errors() {
        let tmp = TempDir::new().unwrap();
        write_reply(tmp.path(), "index-a.json", "{ not json");

        let err = resolve_reply_index(tmp.path()).unwrap_err();
        assert!(matches!(err, BuildError::MalformedReply { .. }));

        let err = resolve_target::<serde_json::Value>(tmp.path(), "target-gone.json").unwrap_err();
        assert!(matches!(err, BuildError::ReadReply { .. }));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_empty_codemodel() {
        let codemodel = Codemodel {
            configurations: Vec::new(),
            path: PathBuf::from("codemodel.json"),
        };
        assert!(matches!(
            codemodel.targets(),
            Err(BuildError::EmptyCodemodel { .. })
        ));
    }
}
