//! Target metadata resolved from the file-API reply.

use crate::error::{BuildError, Result, TargetKind};
use crate::file_api;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Target type as reported by CMake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
    ModuleLibrary,
    ObjectLibrary,
    InterfaceLibrary,
    Utility,
    #[serde(other)]
    Unknown,
}

/// One output file of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Relative to the build directory, or absolute if outside it.
    pub path: PathBuf,
}

/// A target reply (`target-*.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,

    #[serde(rename = "type")]
    pub target_type: TargetType,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "nameOnDisk", default)]
    pub name_on_disk: Option<String>,

    /// Output files; the first one is the primary artifact.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Target {
    pub fn is_executable(&self) -> bool {
        self.target_type == TargetType::Executable
    }

    /// Path of the primary artifact.
    pub fn primary_artifact(&self) -> Option<&Path> {
        self.artifacts.first().map(|a| a.path.as_path())
    }
}

/// Name → target index of one build directory.
///
/// `libraries` holds every target; `binaries` only the executables, so every
/// binary is also a library.
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    libraries: FxHashMap<String, Target>,
    binaries: FxHashMap<String, Target>,
}

impl TargetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index from the reply in `build_dir`.
    pub fn resolve(build_dir: &Path) -> Result<Self> {
        let reply_index = file_api::resolve_reply_index(build_dir)?;
        let codemodel = file_api::resolve_codemodel(build_dir, &reply_index)?;

        let mut index = Self::new();
        for target_ref in codemodel.targets()? {
            let target: Target = file_api::resolve_target(build_dir, &target_ref.json_file)?;
            index.insert(target);
        }

        tracing::debug!(
            libraries = index.libraries.len(),
            binaries = index.binaries.len(),
            "resolved target metadata"
        );
        Ok(index)
    }

    /// Insert a target, replacing any previous target of the same name.
    pub fn insert(&mut self, target: Target) {
        if target.is_executable() && target.artifacts.is_empty() {
            tracing::warn!(name = %target.name, "executable target has no artifacts");
        }
        if target.is_executable() {
            self.binaries.insert(target.name.clone(), target.clone());
        } else {
            self.binaries.remove(&target.name);
        }
        self.libraries.insert(target.name.clone(), target);
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn library(&self, name: &str) -> Result<&Target> {
        self.libraries
            .get(name)
            .ok_or_else(|| not_found(TargetKind::Library, name, &self.libraries))
    }

    pub fn binary(&self, name: &str) -> Result<&Target> {
        self.binaries
            .get(name)
            .ok_or_else(|| not_found(TargetKind::Binary, name, &self.binaries))
    }

    /// Sorted library names.
    pub fn library_names(&self) -> Vec<String> {
        sorted_names(&self.libraries)
    }

    /// Sorted binary names.
    pub fn binary_names(&self) -> Vec<String> {
        sorted_names(&self.binaries)
    }

    /// Location of the binary `name` inside `build_dir`.
    pub fn artifact_path(&self, build_dir: &Path, name: &str) -> Result<PathBuf> {
        let target = self.binary(name)?;
        let artifact = target
            .primary_artifact()
            .ok_or_else(|| BuildError::MissingArtifact {
                name: target.name.clone(),
            })?;
        Ok(build_dir.join(artifact))
    }
}

fn sorted_names(map: &FxHashMap<String, Target>) -> Vec<String> {
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

fn not_found(kind: TargetKind, name: &str, map: &FxHashMap<String, Target>) -> BuildError {
    BuildError::TargetNotFound {
        kind,
        name: name.to_string(),
        available: sorted_names(map),
    }
}
