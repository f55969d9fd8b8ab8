//! Project manifest (`Cake.toml` format).

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default manifest file name, looked up in the working directory.
pub const MANIFEST_FILE: &str = "Cake.toml";

/// Root manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Package metadata.
    #[serde(default)]
    pub package: PackageConfig,

    /// Generator and toolchain settings.
    #[serde(default)]
    pub profile: ProfileConfig,

    /// vcpkg locations.
    #[serde(default)]
    pub vcpkg: VcpkgConfig,
}

/// Package metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Binary used by `run` and `debug` when none is given.
    #[serde(default, alias = "default_run")]
    pub default_run: Option<String>,
}

/// Generator and toolchain settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProfileConfig {
    #[serde(alias = "source_dir")]
    pub source_dir: PathBuf,

    #[serde(alias = "build_dir")]
    pub build_dir: PathBuf,

    #[serde(alias = "build_type")]
    pub build_type: String,

    #[serde(alias = "c_compiler")]
    pub c_compiler: String,

    #[serde(alias = "cxx_compiler")]
    pub cxx_compiler: String,

    pub linker: String,

    /// Export `compile_commands.json`.
    #[serde(alias = "compile_commands")]
    pub compile_commands: bool,

    /// Generator executable.
    pub cmake: PathBuf,

    pub debugger: String,

    /// Route dependencies through vcpkg.
    pub vcpkg: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            build_dir: PathBuf::from("out/cmake"),
            build_type: "Debug".to_string(),
            c_compiler: "gcc".to_string(),
            cxx_compiler: "g++".to_string(),
            linker: "ld".to_string(),
            compile_commands: true,
            cmake: PathBuf::from("cmake"),
            debugger: "gdb".to_string(),
            vcpkg: false,
        }
    }
}

/// vcpkg locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VcpkgConfig {
    pub executable: PathBuf,

    #[serde(alias = "toolchain_file")]
    pub toolchain_file: PathBuf,

    #[serde(alias = "manifest_dir")]
    pub manifest_dir: PathBuf,

    #[serde(alias = "packages_dir")]
    pub packages_dir: PathBuf,
}

impl Default for VcpkgConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./packages/vcpkg/vcpkg"),
            toolchain_file: PathBuf::from("./packages/vcpkg/scripts/buildsystems/vcpkg.cmake"),
            manifest_dir: PathBuf::from("./packages/"),
            packages_dir: PathBuf::from("./packages/vcpkg_packages"),
        }
    }
}

impl Manifest {
    /// Load a manifest from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BuildError::ReadManifest {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| BuildError::ParseManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a manifest, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(manifest = %path.display(), "no manifest, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Generator cache options (`KEY=VALUE`) derived from the profile.
    pub fn generator_options(&self) -> Vec<String> {
        let profile = &self.profile;
        let mut options = Vec::new();

        if profile.compile_commands {
            options.push("CMAKE_EXPORT_COMPILE_COMMANDS=1".to_string());
        }
        options.push(format!("CMAKE_C_COMPILER:FILEPATH={}", profile.c_compiler));
        options.push(format!("CMAKE_CXX_COMPILER:FILEPATH={}", profile.cxx_compiler));
        options.push(format!("CMAKE_LINKER={}", profile.linker));
        options.push(format!("CMAKE_BUILD_TYPE={}", profile.build_type));

        options
    }
}
