//! Per-command options, seeded from the manifest and overridden by flags.

use crate::commands::{InstallMode, VcpkgToolchain};
use cake_build::{Manifest, VcpkgConfig};
use std::path::PathBuf;

/// Repository the project templates are checked out from.
pub const TEMPLATE_REPOSITORY: &str = "https://github.com/Civitasv/cake";

/// vcpkg repository added as a submodule by the `vcpkg` template.
pub const VCPKG_REPOSITORY: &str = "https://github.com/microsoft/vcpkg";

/// Options of `cake build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub cmake: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub vcpkg_support: bool,
    pub vcpkg: VcpkgConfig,
    /// Generator cache entries (`KEY=VALUE`).
    pub options: Vec<String>,
    pub lib: Option<String>,
    pub bin: Option<String>,
}

impl BuildOptions {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            cmake: manifest.profile.cmake.clone(),
            source_dir: manifest.profile.source_dir.clone(),
            build_dir: manifest.profile.build_dir.clone(),
            vcpkg_support: manifest.profile.vcpkg,
            vcpkg: manifest.vcpkg.clone(),
            options: manifest.generator_options(),
            lib: None,
            bin: None,
        }
    }

    /// Toolchain flags for the generate step, if vcpkg is enabled.
    pub fn toolchain(&self) -> Option<VcpkgToolchain> {
        self.vcpkg_support.then(|| VcpkgToolchain {
            toolchain_file: self.vcpkg.toolchain_file.clone(),
            manifest_dir: self.vcpkg.manifest_dir.clone(),
            packages_dir: self.vcpkg.packages_dir.clone(),
        })
    }
}

/// Options of `cake run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub build_dir: PathBuf,
    pub bin: Option<String>,
    pub args: Vec<String>,
}

impl RunOptions {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            build_dir: manifest.profile.build_dir.clone(),
            bin: manifest.package.default_run.clone(),
            args: Vec::new(),
        }
    }
}

/// Options of `cake debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugOptions {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub debugger: String,
    pub bin: Option<String>,
    pub args: Vec<String>,
}

impl DebugOptions {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            source_dir: manifest.profile.source_dir.clone(),
            build_dir: manifest.profile.build_dir.clone(),
            debugger: manifest.profile.debugger.clone(),
            bin: manifest.package.default_run.clone(),
            args: Vec::new(),
        }
    }
}

/// Options of `cake install`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub vcpkg_support: bool,
    pub vcpkg: VcpkgConfig,
    pub mode: InstallMode,
    /// Passed through to vcpkg.
    pub options: Vec<String>,
}

impl InstallOptions {
    pub fn from_manifest(manifest: &Manifest, mode: InstallMode) -> Self {
        Self {
            vcpkg_support: manifest.profile.vcpkg,
            vcpkg: manifest.vcpkg.clone(),
            mode,
            options: Vec::new(),
        }
    }
}

/// Project templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Basic,
    Vcpkg,
}

impl Template {
    pub fn as_str(self) -> &'static str {
        match self {
            Template::Basic => "basic",
            Template::Vcpkg => "vcpkg",
        }
    }
}

/// Options of `cake create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub template: Template,
    /// Project directory name; defaults to the template name.
    pub name: Option<String>,
    /// Directory the project is created in.
    pub workdir: PathBuf,
    pub repository: String,
    pub branch: String,
}

impl CreateOptions {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            name: None,
            workdir: PathBuf::from("."),
            repository: TEMPLATE_REPOSITORY.to_string(),
            branch: "main".to_string(),
        }
    }

    pub fn project_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.template.as_str())
    }
}
