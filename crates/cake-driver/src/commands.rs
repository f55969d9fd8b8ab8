//! Command lines for the external tools.
//!
//! Pure functions: nothing here touches the filesystem or spawns anything, so
//! the exact argv of every tool invocation can be checked in isolation.

use crate::error::DriverError;
use crate::process::CommandLine;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// VS Code profile opened by `cake debug --debugger code`.
pub const VSCODE_PROFILE: &str = "Cake";

/// vcpkg toolchain wiring for the generate step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcpkgToolchain {
    pub toolchain_file: PathBuf,
    pub manifest_dir: PathBuf,
    pub packages_dir: PathBuf,
}

/// Inputs of `cmake -S <source> -B <build>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    pub cmake: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub vcpkg: Option<VcpkgToolchain>,
    /// Cache entries, each passed as `-D<option>`.
    pub options: Vec<String>,
}

/// Configure the build tree.
pub fn generate(args: &GenerateArgs) -> CommandLine {
    let mut cmd = CommandLine::new(&args.cmake)
        .arg("-S")
        .arg(&args.source_dir)
        .arg("-B")
        .arg(&args.build_dir);

    if let Some(vcpkg) = &args.vcpkg {
        cmd = cmd
            .arg(prefixed("-DCMAKE_TOOLCHAIN_FILE=", &vcpkg.toolchain_file))
            .arg(prefixed("-DVCPKG_MANIFEST_DIR=", &vcpkg.manifest_dir))
            .arg(prefixed("-DVCPKG_INSTALLED_DIR=", &vcpkg.packages_dir))
            // dependencies are installed explicitly with `cake install`
            .arg("-DVCPKG_MANIFEST_INSTALL=OFF");
    }

    cmd.args(args.options.iter().map(|option| format!("-D{}", option)))
}

/// Which target `cake build` asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    Library(String),
    Binary(String),
    All,
}

impl BuildTarget {
    /// `lib` wins over `bin`; with neither, everything is built.
    pub fn select(lib: Option<String>, bin: Option<String>) -> Self {
        match (lib, bin) {
            (Some(lib), _) => BuildTarget::Library(lib),
            (None, Some(bin)) => BuildTarget::Binary(bin),
            (None, None) => BuildTarget::All,
        }
    }

    /// Name passed to `--target`.
    pub fn name(&self) -> &str {
        match self {
            BuildTarget::Library(name) | BuildTarget::Binary(name) => name,
            BuildTarget::All => "all",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTarget::Library(name) => write!(f, "library {}", name),
            BuildTarget::Binary(name) => write!(f, "binary {}", name),
            BuildTarget::All => f.write_str("all targets"),
        }
    }
}

/// Build one target of a configured tree.
pub fn build(cmake: &Path, build_dir: &Path, target: &BuildTarget) -> CommandLine {
    CommandLine::new(cmake)
        .arg("--build")
        .arg(build_dir)
        .arg("--target")
        .arg(target.name())
}

/// Run a built binary.
pub fn run(artifact: &Path, args: &[String]) -> CommandLine {
    CommandLine::new(artifact).args(args)
}

/// Supported debuggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debugger {
    Gdb,
    Lldb,
    /// Visual Studio Code, opened on the source tree.
    VsCode,
}

impl FromStr for Debugger {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gdb" => Ok(Debugger::Gdb),
            "lldb" => Ok(Debugger::Lldb),
            "code" => Ok(Debugger::VsCode),
            other => Err(DriverError::UnsupportedDebugger(other.to_string())),
        }
    }
}

impl fmt::Display for Debugger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Debugger::Gdb => "gdb",
            Debugger::Lldb => "lldb",
            Debugger::VsCode => "code",
        })
    }
}

/// Start a debugger on a built binary.
pub fn debug(debugger: Debugger, artifact: &Path, args: &[String], source_dir: &Path) -> CommandLine {
    match debugger {
        Debugger::Gdb => CommandLine::new("gdb").arg("--args").arg(artifact).args(args),
        Debugger::Lldb => CommandLine::new("lldb").arg("--").arg(artifact).args(args),
        Debugger::VsCode => CommandLine::new("code")
            .arg(source_dir)
            .arg("--profile")
            .arg(VSCODE_PROFILE),
    }
}

/// What `cake install` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMode {
    /// Install everything listed in `vcpkg.json`.
    Sync,
    /// Add one port to `vcpkg.json`.
    AddPort(String),
}

/// Inputs of a vcpkg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub vcpkg: PathBuf,
    pub manifest_dir: PathBuf,
    pub packages_dir: PathBuf,
    pub mode: InstallMode,
    /// Passed through to vcpkg as-is.
    pub options: Vec<String>,
}

pub fn install(request: &InstallRequest) -> CommandLine {
    let cmd = CommandLine::new(&request.vcpkg);
    let cmd = match &request.mode {
        InstallMode::Sync => cmd
            .arg("install")
            .arg(prefixed("--x-manifest-root=", &request.manifest_dir))
            .arg(prefixed("--x-install-root=", &request.packages_dir)),
        InstallMode::AddPort(port) => cmd
            .args(["add", "port"])
            .arg(port)
            .arg(prefixed("--x-manifest-root=", &request.manifest_dir)),
    };
    cmd.args(&request.options)
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut flag = OsString::from(prefix);
    flag.push(path);
    flag
}
