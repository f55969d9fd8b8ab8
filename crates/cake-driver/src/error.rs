//! Error types for cake-driver.

use crate::process::ProcessError;
use cake_build::BuildError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Everything that can stop a pipeline.
#[derive(Error, Diagnostic, Debug)]
pub enum DriverError {
    #[error(transparent)]
    #[diagnostic(code(cake::process))]
    Process(#[from] ProcessError),

    #[error(transparent)]
    #[diagnostic(code(cake::metadata))]
    Build(#[from] BuildError),

    #[error("Unsupported debugger '{0}'")]
    #[diagnostic(code(cake::debugger), help("supported debuggers are: gdb, lldb, code"))]
    UnsupportedDebugger(String),

    #[error("vcpkg support is disabled")]
    #[diagnostic(
        code(cake::vcpkg),
        help("set `vcpkg = true` under [profile] in Cake.toml, or pass --vcpkg")
    )]
    VcpkgDisabled,

    #[error("No binary selected")]
    #[diagnostic(
        code(cake::no_binary),
        help("pass --bin <name>, or set `default-run` under [package] in Cake.toml")
    )]
    MissingBinary,

    #[error("Filesystem operation failed on {}: {source}", path.display())]
    #[diagnostic(code(cake::fs))]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pipeline has already been executed")]
    #[diagnostic(code(cake::pipeline))]
    PipelineReused,
}

impl DriverError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            DriverError::Process(ProcessError::NonZeroExit { code, .. }) => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            DriverError::Process(ProcessError::Signal { signal, .. }) => {
                u8::try_from(128 + *signal).unwrap_or(1)
            }
            DriverError::Process(ProcessError::Exec { .. }) => 127,
            DriverError::Process(ProcessError::Spawn { .. }) => 71,
            DriverError::Build(BuildError::ReadManifest { .. } | BuildError::ParseManifest { .. }) => 78,
            DriverError::Build(BuildError::Io { .. }) => 74,
            DriverError::Build(err) if err.is_parse_error() => 65,
            DriverError::Build(_) => 2,
            DriverError::UnsupportedDebugger(_)
            | DriverError::VcpkgDisabled
            | DriverError::MissingBinary => 2,
            DriverError::Filesystem { .. } => 74,
            DriverError::PipelineReused => 70,
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DriverError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
