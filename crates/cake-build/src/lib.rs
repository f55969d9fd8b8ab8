//! Build metadata for cake.
//!
//! This crate provides:
//! - the `Cake.toml` manifest format
//! - a reader for the CMake file-API reply (`.cmake/api/v1/reply`)
//! - the name → target index resolved from that reply
//!
//! # Example
//!
//! ```toml
//! # Cake.toml
//! [package]
//! name = "my-cpp-project"
//! default-run = "app"
//!
//! [profile]
//! build-dir = "out/cmake"
//! build-type = "Debug"
//! cxx-compiler = "clang++"
//! debugger = "lldb"
//! ```

mod error;
pub mod file_api;
mod manifest;
mod metadata;

pub use error::{BuildError, Result, TargetKind};
pub use file_api::{Codemodel, ReplyIndex, TargetRef};
pub use manifest::{Manifest, PackageConfig, ProfileConfig, VcpkgConfig, MANIFEST_FILE};
pub use metadata::{Artifact, Target, TargetIndex, TargetType};
