//! Task orchestration for cake.
//!
//! Each command is turned into a [`Tasks`] plan (see [`plan`]) and executed
//! by a [`Driver`] against a [`ProcessRunner`]:
//!
//! ```text
//! build:   query marker → cmake -S/-B → resolve targets → cmake --build
//! run:     resolve targets → <build>/<artifact> args...
//! debug:   resolve targets → gdb | lldb | code
//! install: vcpkg install | vcpkg add port
//! create:  git sparse checkout of a template
//! ```

pub mod commands;
mod error;
pub mod options;
pub mod plan;
mod process;
mod task;

pub use commands::{BuildTarget, Debugger, InstallMode};
pub use error::{DriverError, Result};
pub use options::{BuildOptions, CreateOptions, DebugOptions, InstallOptions, RunOptions, Template};
pub use process::{CommandLine, ProcessError, ProcessRunner, SystemRunner};
pub use task::{Context, Status, Step, Task, Tasks};

/// Executes command plans.
pub struct Driver<R: ProcessRunner = SystemRunner> {
    runner: R,
}

impl Driver<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner)
    }
}

impl Default for Driver<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ProcessRunner> Driver<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute a plan with a fresh context.
    pub fn execute(&self, tasks: &mut Tasks) -> Result<()> {
        let mut ctx = Context::new(&self.runner);
        tasks.execute(&mut ctx)
    }

    /// Configure and build.
    pub fn build(&self, options: &BuildOptions) -> Result<()> {
        self.execute(&mut plan::build_plan(options))
    }

    /// Run a built binary.
    pub fn run(&self, options: &RunOptions) -> Result<()> {
        self.execute(&mut plan::run_plan(options)?)
    }

    /// Debug a built binary.
    pub fn debug(&self, options: &DebugOptions) -> Result<()> {
        self.execute(&mut plan::debug_plan(options)?)
    }

    /// Install dependencies with vcpkg.
    pub fn install(&self, options: &InstallOptions) -> Result<()> {
        self.execute(&mut plan::install_plan(options)?)
    }

    /// Create a project from a template.
    pub fn create(&self, options: &CreateOptions) -> Result<()> {
        self.execute(&mut plan::create_plan(options))
    }

    /// Generate documentation.
    pub fn docs(&self) -> Result<()> {
        self.execute(&mut plan::docs_plan())
    }
}
