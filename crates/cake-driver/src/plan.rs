//! Task sequences for each cake command.

use crate::commands::{BuildTarget, Debugger, GenerateArgs, InstallRequest};
use crate::error::{DriverError, Result};
use crate::options::{
    BuildOptions, CreateOptions, DebugOptions, InstallOptions, RunOptions, Template,
    VCPKG_REPOSITORY,
};
use crate::process::CommandLine;
use crate::task::{Step, Tasks};
use std::ffi::OsString;
use std::path::Path;

/// Scratch clone used while fetching a template.
const SCRATCH_CLONE: &str = "temp_cake";

/// query marker → generate → resolve targets → build.
pub fn build_plan(options: &BuildOptions) -> Tasks {
    let mut tasks = Tasks::new();

    tasks.add_task(Step::QueryCodemodel {
        build_dir: options.build_dir.clone(),
    });
    tasks.add_task(Step::Generate(GenerateArgs {
        cmake: options.cmake.clone(),
        source_dir: options.source_dir.clone(),
        build_dir: options.build_dir.clone(),
        vcpkg: options.toolchain(),
        options: options.options.clone(),
    }));
    tasks.add_task(Step::ResolveMetadata {
        build_dir: options.build_dir.clone(),
    });
    tasks.add_task(Step::Build {
        cmake: options.cmake.clone(),
        build_dir: options.build_dir.clone(),
        target: BuildTarget::select(options.lib.clone(), options.bin.clone()),
    });

    tasks
}

/// resolve targets → run.
pub fn run_plan(options: &RunOptions) -> Result<Tasks> {
    let bin = options.bin.clone().ok_or(DriverError::MissingBinary)?;

    let mut tasks = Tasks::new();
    tasks.add_task(Step::ResolveMetadata {
        build_dir: options.build_dir.clone(),
    });
    tasks.add_task(Step::Run {
        build_dir: options.build_dir.clone(),
        bin,
        args: options.args.clone(),
    });

    Ok(tasks)
}

/// resolve targets → debug.
pub fn debug_plan(options: &DebugOptions) -> Result<Tasks> {
    let debugger: Debugger = options.debugger.parse()?;
    let bin = options.bin.clone().ok_or(DriverError::MissingBinary)?;

    let mut tasks = Tasks::new();
    tasks.add_task(Step::ResolveMetadata {
        build_dir: options.build_dir.clone(),
    });
    tasks.add_task(Step::Debug {
        debugger,
        source_dir: options.source_dir.clone(),
        build_dir: options.build_dir.clone(),
        bin,
        args: options.args.clone(),
    });

    Ok(tasks)
}

/// One vcpkg call.
pub fn install_plan(options: &InstallOptions) -> Result<Tasks> {
    if !options.vcpkg_support {
        return Err(DriverError::VcpkgDisabled);
    }

    let mut tasks = Tasks::new();
    tasks.add_task(Step::Install(InstallRequest {
        vcpkg: options.vcpkg.executable.clone(),
        manifest_dir: options.vcpkg.manifest_dir.clone(),
        packages_dir: options.vcpkg.packages_dir.clone(),
        mode: options.mode.clone(),
        options: options.options.clone(),
    }));

    Ok(tasks)
}

/// Fetch `template/<kind>` from the template repository with a sparse
/// checkout and turn it into a fresh git project.
pub fn create_plan(options: &CreateOptions) -> Tasks {
    let kind = options.template.as_str();
    let scratch = options.workdir.join(SCRATCH_CLONE);
    let project = options.workdir.join(options.project_name());

    let mut tasks = Tasks::new();

    tasks.add_task(git(["init".into(), scratch.clone().into()]));
    tasks.add_task(git_in(&scratch, ["remote", "add", "origin", options.repository.as_str()]));
    tasks.add_task(git_in(&scratch, ["config", "core.sparseCheckout", "true"]));
    tasks.add_task(Step::WriteFile {
        path: scratch.join(".git/info/sparse-checkout"),
        contents: format!("template/{}\n", kind),
    });
    tasks.add_task(git_in(&scratch, ["pull", "origin", options.branch.as_str()]));
    tasks.add_task(Step::Rename {
        from: scratch.join("template").join(kind),
        to: project.clone(),
    });
    tasks.add_task(Step::RemoveDir { path: scratch });
    tasks.add_task(git(["init".into(), project.clone().into()]));

    if options.template == Template::Vcpkg {
        let vcpkg_dir = project.join("packages/vcpkg");
        tasks.add_task(git_in(
            &project,
            ["submodule", "add", VCPKG_REPOSITORY, "./packages/vcpkg"],
        ));
        tasks.add_task(Step::Exec(
            CommandLine::new("sh").arg(vcpkg_dir.join("bootstrap-vcpkg.sh")),
        ));

        let mut manifest_root = OsString::from("--x-manifest-root=");
        manifest_root.push(project.join("packages"));
        tasks.add_task(Step::Exec(
            CommandLine::new(vcpkg_dir.join("vcpkg"))
                .args(["x-update-baseline", "--add-initial-baseline"])
                .arg(manifest_root),
        ));
    }

    tasks
}

/// Run doxygen in the current directory.
pub fn docs_plan() -> Tasks {
    let mut tasks = Tasks::new();
    tasks.add_task(Step::Exec(CommandLine::new("doxygen").arg("Doxyfile")));
    tasks
}

fn git<const N: usize>(args: [OsString; N]) -> Step {
    Step::Exec(CommandLine::new("git").args(args))
}

fn git_in<const N: usize>(repo: &Path, args: [&str; N]) -> Step {
    Step::Exec(CommandLine::new("git").arg("-C").arg(repo).args(args))
}
