//! Sequential, fail-fast task pipeline.

use crate::commands::{self, BuildTarget, Debugger, GenerateArgs, InstallRequest};
use crate::error::{DriverError, Result};
use crate::process::{CommandLine, ProcessRunner};
use cake_build::{file_api, TargetIndex};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of a task or a whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Succeeded,
    Failed,
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Drop the codemodel query marker into the build tree.
    QueryCodemodel { build_dir: PathBuf },
    /// Configure the build tree.
    Generate(GenerateArgs),
    /// Re-read the file-API reply into the context's target index.
    ResolveMetadata { build_dir: PathBuf },
    /// Build one target (or `all`).
    Build {
        cmake: PathBuf,
        build_dir: PathBuf,
        target: BuildTarget,
    },
    /// Run a built binary.
    Run {
        build_dir: PathBuf,
        bin: String,
        args: Vec<String>,
    },
    /// Attach a debugger to a built binary.
    Debug {
        debugger: Debugger,
        source_dir: PathBuf,
        build_dir: PathBuf,
        bin: String,
        args: Vec<String>,
    },
    /// Call vcpkg.
    Install(InstallRequest),
    /// Run an arbitrary command.
    Exec(CommandLine),
    WriteFile { path: PathBuf, contents: String },
    Rename { from: PathBuf, to: PathBuf },
    RemoveDir { path: PathBuf },
}

impl Step {
    fn execute(&self, ctx: &mut Context<'_>) -> Result<()> {
        match self {
            Step::QueryCodemodel { build_dir } => {
                file_api::make_query_marker(build_dir)?;
            }
            Step::Generate(args) => ctx.runner.run(&commands::generate(args))?,
            Step::ResolveMetadata { build_dir } => {
                ctx.index = TargetIndex::resolve(build_dir)?;
            }
            Step::Build {
                cmake,
                build_dir,
                target,
            } => {
                match target {
                    BuildTarget::Library(name) => {
                        ctx.index.library(name)?;
                    }
                    BuildTarget::Binary(name) => {
                        ctx.index.binary(name)?;
                    }
                    BuildTarget::All => {}
                }
                ctx.runner.run(&commands::build(cmake, build_dir, target))?;
            }
            Step::Run {
                build_dir,
                bin,
                args,
            } => {
                let artifact = ctx.index.artifact_path(build_dir, bin)?;
                ctx.runner.run(&commands::run(&artifact, args))?;
            }
            Step::Debug {
                debugger,
                source_dir,
                build_dir,
                bin,
                args,
            } => {
                let artifact = ctx.index.artifact_path(build_dir, bin)?;
                ctx.runner
                    .run(&commands::debug(*debugger, &artifact, args, source_dir))?;
            }
            Step::Install(request) => ctx.runner.run(&commands::install(request))?,
            Step::Exec(command) => ctx.runner.run(command)?,
            Step::WriteFile { path, contents } => {
                std::fs::write(path, contents).map_err(|e| DriverError::fs(path, e))?;
            }
            Step::Rename { from, to } => {
                std::fs::rename(from, to).map_err(|e| DriverError::fs(from, e))?;
            }
            Step::RemoveDir { path } => {
                std::fs::remove_dir_all(path).map_err(|e| DriverError::fs(path, e))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::QueryCodemodel { build_dir } => {
                write!(f, "query codemodel in {}", build_dir.display())
            }
            Step::Generate(args) => write!(f, "generate: {}", commands::generate(args)),
            Step::ResolveMetadata { build_dir } => {
                write!(f, "resolve targets in {}", build_dir.display())
            }
            Step::Build {
                cmake,
                build_dir,
                target,
            } => write!(
                f,
                "build {}: {}",
                target,
                commands::build(cmake, build_dir, target)
            ),
            Step::Run { bin, args, .. } => {
                write!(f, "run {}", bin)?;
                write_args(f, args)
            }
            Step::Debug {
                debugger, bin, args, ..
            } => {
                write!(f, "debug {} with {}", bin, debugger)?;
                write_args(f, args)
            }
            Step::Install(request) => write!(f, "install: {}", commands::install(request)),
            Step::Exec(command) => write!(f, "exec: {}", command),
            Step::WriteFile { path, .. } => write!(f, "write {}", path.display()),
            Step::Rename { from, to } => {
                write!(f, "move {} to {}", from.display(), to.display())
            }
            Step::RemoveDir { path } => write!(f, "remove {}", path.display()),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[String]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, " -- {}", args.join(" "))
}

/// State shared by the steps of one pipeline run.
///
/// The target index is written only by [`Step::ResolveMetadata`] and read by
/// the steps after it.
pub struct Context<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub index: TargetIndex,
}

impl<'a> Context<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self {
            runner,
            index: TargetIndex::new(),
        }
    }
}

/// A step and its status.
#[derive(Debug, Clone)]
pub struct Task {
    pub step: Step,
    pub status: Status,
}

impl Task {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            status: Status::NotStarted,
        }
    }

    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        self.status = Status::InProgress;
        match self.step.execute(ctx) {
            Ok(()) => {
                self.status = Status::Succeeded;
                Ok(())
            }
            Err(err) => {
                self.status = Status::Failed;
                Err(err)
            }
        }
    }
}

/// Ordered tasks for one command.
#[derive(Debug, Clone, Default)]
pub struct Tasks {
    tasks: Vec<Task>,
    status: Status,
}

impl Tasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, step: Step) {
        self.tasks.push(Task::new(step));
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task in order, stopping at the first failure.
    ///
    /// Tasks after a failed one are never started.
    pub fn execute(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if self.status != Status::NotStarted {
            return Err(DriverError::PipelineReused);
        }

        self.status = Status::InProgress;
        let total = self.tasks.len();
        for (i, task) in self.tasks.iter_mut().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, total, task.step);
            if let Err(err) = task.execute(ctx) {
                tracing::debug!(step = %task.step, "step failed");
                self.status = Status::Failed;
                return Err(err);
            }
        }

        self.status = Status::Succeeded;
        Ok(())
    }
}

impl fmt::Display for Tasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, task) in self.tasks.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, task.step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RecordingRunner;
    use cake_build::BuildError;
    use std::path::Path;
    use tempfile::TempDir;

    fn exec(program: &str) -> Step {
        Step::Exec(CommandLine::new(program))
    }

    fn statuses(tasks: &Tasks) -> Vec<Status> {
        tasks.tasks().iter().map(|t| t.status).collect()
    }

    fn write_reply(build: &Path, name: &str, content: &str) {
        let dir = file_api::reply_dir(build);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
    }

    /// Reply tree with a static library `A` and executables `B` and `foo`.
    fn reply_tree(build: &Path) {
        write_reply(
            build,
            "index-abc.json",
            r#"{"reply":{"codemodel-v2":{"jsonFile":"codemodel-xyz.json"}}}"#,
        );
        write_reply(
            build,
            "codemodel-xyz.json",
            r#"{"configurations":[{"targets":[
                {"jsonFile":"target-A.json"},
                {"jsonFile":"target-B.json"},
                {"jsonFile":"target-foo.json"}
            ]}]}"#,
        );
        write_reply(build, "target-A.json", r#"{"name":"A","type":"STATIC_LIBRARY","artifacts":[{"path":"libA.a"}]}"#);
        write_reply(build, "target-B.json", r#"{"name":"B","type":"EXECUTABLE","artifacts":[{"path":"B"}]}"#);
        write_reply(build, "target-foo.json", r#"{"name":"foo","type":"EXECUTABLE","artifacts":[{"path":"foo"}]}"#);
    }

    #[test]
    fn test_all_tasks_succeed() {
        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(exec("one"));
        tasks.add_task(exec("two"));

        tasks.execute(&mut ctx).unwrap();

        assert_eq!(tasks.status(), Status::Succeeded);
        assert_eq!(statuses(&tasks), vec![Status::Succeeded; 2]);
        assert_eq!(runner.argvs(), vec![vec!["one"], vec!["two"]]);
    }

    #[test]
    fn test_stops_at_first_failure() {
        // Every placement of a single failure in pipelines of length 1..=4.
        for len in 1..=4 {
            for fail_at in 0..len {
                let runner = RecordingRunner::failing_on(&["bad"]);
                let mut ctx = Context::new(&runner);
                let mut tasks = Tasks::new();
                for i in 0..len {
                    tasks.add_task(exec(if i == fail_at { "bad" } else { "good" }));
                }

                let err = tasks.execute(&mut ctx).unwrap_err();
                assert!(matches!(err, DriverError::Process(_)));
                assert_eq!(tasks.status(), Status::Failed);

                let statuses = statuses(&tasks);
                for (i, status) in statuses.iter().enumerate() {
                    let expected = match i.cmp(&fail_at) {
                        std::cmp::Ordering::Less => Status::Succeeded,
                        std::cmp::Ordering::Equal => Status::Failed,
                        std::cmp::Ordering::Greater => Status::NotStarted,
                    };
                    assert_eq!(*status, expected, "len {} fail_at {} task {}", len, fail_at, i);
                }
                assert_eq!(runner.commands.borrow().len(), fail_at + 1);
            }
        }
    }

    #[test]
    fn test_first_of_several_failures_is_reported() {
        let runner = RecordingRunner::failing_on(&["bad", "worse"]);
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(exec("bad"));
        tasks.add_task(exec("worse"));

        let err = tasks.execute(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("`bad`"), "got {}", err);
        assert_eq!(statuses(&tasks), vec![Status::Failed, Status::NotStarted]);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failure_is_returned_not_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let runner = RecordingRunner::failing_on(&["bad"]);
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(exec("bad"));

        let err = tracing::subscriber::with_default(subscriber, || tasks.execute(&mut ctx))
            .unwrap_err();
        assert!(err.to_string().contains("exited with exit code 1"));

        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("step failed"), "got {}", logs);
        assert!(!logs.contains("ERROR"), "got {}", logs);
        assert!(!logs.contains("exited with exit code"), "got {}", logs);
    }

    #[test]
    fn test_pipeline_runs_once() {
        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(exec("one"));

        tasks.execute(&mut ctx).unwrap();
        let err = tasks.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, DriverError::PipelineReused));
        assert_eq!(runner.commands.borrow().len(), 1);
    }

    #[test]
    fn test_resolve_then_run() {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("out");
        reply_tree(&build);

        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(Step::ResolveMetadata {
            build_dir: build.clone(),
        });
        tasks.add_task(Step::Run {
            build_dir: build.clone(),
            bin: "foo".to_string(),
            args: Vec::new(),
        });

        tasks.execute(&mut ctx).unwrap();

        assert_eq!(ctx.index.binary_names(), vec!["B", "foo"]);
        let commands = runner.commands.borrow();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].program, build.join("foo").into_os_string());
        assert!(commands[0].args.is_empty());
    }

    #[test]
    fn test_unknown_binary_spawns_nothing() {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("out");
        reply_tree(&build);

        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(Step::ResolveMetadata {
            build_dir: build.clone(),
        });
        tasks.add_task(Step::Run {
            build_dir: build,
            bin: "C".to_string(),
            args: Vec::new(),
        });

        let err = tasks.execute(&mut ctx).unwrap_err();
        match err {
            DriverError::Build(BuildError::TargetNotFound { name, available, .. }) => {
                assert_eq!(name, "C");
                assert_eq!(available, vec!["B", "foo"]);
            }
            other => panic!("expected TargetNotFound, got {:?}", other),
        }
        assert!(runner.commands.borrow().is_empty());
    }

    #[test]
    fn test_build_checks_library_names() {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("out");
        reply_tree(&build);

        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(Step::ResolveMetadata {
            build_dir: build.clone(),
        });
        tasks.add_task(Step::Build {
            cmake: PathBuf::from("cmake"),
            build_dir: build.clone(),
            target: BuildTarget::Library("missing".to_string()),
        });

        let err = tasks.execute(&mut ctx).unwrap_err();
        assert!(
            err.to_string().contains("the available libraries are: [A, B, foo]"),
            "got {}",
            err
        );
        assert!(runner.commands.borrow().is_empty());
    }

    #[test]
    fn test_resolution_without_reply_fails() {
        let tmp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(Step::ResolveMetadata {
            build_dir: tmp.path().to_path_buf(),
        });
        tasks.add_task(exec("never"));

        let err = tasks.execute(&mut ctx).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Build(BuildError::ReplyIndexNotFound { .. })
        ));
        assert!(runner.commands.borrow().is_empty());
    }

    #[test]
    fn test_filesystem_steps() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("scratch");
        std::fs::create_dir_all(scratch.join("template/basic")).unwrap();

        let runner = RecordingRunner::default();
        let mut ctx = Context::new(&runner);
        let mut tasks = Tasks::new();
        tasks.add_task(Step::WriteFile {
            path: scratch.join("template/basic/CMakeLists.txt"),
            contents: "project(demo)\n".to_string(),
        });
        tasks.add_task(Step::Rename {
            from: scratch.join("template/basic"),
            to: tmp.path().join("demo"),
        });
        tasks.add_task(Step::RemoveDir {
            path: scratch.clone(),
        });

        tasks.execute(&mut ctx).unwrap();

        assert!(!scratch.exists());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("demo/CMakeLists.txt")).unwrap(),
            "project(demo)\n"
        );
    }

    #[test]
    fn test_plan_display() {
        let mut tasks = Tasks::new();
        tasks.add_task(Step::ResolveMetadata {
            build_dir: PathBuf::from("out"),
        });
        tasks.add_task(Step::Run {
            build_dir: PathBuf::from("out"),
            bin: "app".to_string(),
            args: vec!["-v".to_string()],
        });

        assert_eq!(
            tasks.to_string(),
            "1. resolve targets in out\n2. run app -- -v\n"
        );
    }
}
