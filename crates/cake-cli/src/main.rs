mod logging;

use cake_build::{Manifest, MANIFEST_FILE};
use cake_driver::{
    plan, BuildOptions, CreateOptions, DebugOptions, Driver, DriverError, InstallMode,
    InstallOptions, ProcessRunner, RunOptions, Tasks, Template,
};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "cake")]
#[command(author, version, about = "Build, run and debug CMake projects")]
struct Cli {
    /// Log debug output from cake itself
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the project manifest
    #[arg(long, global = true, default_value = MANIFEST_FILE)]
    manifest: PathBuf,

    /// Print the task plan instead of executing it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure the build tree and build a target
    Build {
        /// Library target to build
        #[arg(long)]
        lib: Option<String>,

        /// Executable target to build
        #[arg(long)]
        bin: Option<String>,

        /// Configure with the vcpkg toolchain
        #[arg(long)]
        vcpkg: bool,

        /// Extra cache entry passed to CMake as -D<KEY=VALUE>
        #[arg(long = "config", value_name = "KEY=VALUE", value_parser = parse_config)]
        config: Vec<String>,
    },

    /// Run a built executable
    Run {
        /// Executable target to run
        #[arg(long)]
        bin: Option<String>,

        /// Arguments passed to the executable
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Start a debugger on a built executable
    Debug {
        /// gdb, lldb or code
        #[arg(long)]
        debugger: Option<String>,

        /// Executable target to debug
        #[arg(long)]
        bin: Option<String>,

        /// Arguments passed to the executable
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Install dependencies with vcpkg
    #[command(group(ArgGroup::new("mode").required(true).args(["port", "sync"])))]
    Install {
        /// Add a port to the vcpkg manifest
        #[arg(long)]
        port: Option<String>,

        /// Install everything listed in the vcpkg manifest
        #[arg(long)]
        sync: bool,

        /// Enable vcpkg for this invocation
        #[arg(long)]
        vcpkg: bool,

        /// Extra option passed through to vcpkg
        #[arg(long = "config", value_name = "OPTION")]
        config: Vec<String>,
    },

    /// Create a new project from a template
    Create {
        #[arg(long, value_enum, default_value_t = TemplateArg::Basic)]
        template: TemplateArg,

        /// Project directory name (defaults to the template name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Generate documentation with doxygen
    Docs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TemplateArg {
    /// Plain CMake project
    Basic,
    /// CMake project with vcpkg as a submodule
    Vcpkg,
}

impl From<TemplateArg> for Template {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Basic => Template::Basic,
            TemplateArg::Vcpkg => Template::Vcpkg,
        }
    }
}

fn parse_config(s: &str) -> Result<String, String> {
    match s.split_once('=') {
        Some((key, _)) if !key.is_empty() => Ok(s.to_string()),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init_tracing(cli.verbose) {
        eprintln!("warning: failed to initialize logging: {}", err);
    }

    if let Err(err) = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    })) {
        tracing::debug!("miette hook already installed: {}", err);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), DriverError> {
    if let Some(tasks) = run_with(cli, &Driver::new())? {
        print!("{}", tasks);
    }
    Ok(())
}

/// Under `--dry-run` the plan is handed back unexecuted.
fn run_with<R: ProcessRunner>(cli: Cli, driver: &Driver<R>) -> Result<Option<Tasks>, DriverError> {
    let manifest = Manifest::load_or_default(&cli.manifest)?;
    let mut tasks = plan_for(cli.command, &manifest)?;

    if cli.dry_run {
        return Ok(Some(tasks));
    }

    driver.execute(&mut tasks)?;
    Ok(None)
}

/// Merge the manifest with the command's flags and build its plan.
fn plan_for(command: Commands, manifest: &Manifest) -> Result<Tasks, DriverError> {
    let tasks = match command {
        Commands::Build {
            lib,
            bin,
            vcpkg,
            config,
        } => {
            let mut options = BuildOptions::from_manifest(manifest);
            options.vcpkg_support |= vcpkg;
            options.options.extend(config);
            options.lib = lib;
            options.bin = bin;
            plan::build_plan(&options)
        }

        Commands::Run { bin, args } => {
            let mut options = RunOptions::from_manifest(manifest);
            if bin.is_some() {
                options.bin = bin;
            }
            options.args = args;
            plan::run_plan(&options)?
        }

        Commands::Debug {
            debugger,
            bin,
            args,
        } => {
            let mut options = DebugOptions::from_manifest(manifest);
            if let Some(debugger) = debugger {
                options.debugger = debugger;
            }
            if bin.is_some() {
                options.bin = bin;
            }
            options.args = args;
            plan::debug_plan(&options)?
        }

        Commands::Install {
            port,
            sync: _,
            vcpkg,
            config,
        } => {
            let mode = match port {
                Some(port) => InstallMode::AddPort(port),
                None => InstallMode::Sync,
            };
            let mut options = InstallOptions::from_manifest(manifest, mode);
            options.vcpkg_support |= vcpkg;
            options.options = config;
            plan::install_plan(&options)?
        }

        Commands::Create { template, name } => {
            let mut options = CreateOptions::new(template.into());
            options.name = name;
            plan::create_plan(&options)
        }

        Commands::Docs => plan::docs_plan(),
    };

    Ok(tasks)
}
