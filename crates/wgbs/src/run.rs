//! One pipeline run: resolve, persist, launch, clean up.
//!
//! Everything that can fail before launch (input checks, both configuration
//! layers, cluster settings) is done before the first write, so a rejected
//! invocation leaves the working directory untouched and never creates a
//! scratch directory.
use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wgbs_config::{ClusterConfigResolver, ConfigDocument, ConfigResolver, ConfigStore, ConfigValue};
use wgbs_exec::{
    CommandBuilder, ExecError, JobSupervisor, RunLog, SupervisorConfig, TempDirManager,
    check_outcome, listen_for_shutdown,
};
use wgbs_model::{
    CLUSTER_FILE_NAME, CLUSTER_LOGS_DIR_NAME, DEFAULTS_FILE_NAME, ENV_TEMP_DIR, ExecMode,
    RunContext,
};

use crate::cli::WorkflowArgs;

const SIGINT: i32 = 2;

const WORKFLOW_NAME: &str = "WGBS";

/// Run the workflow described by `args` and return the process exit code.
///
/// `argv` is the wrapper's own command line, recorded in the run log.
pub async fn run(args: WorkflowArgs, argv: Vec<String>) -> i32 {
    let cancel = CancellationToken::new();
    let listener = match listen_for_shutdown(cancel.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(target: "wgbs.run", error = %e, "cannot install signal handlers; interruption will not be forwarded");
            None
        }
    };

    let result = launch(&args, &argv, &cancel).await;

    // Stop the listener; a signal that already arrived is still reported.
    cancel.cancel();
    let signum = match listener {
        Some(handle) => handle.await.ok().flatten(),
        None => None,
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            let code = exit_code_for(&err, signum);
            match err.downcast_ref::<ExecError>() {
                Some(ExecError::Interrupted) => warn!(target: "wgbs.run", code, "engine terminated"),
                _ => error!(target: "wgbs.run", code, "{err:#}"),
            }
            code
        }
    }
}

/// Exit code for a failed run: the engine's own code when it failed, `128 + signal`
/// when interrupted, 1 for everything that went wrong before or around the launch.
pub fn exit_code_for(err: &anyhow::Error, signum: Option<i32>) -> i32 {
    match err.downcast_ref::<ExecError>() {
        Some(ExecError::ChildFailed { code }) => *code,
        Some(ExecError::Interrupted) => 128 + signum.unwrap_or(SIGINT),
        _ => 1,
    }
}

async fn launch(args: &WorkflowArgs, argv: &[String], cancel: &CancellationToken) -> anyhow::Result<()> {
    let layout = WorkflowLayout::from_args(args)?;

    let input_dir = match args.indir.canonicalize() {
        Ok(dir) if dir.is_dir() => dir,
        _ => bail!("input directory not found: {}", args.indir.display()),
    };
    let working_dir = std::path::absolute(&args.wdir)
        .with_context(|| format!("invalid working directory: {}", args.wdir.display()))?;

    let resolver = ConfigResolver::from_defaults_file(&layout.defaults())?;
    let candidate = args
        .candidate(resolver.defaults())
        .merged(&run_keys(args, &layout, &input_dir, &working_dir));
    let config = resolver.resolve(args.configfile.as_deref(), &candidate)?;

    let cluster = ClusterConfigResolver::new(layout.shared_cluster(), layout.workflow_cluster())
        .resolve(args.cluster_configfile.as_deref())?;

    let ctx = run_context(args, &layout, &config, input_dir, working_dir)?;
    let command = CommandBuilder::build(&ctx, &config, &cluster)?;

    fs::create_dir_all(ctx.cluster_logs_dir())
        .with_context(|| format!("cannot create {}", ctx.cluster_logs_dir().display()))?;
    ConfigStore::persist(&ctx.config_path(), &config)?;
    ConfigStore::persist(&ctx.cluster_config_path(), &cluster)?;

    let scratch = TempDirManager::acquire(ctx.temp_root.as_deref(), ctx.fallback_temp_root())?;
    let command = command.with_env(ENV_TEMP_DIR, scratch.path().display().to_string());

    let run_log = RunLog::new(ctx.log_path());
    run_log.record_invocation(argv, &command)?;
    if ctx.verbose {
        info!(target: "wgbs.run", command = %command.to_shell_string(), "engine command");
    } else {
        debug!(target: "wgbs.run", command = %command.to_shell_string(), "engine command");
    }

    let supervisor = JobSupervisor::new(SupervisorConfig {
        grace: Duration::from_millis(args.wrapper.kill_grace_ms),
        ..SupervisorConfig::default()
    })
    .with_run_log(run_log);

    let outcome = supervisor.run(&command, cancel).await;
    let scratch_path = scratch.path().to_path_buf();
    TempDirManager::release(scratch);
    if ctx.verbose {
        info!(target: "wgbs.run", path = %scratch_path.display(), "temp dir removed");
    }

    check_outcome(outcome?)?;
    Ok(())
}

/// Bundled workflow files.
struct WorkflowLayout {
    workflow_dir: PathBuf,
    shared_dir: PathBuf,
}

impl WorkflowLayout {
    fn from_args(args: &WorkflowArgs) -> anyhow::Result<Self> {
        let workflow_dir = match &args.wrapper.workflow_dir {
            Some(dir) => dir
                .canonicalize()
                .with_context(|| format!("workflow directory not found: {}", dir.display()))?,
            None => locate_workflow_dir()?,
        };
        let shared_dir = match &args.wrapper.shared_dir {
            Some(dir) => std::path::absolute(dir)
                .with_context(|| format!("invalid shared directory: {}", dir.display()))?,
            None => workflow_dir
                .parent()
                .unwrap_or(&workflow_dir)
                .join("shared"),
        };
        Ok(Self {
            workflow_dir,
            shared_dir,
        })
    }

    fn defaults(&self) -> PathBuf {
        self.workflow_dir.join(DEFAULTS_FILE_NAME)
    }

    fn workflow_cluster(&self) -> PathBuf {
        self.workflow_dir.join(CLUSTER_FILE_NAME)
    }

    fn shared_cluster(&self) -> PathBuf {
        self.shared_dir.join(CLUSTER_FILE_NAME)
    }

    /// Directory above the shared files.
    fn main_dir(&self) -> &Path {
        self.shared_dir.parent().unwrap_or(&self.shared_dir)
    }
}

/// Places searched for the bundled workflow, relative to the executable's directory:
/// a `workflow/` bundle next to it, an installed `share/wgbs/`, then the source
/// tree when run from a cargo target directory.
fn workflow_dir_candidates(exe_dir: &Path) -> Vec<PathBuf> {
    vec![
        exe_dir.join("workflow").join(WORKFLOW_NAME),
        exe_dir.join("../share/wgbs/workflow").join(WORKFLOW_NAME),
        exe_dir.join("../../crates/wgbs/workflow").join(WORKFLOW_NAME),
    ]
}

/// First candidate holding a defaults file.
fn find_workflow_dir(exe_dir: &Path) -> Option<PathBuf> {
    workflow_dir_candidates(exe_dir)
        .into_iter()
        .find(|dir| dir.join(DEFAULTS_FILE_NAME).is_file())
        .and_then(|dir| dir.canonicalize().ok())
}

fn locate_workflow_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .context("cannot locate the wgbs executable")?;
    let exe_dir = exe.parent().unwrap_or(Path::new("/"));
    let dir = find_workflow_dir(exe_dir).with_context(|| {
        format!(
            "workflow directory not found near {}; pass --workflow-dir or set WGBS_WORKFLOW_DIR",
            exe_dir.display()
        )
    })?;
    debug!(target: "wgbs.run", path = %dir.display(), "workflow directory located");
    Ok(dir)
}

/// Keys describing the run itself, recorded next to the user's options.
fn run_keys(
    args: &WorkflowArgs,
    layout: &WorkflowLayout,
    input_dir: &Path,
    working_dir: &Path,
) -> ConfigDocument {
    let display = |p: &Path| ConfigValue::from(p.display().to_string());
    ConfigDocument::new()
        .with("genome", args.genome.as_str())
        .with("indir", display(input_dir))
        .with("wdir", display(working_dir))
        .with("local", args.local)
        .with("cluster_logs_dir", display(&working_dir.join(CLUSTER_LOGS_DIR_NAME)))
        .with("this_script_dir", display(&layout.workflow_dir))
        .with("main_dir_path", display(layout.main_dir()))
}

fn run_context(
    args: &WorkflowArgs,
    layout: &WorkflowLayout,
    config: &ConfigDocument,
    input_dir: PathBuf,
    working_dir: PathBuf,
) -> anyhow::Result<RunContext> {
    let max_jobs = match config.get("max_jobs") {
        None | Some(ConfigValue::Null) => std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1) as u64,
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => n,
            _ => bail!("invalid value for 'max_jobs': expected a positive integer"),
        },
    };

    let temp_root = config
        .get_str("tempdir")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    Ok(RunContext {
        target: args.genome.clone(),
        input_dir,
        working_dir,
        temp_root,
        mode: ExecMode::from_local_flag(args.local),
        verbose: args.verbose || config.get_bool("verbose").unwrap_or(false),
        max_jobs,
        workflow_dir: layout.workflow_dir.clone(),
        engine: args.wrapper.snakemake.clone(),
    })
}
