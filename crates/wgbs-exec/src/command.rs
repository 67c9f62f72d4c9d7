//! Engine invocation from resolved configuration.
//!
//! The result depends only on the run context and the two resolved documents,
//! so the logged command can always be reproduced from the persisted files.
use tracing::trace;

use wgbs_config::{ConfigDocument, ConfigValue};
use wgbs_model::{CommandSpec, RunContext};

use crate::{
    error::{ExecError, ExecResult},
    util::path_arg,
};

/// Seconds the engine waits for output files on shared filesystems.
pub const LATENCY_WAIT_SECS: u64 = 300;

/// Engine module loaded before the cluster's own modules.
pub const DEFAULT_ENGINE_MODULE: &str = "snakemake/3.12.0";

/// Cluster-only config keys the wrapper reads itself.
pub const KEY_SUBMIT_CMD: &str = "snakemake_cluster_cmd";
pub const KEY_MODULE_LOAD: &str = "cluster_module_load";
pub const KEY_ENGINE_MODULE: &str = "snakemake_module";

/// Run config key with extra engine arguments.
pub const KEY_ENGINE_OPTIONS: &str = "snakemake_options";

/// Typed view of the cluster settings used to build the submission clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    /// Scheduler submission template; the logs directory is appended to it.
    pub submit_cmd: String,
    /// Modules to load, space separated.
    pub module_load: Option<String>,
    /// Engine module; `None` when disabled with an empty or null value.
    pub engine_module: Option<String>,
}

impl ClusterSettings {
    pub fn from_document(doc: &ConfigDocument) -> ExecResult<Self> {
        let submit_cmd = match doc.get(KEY_SUBMIT_CMD) {
            Some(ConfigValue::Str(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(ConfigValue::Str(_)) | Some(ConfigValue::Null) | None => {
                return Err(ExecError::MissingClusterSetting(KEY_SUBMIT_CMD));
            }
            Some(_) => {
                return Err(ExecError::InvalidSetting {
                    key: KEY_SUBMIT_CMD.into(),
                    expected: "string",
                });
            }
        };

        let module_load = optional_str(doc, KEY_MODULE_LOAD)?;
        let engine_module = if doc.contains_key(KEY_ENGINE_MODULE) {
            optional_str(doc, KEY_ENGINE_MODULE)?
        } else {
            Some(DEFAULT_ENGINE_MODULE.to_string())
        };

        Ok(Self {
            submit_cmd,
            module_load,
            engine_module,
        })
    }

    /// `module load ...` clause, if there is anything to load.
    pub fn prelude(&self) -> Option<String> {
        let modules: Vec<&str> = self
            .engine_module
            .iter()
            .chain(self.module_load.iter())
            .map(|s| s.as_str())
            .collect();
        if modules.is_empty() {
            None
        } else {
            Some(format!("module load {}", modules.join(" ")))
        }
    }
}

fn optional_str(doc: &ConfigDocument, key: &str) -> ExecResult<Option<String>> {
    match doc.get(key) {
        None | Some(ConfigValue::Null) => Ok(None),
        Some(ConfigValue::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(ConfigValue::Str(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ExecError::InvalidSetting {
            key: key.into(),
            expected: "string",
        }),
    }
}

/// Extra engine arguments from the run config, whitespace separated.
fn engine_options(config: &ConfigDocument) -> ExecResult<Vec<String>> {
    match config.get(KEY_ENGINE_OPTIONS) {
        None | Some(ConfigValue::Null) => Ok(Vec::new()),
        Some(ConfigValue::Str(s)) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Some(ConfigValue::Seq(items)) => items
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or(ExecError::InvalidSetting {
                    key: KEY_ENGINE_OPTIONS.into(),
                    expected: "string or list of strings",
                })
            })
            .collect(),
        Some(_) => Err(ExecError::InvalidSetting {
            key: KEY_ENGINE_OPTIONS.into(),
            expected: "string or list of strings",
        }),
    }
}

pub struct CommandBuilder;

impl CommandBuilder {
    /// Build the engine command for `ctx`.
    ///
    /// Local mode caps cores with `--jobs`. Cluster mode additionally passes the
    /// cluster config and a submission clause, and loads modules first.
    pub fn build(
        ctx: &RunContext,
        config: &ConfigDocument,
        cluster: &ConfigDocument,
    ) -> ExecResult<CommandSpec> {
        if ctx.engine.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let mut spec = CommandSpec::new(ctx.engine.as_str())
            .args(engine_options(config)?)
            .args([
                "--latency-wait".to_string(),
                LATENCY_WAIT_SECS.to_string(),
                "--snakefile".to_string(),
                path_arg(&ctx.snakefile()),
                "--jobs".to_string(),
                ctx.max_jobs.to_string(),
                "--directory".to_string(),
                path_arg(&ctx.working_dir),
                "--configfile".to_string(),
                path_arg(&ctx.config_path()),
            ]);

        if ctx.verbose {
            spec = spec.arg("--printshellcmds");
        }

        if ctx.mode.is_cluster() {
            let settings = ClusterSettings::from_document(cluster)?;
            let submit = format!(
                "{} {} --name {{rule}}.snakemake",
                settings.submit_cmd,
                path_arg(&ctx.cluster_logs_dir())
            );
            spec = spec.args([
                "--cluster-config".to_string(),
                path_arg(&ctx.cluster_config_path()),
                "--cluster".to_string(),
                submit,
            ]);
            if let Some(prelude) = settings.prelude() {
                spec = spec.with_prelude(prelude);
            }
        }

        trace!(target: "wgbs.exec.command", mode = ctx.mode.as_str(), argv = ?spec.args, "command built");
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use wgbs_model::ExecMode;

    use super::*;

    trait EnvIsEmpty {
        fn is_empty(&self) -> bool;
    }

    impl EnvIsEmpty for wgbs_model::CommandEnv {
        fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    fn ctx(mode: ExecMode, verbose: bool) -> RunContext {
        RunContext {
            target: "mm10".into(),
            input_dir: PathBuf::from("/data/in"),
            working_dir: PathBuf::from("/data/out"),
            temp_root: None,
            mode,
            verbose,
            max_jobs: 8,
            workflow_dir: PathBuf::from("/opt/wgbs/WGBS"),
            engine: "snakemake".into(),
        }
    }

    fn cluster_doc() -> ConfigDocument {
        ConfigDocument::new()
            .with(KEY_SUBMIT_CMD, "SlurmEasy -t {threads} -l")
            .with(KEY_MODULE_LOAD, "slurm bowtie2")
    }

    #[test]
    fn local_command_has_core_arguments() {
        let spec = CommandBuilder::build(
            &ctx(ExecMode::Local, false),
            &ConfigDocument::new(),
            &ConfigDocument::new(),
        )
        .unwrap();

        assert_eq!(spec.program, "snakemake");
        assert_eq!(
            spec.args,
            vec![
                "--latency-wait",
                "300",
                "--snakefile",
                "/opt/wgbs/WGBS/Snakefile",
                "--jobs",
                "8",
                "--directory",
                "/data/out",
                "--configfile",
                "/data/out/config.yaml",
            ]
        );
        assert!(spec.prelude.is_none());
        assert!(spec.env.is_empty());
    }

    #[test]
    fn verbose_appends_printshellcmds() {
        let spec = CommandBuilder::build(
            &ctx(ExecMode::Local, true),
            &ConfigDocument::new(),
            &ConfigDocument::new(),
        )
        .unwrap();
        assert_eq!(spec.args.last().map(String::as_str), Some("--printshellcmds"));
    }

    #[test]
    fn engine_options_come_first() {
        let config = ConfigDocument::new().with(KEY_ENGINE_OPTIONS, "--dryrun  --rerun-incomplete");
        let spec =
            CommandBuilder::build(&ctx(ExecMode::Local, false), &config, &ConfigDocument::new())
                .unwrap();
        assert_eq!(&spec.args[..3], &["--dryrun", "--rerun-incomplete", "--latency-wait"]);
    }

    #[test]
    fn engine_options_reject_numbers() {
        let config = ConfigDocument::new().with(KEY_ENGINE_OPTIONS, 3i64);
        let err =
            CommandBuilder::build(&ctx(ExecMode::Local, false), &config, &ConfigDocument::new())
                .unwrap_err();
        assert!(matches!(err, ExecError::InvalidSetting { .. }));
    }

    #[test]
    fn cluster_command_adds_submission_clause_and_prelude() {
        let spec = CommandBuilder::build(
            &ctx(ExecMode::Cluster, true),
            &ConfigDocument::new(),
            &cluster_doc(),
        )
        .unwrap();

        let tail: Vec<&str> = spec.args.iter().rev().take(5).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "--printshellcmds",
                "--cluster-config",
                "/data/out/cluster_config.yaml",
                "--cluster",
                "SlurmEasy -t {threads} -l /data/out/cluster_logs --name {rule}.snakemake",
            ]
        );
        assert_eq!(
            spec.prelude.as_deref(),
            Some("module load snakemake/3.12.0 slurm bowtie2")
        );
    }

    #[test]
    fn cluster_mode_requires_submit_command() {
        let err = CommandBuilder::build(
            &ctx(ExecMode::Cluster, false),
            &ConfigDocument::new(),
            &ConfigDocument::new().with(KEY_MODULE_LOAD, "slurm"),
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::MissingClusterSetting(KEY_SUBMIT_CMD)));
    }

    #[test]
    fn local_mode_ignores_cluster_settings() {
        let spec = CommandBuilder::build(
            &ctx(ExecMode::Local, false),
            &ConfigDocument::new(),
            &ConfigDocument::new(),
        )
        .unwrap();
        assert!(!spec.args.iter().any(|a| a == "--cluster"));
    }

    #[test]
    fn engine_module_can_be_disabled() {
        let doc = cluster_doc().with(KEY_ENGINE_MODULE, "");
        let settings = ClusterSettings::from_document(&doc).unwrap();
        assert_eq!(settings.prelude().as_deref(), Some("module load slurm bowtie2"));

        let bare = ConfigDocument::new()
            .with(KEY_SUBMIT_CMD, "sbatch")
            .with(KEY_ENGINE_MODULE, ConfigValue::Null);
        assert!(ClusterSettings::from_document(&bare).unwrap().prelude().is_none());
    }

    #[test]
    fn build_is_deterministic() {
        let c = ctx(ExecMode::Cluster, false);
        let a = CommandBuilder::build(&c, &ConfigDocument::new(), &cluster_doc()).unwrap();
        let b = CommandBuilder::build(&c, &ConfigDocument::new(), &cluster_doc()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_shell_string(), b.to_shell_string());
    }
}
