use std::path::{Path, PathBuf};

use crate::{
    CLUSTER_CONFIG_FILE_NAME, CLUSTER_LOGS_DIR_NAME, CONFIG_FILE_NAME, ExecMode,
    RUN_LOG_FILE_NAME, SNAKEFILE_NAME,
};

/// Resolved paths and flags of one invocation.
///
/// Built once at startup and never changed afterwards; every path is absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Genome acronym the pipeline runs against.
    pub target: String,
    pub input_dir: PathBuf,
    pub working_dir: PathBuf,
    /// Preferred root for the scratch directory; the working directory is the fallback.
    pub temp_root: Option<PathBuf>,
    pub mode: ExecMode,
    pub verbose: bool,
    /// Concurrent cluster jobs, or local cores.
    pub max_jobs: u64,
    /// Directory holding the Snakefile and workflow defaults.
    pub workflow_dir: PathBuf,
    /// Engine executable.
    pub engine: String,
}

impl RunContext {
    pub fn config_path(&self) -> PathBuf {
        self.working_dir.join(CONFIG_FILE_NAME)
    }

    pub fn cluster_config_path(&self) -> PathBuf {
        self.working_dir.join(CLUSTER_CONFIG_FILE_NAME)
    }

    pub fn cluster_logs_dir(&self) -> PathBuf {
        self.working_dir.join(CLUSTER_LOGS_DIR_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.working_dir.join(RUN_LOG_FILE_NAME)
    }

    pub fn snakefile(&self) -> PathBuf {
        self.workflow_dir.join(SNAKEFILE_NAME)
    }

    /// Root tried when the preferred temp root is absent or unusable.
    #[inline]
    pub fn fallback_temp_root(&self) -> &Path {
        &self.working_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_working_dir() {
        let ctx = RunContext {
            target: "mm10".into(),
            input_dir: "/data/in".into(),
            working_dir: "/data/out".into(),
            temp_root: None,
            mode: ExecMode::Local,
            verbose: false,
            max_jobs: 4,
            workflow_dir: "/opt/wgbs/WGBS".into(),
            engine: "snakemake".into(),
        };

        assert_eq!(ctx.config_path(), PathBuf::from("/data/out/config.yaml"));
        assert_eq!(ctx.cluster_config_path(), PathBuf::from("/data/out/cluster_config.yaml"));
        assert_eq!(ctx.cluster_logs_dir(), PathBuf::from("/data/out/cluster_logs"));
        assert_eq!(ctx.log_path(), PathBuf::from("/data/out/WGBSpipeline.log"));
        assert_eq!(ctx.snakefile(), PathBuf::from("/opt/wgbs/WGBS/Snakefile"));
        assert_eq!(ctx.fallback_temp_root(), Path::new("/data/out"));
    }
}
